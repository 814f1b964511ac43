//! Kite IR - syntax tree types for the Kite evaluator.
//!
//! This crate contains the data structures the evaluator consumes:
//! - Positions for error reporting
//! - Names for identifiers
//! - Operators
//! - AST nodes (`Expr`, `Stmt`, `TypeExpr`, `FuncLit`)
//! - Programmatic constructors in [`build`]
//!
//! There is no lexer or parser here. Hosts that embed Kite bring their own
//! front end and lower it into these types; tests build trees directly with
//! the [`build`] helpers.
//!
//! # Thread Safety
//!
//! Every type is `Send + Sync`. Function literals are shared through `Arc`
//! so a closure can be invoked from several goroutines at once.

pub mod ast;
pub mod build;
mod name;
mod operators;
mod position;

pub use ast::{
    ChanDirection, Expr, ExprKind, FuncLit, Literal, Param, SelectCase, SelectOp, Stmt, StmtKind,
    SwitchCase, TypeExpr,
};
pub use name::Name;
pub use operators::{BinaryOp, IncDecOp, UnaryOp};
pub use position::Position;
