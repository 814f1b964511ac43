//! AST node definitions.
//!
//! The tree is a plain owned structure (`Box` children, `Vec` lists). Function
//! literals are the exception: they sit behind an `Arc` because closures keep
//! their body alive after the surrounding tree is gone.

mod expr;
mod stmt;
mod types;

pub use expr::{Expr, ExprKind, FuncLit, Literal, Param};
pub use stmt::{SelectCase, SelectOp, Stmt, StmtKind, SwitchCase};
pub use types::{ChanDirection, TypeExpr};
