//! Expression nodes.

use std::sync::Arc;

use super::stmt::Stmt;
use super::types::TypeExpr;
use crate::{BinaryOp, IncDecOp, Name, Position, UnaryOp};

/// An expression with its source position.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Position,
}

impl Expr {
    /// Create an expression node.
    #[inline]
    pub fn new(kind: ExprKind, pos: Position) -> Self {
        Expr { kind, pos }
    }

    /// Whether this expression is a call (named or anonymous).
    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. } | ExprKind::AnonCall { .. })
    }

    /// The identifier name if this is a bare identifier.
    pub fn as_ident(&self) -> Option<&Name> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Literal constants.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

/// Expression kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// `nil`, `true`, `42`, `1.5`, `"text"`
    Literal(Literal),
    /// `x`, `pkg.Name`
    Ident(Name),
    /// `[1, 2]` or `[]int{1, 2}`
    Array {
        elem: Option<TypeExpr>,
        items: Vec<Expr>,
    },
    /// `{"a": 1}` or `map[string]int{"a": 1}`
    Map {
        types: Option<(TypeExpr, TypeExpr)>,
        entries: Vec<(Expr, Expr)>,
    },
    /// `*p`
    Deref(Box<Expr>),
    /// `&x`
    AddrOf(Box<Expr>),
    /// `-x`, `!x`, `^x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `(x)`
    Paren(Box<Expr>),
    /// `x.name`
    Member { base: Box<Expr>, name: Name },
    /// `x[i]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `x[a:b]`
    Slice {
        base: Box<Expr>,
        begin: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    /// `c ? a : b`
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `a ?? b`
    NilCoalesce { lhs: Box<Expr>, rhs: Box<Expr> },
    /// `len(x)`
    Len(Box<Expr>),
    /// `new(T)`
    New(TypeExpr),
    /// `make(T)`, `make([]T, len, cap)`
    Make {
        ty: TypeExpr,
        len: Option<Box<Expr>>,
        cap: Option<Box<Expr>>,
    },
    /// `make type Name = expr`
    MakeType { name: Name, value: Box<Expr> },
    /// `make(chan T, size)`
    MakeChan {
        elem: TypeExpr,
        size: Option<Box<Expr>>,
    },
    /// `<-ch` (no lhs), `ch <- v`, `v <- ch`
    Chan {
        lhs: Option<Box<Expr>>,
        rhs: Box<Expr>,
    },
    /// `func name(a, b) { ... }`
    Func(Arc<FuncLit>),
    /// `expr(args...)`
    AnonCall {
        callee: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
    },
    /// `name(args...)`
    Call {
        name: Name,
        args: Vec<Expr>,
        spread: bool,
    },
    /// `close(ch)`
    Close(Box<Expr>),
    /// `delete(m, k)`, `delete("name")`, `delete("name", true)`
    Delete {
        target: Box<Expr>,
        key: Option<Box<Expr>>,
    },
    /// `item in list`
    Include { item: Box<Expr>, list: Box<Expr> },
    /// `x++`, `x--`
    IncDec { target: Box<Expr>, op: IncDecOp },
    /// `a + b`
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `a, b = 1, 2` used as an expression
    Let { targets: Vec<Expr>, values: Vec<Expr> },
    /// `a += 1`
    OpAssign {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

/// A function literal: parameters plus body.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncLit {
    /// Set for `func name() {}`; the evaluator binds the closure under it.
    pub name: Option<Name>,
    pub params: Vec<Param>,
    /// The last parameter collects trailing arguments.
    pub variadic: bool,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// A declared parameter with an optional type constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: Option<TypeExpr>,
}
