//! Statement nodes.

use super::expr::Expr;
use crate::{Name, Position};

/// A statement with its source position.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Position,
}

impl Stmt {
    /// Create a statement node.
    #[inline]
    pub fn new(kind: StmtKind, pos: Position) -> Self {
        Stmt { kind, pos }
    }
}

/// Statement kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// An expression evaluated for its effect (and value).
    Expr(Expr),
    /// `var a, b = x, y`
    Var { names: Vec<Name>, values: Vec<Expr> },
    /// `a, b = x, y`
    Let { targets: Vec<Expr>, values: Vec<Expr> },
    /// `v, ok = m[k]`
    LetPresence { targets: Vec<Expr>, source: Expr },
    /// `if c {} else if d {} else {}`
    If {
        cond: Expr,
        then: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    /// `try {} catch e {} finally {}`
    Try {
        body: Vec<Stmt>,
        catch_var: Option<Name>,
        catch: Vec<Stmt>,
        finally: Option<Vec<Stmt>>,
    },
    /// `for {}` / `for cond {}`
    Loop { cond: Option<Expr>, body: Vec<Stmt> },
    /// `for v in xs {}` / `for k, v in m {}`
    ForEach {
        vars: Vec<Name>,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    /// `for init; cond; post {}`
    CFor {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    /// `return`, `return x`, `return x, y`
    Return(Vec<Expr>),
    /// `throw x`
    Throw(Expr),
    /// `module name { ... }`
    Module { name: Name, body: Vec<Stmt> },
    /// `select { case ...: }`
    Select {
        cases: Vec<SelectCase>,
        default: Option<Vec<Stmt>>,
    },
    /// `switch x { case a, b: ... default: ... }`
    Switch {
        value: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },
    /// `go f(x)`
    Go(Expr),
    /// `defer f(x)`
    Defer(Expr),
}

/// One arm of a `select`.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectCase {
    pub op: SelectOp,
    pub body: Vec<Stmt>,
    pub pos: Position,
}

/// The channel operation guarding a `select` arm.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectOp {
    /// `case <-ch:` or `case v = <-ch:`
    Recv { bind: Option<Name>, chan: Expr },
    /// `case ch <- v:`
    Send { chan: Expr, value: Expr },
}

impl SelectOp {
    /// The channel operand of this case.
    pub fn chan(&self) -> &Expr {
        match self {
            SelectOp::Recv { chan, .. } | SelectOp::Send { chan, .. } => chan,
        }
    }
}

/// One arm of a `switch`.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
}
