//! Programmatic AST constructors.
//!
//! Front ends lower into these nodes and tests use them to write programs
//! without a parser. Every node starts at [`Position::UNKNOWN`]; call
//! [`Expr::at`] / [`Stmt::at`] to attach a source location.
//!
//! ```
//! use kite_ir::build::*;
//!
//! // x = 1 + 2
//! let stmt = assign(ident("x"), add(int(1), int(2)));
//! ```

use std::sync::Arc;

use crate::{
    BinaryOp, ChanDirection, Expr, ExprKind, FuncLit, IncDecOp, Literal, Name, Param, Position,
    SelectCase, SelectOp, Stmt, StmtKind, SwitchCase, TypeExpr, UnaryOp,
};

impl Expr {
    /// Attach a source position.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = Position::new(line, column);
        self
    }
}

impl Stmt {
    /// Attach a source position.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = Position::new(line, column);
        self
    }
}

fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, Position::UNKNOWN)
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Position::UNKNOWN)
}

fn boxed(e: Expr) -> Box<Expr> {
    Box::new(e)
}

// Literals

pub fn nil() -> Expr {
    expr(ExprKind::Literal(Literal::Nil))
}

pub fn boolean(b: bool) -> Expr {
    expr(ExprKind::Literal(Literal::Bool(b)))
}

pub fn int(n: i64) -> Expr {
    expr(ExprKind::Literal(Literal::Int(n)))
}

pub fn float(f: f64) -> Expr {
    expr(ExprKind::Literal(Literal::Float(f)))
}

pub fn string(s: &str) -> Expr {
    expr(ExprKind::Literal(Literal::Str(Arc::from(s))))
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::Ident(Name::new(name)))
}

// Composite literals

pub fn array(items: Vec<Expr>) -> Expr {
    expr(ExprKind::Array { elem: None, items })
}

pub fn typed_array(elem: TypeExpr, items: Vec<Expr>) -> Expr {
    expr(ExprKind::Array {
        elem: Some(elem),
        items,
    })
}

pub fn map(entries: Vec<(Expr, Expr)>) -> Expr {
    expr(ExprKind::Map {
        types: None,
        entries,
    })
}

pub fn typed_map(key: TypeExpr, value: TypeExpr, entries: Vec<(Expr, Expr)>) -> Expr {
    expr(ExprKind::Map {
        types: Some((key, value)),
        entries,
    })
}

// Pointers and unary

pub fn deref(e: Expr) -> Expr {
    expr(ExprKind::Deref(boxed(e)))
}

pub fn addr_of(e: Expr) -> Expr {
    expr(ExprKind::AddrOf(boxed(e)))
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: boxed(operand),
    })
}

pub fn neg(e: Expr) -> Expr {
    unary(UnaryOp::Neg, e)
}

pub fn not(e: Expr) -> Expr {
    unary(UnaryOp::Not, e)
}

pub fn paren(e: Expr) -> Expr {
    expr(ExprKind::Paren(boxed(e)))
}

// Access

pub fn member(base: Expr, name: &str) -> Expr {
    expr(ExprKind::Member {
        base: boxed(base),
        name: Name::new(name),
    })
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    expr(ExprKind::Index {
        base: boxed(base),
        index: boxed(idx),
    })
}

pub fn slice(base: Expr, begin: Option<Expr>, end: Option<Expr>) -> Expr {
    expr(ExprKind::Slice {
        base: boxed(base),
        begin: begin.map(boxed),
        end: end.map(boxed),
    })
}

pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
    expr(ExprKind::Ternary {
        cond: boxed(cond),
        then: boxed(then),
        otherwise: boxed(otherwise),
    })
}

pub fn coalesce(lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::NilCoalesce {
        lhs: boxed(lhs),
        rhs: boxed(rhs),
    })
}

pub fn len(e: Expr) -> Expr {
    expr(ExprKind::Len(boxed(e)))
}

// Construction

pub fn new(ty: TypeExpr) -> Expr {
    expr(ExprKind::New(ty))
}

pub fn make(ty: TypeExpr) -> Expr {
    expr(ExprKind::Make {
        ty,
        len: None,
        cap: None,
    })
}

pub fn make_slice(ty: TypeExpr, len: Expr, cap: Option<Expr>) -> Expr {
    expr(ExprKind::Make {
        ty,
        len: Some(boxed(len)),
        cap: cap.map(boxed),
    })
}

pub fn make_type(name: &str, value: Expr) -> Expr {
    expr(ExprKind::MakeType {
        name: Name::new(name),
        value: boxed(value),
    })
}

pub fn make_chan(elem: TypeExpr, size: Option<Expr>) -> Expr {
    expr(ExprKind::MakeChan {
        elem,
        size: size.map(boxed),
    })
}

// Channels

/// `<-ch`
pub fn recv(ch: Expr) -> Expr {
    expr(ExprKind::Chan {
        lhs: None,
        rhs: boxed(ch),
    })
}

/// `ch <- value`
pub fn send(ch: Expr, value: Expr) -> Expr {
    expr(ExprKind::Chan {
        lhs: Some(boxed(ch)),
        rhs: boxed(value),
    })
}

/// `target <- ch`
pub fn recv_into(target: Expr, ch: Expr) -> Expr {
    expr(ExprKind::Chan {
        lhs: Some(boxed(target)),
        rhs: boxed(ch),
    })
}

pub fn close(ch: Expr) -> Expr {
    expr(ExprKind::Close(boxed(ch)))
}

// Functions

pub fn param(name: &str) -> Param {
    Param {
        name: Name::new(name),
        ty: None,
    }
}

pub fn typed_param(name: &str, ty: TypeExpr) -> Param {
    Param {
        name: Name::new(name),
        ty: Some(ty),
    }
}

/// Build a function literal from a full parameter list.
pub fn func_lit(name: Option<&str>, params: Vec<Param>, variadic: bool, body: Vec<Stmt>) -> Expr {
    expr(ExprKind::Func(Arc::new(FuncLit {
        name: name.map(Name::new),
        params,
        variadic,
        body,
        pos: Position::UNKNOWN,
    })))
}

/// Anonymous function with untyped parameters.
pub fn func(params: &[&str], body: Vec<Stmt>) -> Expr {
    func_lit(None, params.iter().map(|p| param(p)).collect(), false, body)
}

/// Named function with untyped parameters; evaluating it binds `name`.
pub fn func_named(name: &str, params: &[&str], body: Vec<Stmt>) -> Expr {
    func_lit(Some(name), params.iter().map(|p| param(p)).collect(), false, body)
}

/// Anonymous function whose last parameter is variadic.
pub fn func_variadic(params: &[&str], body: Vec<Stmt>) -> Expr {
    func_lit(None, params.iter().map(|p| param(p)).collect(), true, body)
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        name: Name::new(name),
        args,
        spread: false,
    })
}

/// `name(args...)` with the last argument spread.
pub fn call_spread(name: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call {
        name: Name::new(name),
        args,
        spread: true,
    })
}

pub fn anon_call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::AnonCall {
        callee: boxed(callee),
        args,
        spread: false,
    })
}

/// `base.name(args)`
pub fn method_call(base: Expr, name: &str, args: Vec<Expr>) -> Expr {
    anon_call(member(base, name), args)
}

// Misc expressions

pub fn delete(target: Expr, key: Option<Expr>) -> Expr {
    expr(ExprKind::Delete {
        target: boxed(target),
        key: key.map(boxed),
    })
}

pub fn include(item: Expr, list: Expr) -> Expr {
    expr(ExprKind::Include {
        item: boxed(item),
        list: boxed(list),
    })
}

pub fn inc(target: Expr) -> Expr {
    expr(ExprKind::IncDec {
        target: boxed(target),
        op: IncDecOp::Inc,
    })
}

pub fn dec(target: Expr) -> Expr {
    expr(ExprKind::IncDec {
        target: boxed(target),
        op: IncDecOp::Dec,
    })
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: boxed(lhs),
        rhs: boxed(rhs),
    })
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Add, lhs, rhs)
}

pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Sub, lhs, rhs)
}

pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Mul, lhs, rhs)
}

pub fn div(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Div, lhs, rhs)
}

pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Eq, lhs, rhs)
}

pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Lt, lhs, rhs)
}

pub fn gt(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Gt, lhs, rhs)
}

pub fn let_expr(targets: Vec<Expr>, values: Vec<Expr>) -> Expr {
    expr(ExprKind::Let { targets, values })
}

pub fn op_assign(op: BinaryOp, target: Expr, value: Expr) -> Expr {
    expr(ExprKind::OpAssign {
        op,
        target: boxed(target),
        value: boxed(value),
    })
}

// Statements

pub fn expr_stmt(e: Expr) -> Stmt {
    stmt(StmtKind::Expr(e))
}

pub fn var(names: &[&str], values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Var {
        names: names.iter().map(Name::new).collect(),
        values,
    })
}

/// `target = value`
pub fn assign(target: Expr, value: Expr) -> Stmt {
    stmt(StmtKind::Let {
        targets: vec![target],
        values: vec![value],
    })
}

pub fn lets(targets: Vec<Expr>, values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Let { targets, values })
}

/// `v, ok = source`
pub fn let_presence(targets: Vec<Expr>, source: Expr) -> Stmt {
    stmt(StmtKind::LetPresence { targets, source })
}

pub fn if_(cond: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If {
        cond,
        then,
        else_ifs: Vec::new(),
        otherwise: None,
    })
}

pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If {
        cond,
        then,
        else_ifs: Vec::new(),
        otherwise: Some(otherwise),
    })
}

pub fn if_chain(
    cond: Expr,
    then: Vec<Stmt>,
    else_ifs: Vec<(Expr, Vec<Stmt>)>,
    otherwise: Option<Vec<Stmt>>,
) -> Stmt {
    stmt(StmtKind::If {
        cond,
        then,
        else_ifs,
        otherwise,
    })
}

pub fn try_catch(
    body: Vec<Stmt>,
    catch_var: Option<&str>,
    catch: Vec<Stmt>,
    finally: Option<Vec<Stmt>>,
) -> Stmt {
    stmt(StmtKind::Try {
        body,
        catch_var: catch_var.map(Name::new),
        catch,
        finally,
    })
}

pub fn loop_(cond: Option<Expr>, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Loop { cond, body })
}

pub fn for_in(vars: &[&str], iterable: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::ForEach {
        vars: vars.iter().map(Name::new).collect(),
        iterable,
        body,
    })
}

pub fn c_for(init: Option<Stmt>, cond: Option<Expr>, post: Option<Stmt>, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::CFor {
        init: init.map(Box::new),
        cond,
        post: post.map(Box::new),
        body,
    })
}

pub fn brk() -> Stmt {
    stmt(StmtKind::Break)
}

pub fn cont() -> Stmt {
    stmt(StmtKind::Continue)
}

pub fn ret(values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Return(values))
}

pub fn throw(e: Expr) -> Stmt {
    stmt(StmtKind::Throw(e))
}

pub fn module(name: &str, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Module {
        name: Name::new(name),
        body,
    })
}

pub fn select(cases: Vec<SelectCase>, default: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::Select { cases, default })
}

/// `case [bind =] <-chan:`
pub fn recv_case(bind: Option<&str>, chan: Expr, body: Vec<Stmt>) -> SelectCase {
    SelectCase {
        op: SelectOp::Recv {
            bind: bind.map(Name::new),
            chan,
        },
        body,
        pos: Position::UNKNOWN,
    }
}

/// `case chan <- value:`
pub fn send_case(chan: Expr, value: Expr, body: Vec<Stmt>) -> SelectCase {
    SelectCase {
        op: SelectOp::Send { chan, value },
        body,
        pos: Position::UNKNOWN,
    }
}

pub fn switch(value: Expr, cases: Vec<SwitchCase>, default: Option<Vec<Stmt>>) -> Stmt {
    stmt(StmtKind::Switch {
        value,
        cases,
        default,
    })
}

pub fn case(values: Vec<Expr>, body: Vec<Stmt>) -> SwitchCase {
    SwitchCase { values, body }
}

pub fn go(call: Expr) -> Stmt {
    stmt(StmtKind::Go(call))
}

pub fn defer(call: Expr) -> Stmt {
    stmt(StmtKind::Defer(call))
}

// Types

pub fn ty(name: &str) -> TypeExpr {
    TypeExpr::named(name)
}

pub fn slice_of(elem: TypeExpr) -> TypeExpr {
    TypeExpr::Slice(Box::new(elem))
}

pub fn map_of(key: TypeExpr, value: TypeExpr) -> TypeExpr {
    TypeExpr::Map(Box::new(key), Box::new(value))
}

pub fn ptr_of(elem: TypeExpr) -> TypeExpr {
    TypeExpr::Pointer(Box::new(elem))
}

pub fn chan_of(elem: TypeExpr) -> TypeExpr {
    TypeExpr::Chan(Box::new(elem), ChanDirection::Both)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn at_sets_position() {
        let e = int(1).at(4, 2);
        assert_eq!(e.pos, Position::new(4, 2));
        let s = brk().at(7, 1);
        assert_eq!(s.pos, Position::new(7, 1));
    }

    #[test]
    fn send_and_receive_shapes() {
        match send(ident("ch"), int(1)).kind {
            ExprKind::Chan { lhs: Some(_), .. } => {}
            other => panic!("unexpected {other:?}"),
        }
        match recv(ident("ch")).kind {
            ExprKind::Chan { lhs: None, .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn method_call_is_anon_call_on_member() {
        let e = method_call(ident("s"), "Len", vec![]);
        assert!(e.is_call());
        let ExprKind::AnonCall { callee, .. } = e.kind else {
            panic!("expected anon call");
        };
        assert_eq!(*callee, member(ident("s"), "Len"));
    }

    #[test]
    fn named_func_keeps_name() {
        let ExprKind::Func(lit) = func_named("f", &["a"], vec![]).kind else {
            panic!("expected func");
        };
        assert_eq!(lit.name.as_deref(), Some("f"));
        assert_eq!(lit.params.len(), 1);
        assert!(!lit.variadic);
    }
}
