//! Expression evaluation.

use kite_ir::{BinaryOp, Expr, ExprKind, Literal};
use kite_value::convert::to_bool;
use kite_value::errors::{invalid_operation, EvalErrorKind};
use kite_value::{ControlAction, Env, EvalError, EvalResult, FuncValue, PointerValue, Value};

use super::access::auto_deref;
use super::Interpreter;
use crate::operators::evaluate_binary;
use crate::stack::ensure_sufficient_stack;
use crate::unary_operators::evaluate_unary;

impl Interpreter {
    /// Evaluate an expression: checkpoint, dispatch, tag errors with the
    /// expression's position.
    pub(crate) fn eval_expr(&self, expr: &Expr, env: &Env) -> EvalResult {
        ensure_sufficient_stack(|| {
            self.ctx
                .checkpoint()
                .map_err(|e| ControlAction::from(e.tag(expr.pos)))?;
            self.eval_expr_inner(expr, env)
        })
        .map_err(|action| action.tag(expr.pos))
    }

    fn eval_expr_inner(&self, expr: &Expr, env: &Env) -> EvalResult {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::string(&**s),
            }),
            ExprKind::Ident(name) => Ok(env.get_value(name).map_err(EvalError::from)?),
            ExprKind::Array { elem, items } => self.eval_array_literal(elem.as_ref(), items, env),
            ExprKind::Map { types, entries } => self.eval_map_literal(types.as_ref(), entries, env),
            ExprKind::Deref(inner) => match self.eval_expr(inner, env)? {
                Value::Pointer(p) => Ok(auto_deref(Value::Pointer(p))?),
                other => Err(invalid_operation(format!("cannot dereference {}", other.type_name())).into()),
            },
            ExprKind::AddrOf(inner) => self.eval_addr_of(inner, env),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, env)?;
                Ok(evaluate_unary(value, *op)?)
            }
            ExprKind::Paren(inner) => self.eval_expr(inner, env),
            ExprKind::Member { base, name } => {
                let base = self.eval_expr(base, env)?;
                Ok(self.member_get(base, name)?)
            }
            ExprKind::Index { base, index } => {
                let base = self.eval_expr(base, env)?;
                let index = self.eval_expr(index, env)?;
                Ok(self.index_get(base, &index)?)
            }
            ExprKind::Slice { base, begin, end } => {
                let base = self.eval_expr(base, env)?;
                let begin = begin.as_deref().map(|e| self.eval_expr(e, env)).transpose()?;
                let end = end.as_deref().map(|e| self.eval_expr(e, env)).transpose()?;
                Ok(self.slice_get(base, begin.as_ref(), end.as_ref())?)
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if to_bool(&self.eval_expr(cond, env)?) {
                    self.eval_expr(then, env)
                } else {
                    self.eval_expr(otherwise, env)
                }
            }
            ExprKind::NilCoalesce { lhs, rhs } => match self.eval_expr(lhs, env) {
                Ok(value) if !value.is_nil() && !value.is_invalid() => Ok(value),
                Ok(_) => self.eval_expr(rhs, env),
                Err(ControlAction::Error(err)) if !err.is_interrupted() => self.eval_expr(rhs, env),
                Err(action) => Err(action),
            },
            ExprKind::Len(inner) => {
                let value = self.eval_expr(inner, env)?;
                Ok(self.len_of(value)?)
            }
            ExprKind::New(ty) => self.eval_new(ty, env),
            ExprKind::Make { ty, len, cap } => self.eval_make(ty, len.as_deref(), cap.as_deref(), env),
            ExprKind::MakeType { name, value } => self.eval_make_type(name, value, env),
            ExprKind::MakeChan { elem, size } => self.eval_make_chan(elem, size.as_deref(), env),
            ExprKind::Chan { lhs, rhs } => self.eval_chan_op(lhs.as_deref(), rhs, env),
            ExprKind::Func(lit) => {
                let func = Value::Func(FuncValue::script(lit.clone(), env.clone()));
                if let Some(name) = &lit.name {
                    env.define_value(name.clone(), func.clone());
                }
                Ok(func)
            }
            ExprKind::AnonCall { .. } | ExprKind::Call { .. } => self.eval_call(expr, env),
            ExprKind::Close(inner) => match self.eval_expr(inner, env)? {
                Value::Chan(ch) => {
                    if !self.ctx.is_validating() {
                        ch.close()?;
                    }
                    Ok(Value::Nil)
                }
                other => Err(invalid_operation(format!("cannot close {}", other.type_name())).into()),
            },
            ExprKind::Delete { target, key } => self.eval_delete(target, key.as_deref(), env),
            ExprKind::Include { item, list } => {
                let item = self.eval_expr(item, env)?;
                let list = self.eval_expr(list, env)?;
                Ok(self.includes(&item, list)?)
            }
            ExprKind::IncDec { target, op } => self.eval_inc_dec(target, op.delta(), env),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, env),
            ExprKind::Let { targets, values } => self.exec_assign(targets, values, env),
            ExprKind::OpAssign { op, target, value } => {
                let current = self.eval_expr(target, env)?;
                let rhs = self.eval_expr(value, env)?;
                let result = evaluate_binary(current, rhs, *op)?;
                self.assign(target, result.clone(), env)?;
                Ok(result)
            }
        }
    }

    fn eval_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &Env) -> EvalResult {
        match op {
            BinaryOp::And => {
                let left = to_bool(&self.eval_expr(lhs, env)?);
                Ok(Value::Bool(left && to_bool(&self.eval_expr(rhs, env)?)))
            }
            BinaryOp::Or => {
                let left = to_bool(&self.eval_expr(lhs, env)?);
                Ok(Value::Bool(left || to_bool(&self.eval_expr(rhs, env)?)))
            }
            _ => {
                let left = self.eval_expr(lhs, env)?;
                let right = self.eval_expr(rhs, env)?;
                Ok(evaluate_binary(left, right, op)?)
            }
        }
    }

    /// `&x` aliases the binding of an identifier. Anything else is copied
    /// into a fresh cell.
    fn eval_addr_of(&self, inner: &Expr, env: &Env) -> EvalResult {
        if let Some(name) = inner.as_ident() {
            let slot = env
                .slot(name)
                .ok_or_else(|| kite_value::errors::undefined_symbol(name))?;
            let elem = slot.read().type_desc();
            return Ok(Value::Pointer(PointerValue::from_slot(elem, slot)));
        }
        let value = self.eval_expr(inner, env)?;
        Ok(Value::Pointer(PointerValue::to_new(value.type_desc(), value)))
    }

    /// `<-ch`, `ch <- v` and `v <- ch`.
    ///
    /// With a left operand, a channel on the left means send; otherwise a
    /// channel on the right is received into the left operand.
    fn eval_chan_op(&self, lhs: Option<&Expr>, rhs: &Expr, env: &Env) -> EvalResult {
        let Some(lhs) = lhs else {
            return match self.eval_expr(rhs, env)? {
                Value::Chan(ch) => Ok(self.chan_recv(&ch)?.0),
                other => Err(invalid_operation(format!("receive from {}", other.type_name())).into()),
            };
        };
        let right = self.eval_expr(rhs, env)?;
        let left = match self.eval_expr(lhs, env) {
            Ok(value) => Some(value),
            Err(ControlAction::Error(err))
                if matches!(err.kind, EvalErrorKind::UndefinedSymbol { .. }) =>
            {
                None
            }
            Err(action) => return Err(action),
        };
        match (left, right) {
            (Some(Value::Chan(ch)), value) => {
                self.chan_send(&ch, value)?;
                Ok(Value::Nil)
            }
            (_, Value::Chan(ch)) => {
                let (value, _) = self.chan_recv(&ch)?;
                self.assign(lhs, value.clone(), env)?;
                Ok(value)
            }
            (_, other) => Err(invalid_operation(format!("send to non-channel ({})", other.type_name())).into()),
        }
    }

    /// `delete(m, k)`, `delete("name")`, `delete("name", true)`.
    fn eval_delete(&self, target: &Expr, key: Option<&Expr>, env: &Env) -> EvalResult {
        let target = self.eval_expr(target, env)?;
        let key = key.map(|k| self.eval_expr(k, env)).transpose()?;
        match (auto_deref(target)?, key) {
            (Value::Map(map), Some(key)) => {
                let key = super::access::map_key(&map, &key)?;
                if !self.ctx.is_validating() && !map.is_nil() {
                    let _guard = self.ctx.map_guard();
                    map.remove(&key)?;
                }
                Ok(Value::Nil)
            }
            (Value::Str(_), _) if self.ctx.is_validating() => Ok(Value::Nil),
            (Value::Str(name), global) => {
                if global.as_ref().is_some_and(to_bool) {
                    env.delete_global(&name);
                } else {
                    env.delete(&name);
                }
                Ok(Value::Nil)
            }
            (Value::Map(_), None) => Err(invalid_operation("delete from a map needs a key").into()),
            (other, _) => Err(invalid_operation(format!("cannot delete from {}", other.type_name())).into()),
        }
    }
}
