//! Statement execution.

use kite_ir::{Expr, ExprKind, Name, Stmt, StmtKind, SwitchCase};
use kite_value::convert::to_bool;
use kite_value::errors::thrown;
use kite_value::{equal, ControlAction, Env, EvalResult, Value};

use super::Interpreter;
use crate::stack::ensure_sufficient_stack;

/// Spread a single array across several targets; otherwise pair values
/// with targets positionally. Missing values are nil.
fn distribute(count: usize, mut values: Vec<Value>) -> Vec<Value> {
    if count > 1 && values.len() == 1 {
        if let Some(Value::Array(arr)) = values.first() {
            values = arr.to_vec();
        }
    }
    values.resize(count, Value::Nil);
    values
}

impl Interpreter {
    pub(crate) fn exec_stmt(&self, stmt: &Stmt, env: &Env) -> EvalResult {
        ensure_sufficient_stack(|| {
            self.ctx
                .checkpoint()
                .map_err(|e| ControlAction::from(e.tag(stmt.pos)))?;
            self.exec_stmt_inner(stmt, env)
        })
        .map_err(|action| action.tag(stmt.pos))
    }

    fn exec_stmt_inner(&self, stmt: &Stmt, env: &Env) -> EvalResult {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.eval_expr(expr, env),
            StmtKind::Var { names, values } => self.exec_var(names, values, env),
            StmtKind::Let { targets, values } => self.exec_assign(targets, values, env),
            StmtKind::LetPresence { targets, source } => self.exec_presence(targets, source, env),
            StmtKind::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => self.exec_if(cond, then, else_ifs, otherwise.as_deref(), env),
            StmtKind::Try {
                body,
                catch_var,
                catch,
                finally,
            } => self.exec_try(body, catch_var.as_ref(), catch, finally.as_deref(), env),
            StmtKind::Loop { cond, body } => self.exec_loop(cond.as_ref(), body, env),
            StmtKind::ForEach {
                vars,
                iterable,
                body,
            } => self.exec_for_each(vars, iterable, body, env),
            StmtKind::CFor {
                init,
                cond,
                post,
                body,
            } => self.exec_c_for(init.as_deref(), cond.as_ref(), post.as_deref(), body, env),
            StmtKind::Break => Err(ControlAction::Break),
            StmtKind::Continue => Err(ControlAction::Continue),
            StmtKind::Return(values) => {
                let mut results = values
                    .iter()
                    .map(|v| self.eval_expr(v, env))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = match results.len() {
                    0 => Value::Nil,
                    1 => results.pop().unwrap_or(Value::Nil),
                    _ => Value::array(results),
                };
                Err(ControlAction::Return(value))
            }
            StmtKind::Throw(expr) => {
                let err = match self.eval_expr(expr, env)? {
                    Value::Error(err) => (*err).clone(),
                    other => thrown(other.to_string()),
                };
                Err(err.tag(stmt.pos).into())
            }
            StmtKind::Module { name, body } => self.exec_module(name, body, env),
            StmtKind::Select { cases, default } => self.exec_select(cases, default.as_deref(), env),
            StmtKind::Switch {
                value,
                cases,
                default,
            } => self.exec_switch(value, cases, default.as_deref(), env),
            StmtKind::Go(call) => self.exec_go(call, env, stmt.pos),
            StmtKind::Defer(call) => self.exec_defer(call, env),
        }
    }

    /// `var a, b = x, y` defines in the current scope.
    fn exec_var(&self, names: &[Name], values: &[Expr], env: &Env) -> EvalResult {
        let evaluated = values
            .iter()
            .map(|v| self.eval_expr(v, env))
            .collect::<Result<Vec<_>, _>>()?;
        let values = distribute(names.len(), evaluated);
        let mut last = Value::Nil;
        for (name, value) in names.iter().zip(values) {
            env.define_value(name.clone(), value.clone());
            last = value;
        }
        Ok(last)
    }

    /// `a, b = x, y`: every right side is evaluated before any target is
    /// written.
    pub(crate) fn exec_assign(&self, targets: &[Expr], values: &[Expr], env: &Env) -> EvalResult {
        let evaluated = values
            .iter()
            .map(|v| self.eval_expr(v, env))
            .collect::<Result<Vec<_>, _>>()?;
        let values = distribute(targets.len(), evaluated);
        let mut last = Value::Nil;
        for (target, value) in targets.iter().zip(values) {
            self.assign(target, value.clone(), env)?;
            last = value;
        }
        Ok(last)
    }

    /// `v, ok = m[k]` and `v, ok = <-ch`.
    fn exec_presence(&self, targets: &[Expr], source: &Expr, env: &Env) -> EvalResult {
        let (value, ok) = match &source.kind {
            ExprKind::Index { base, index } => {
                let base_value = self.eval_expr(base, env)?;
                let key = self.eval_expr(index, env)?;
                match super::access::auto_deref(base_value)? {
                    Value::Map(map) => self.map_lookup(&map, &key)?,
                    other => (self.index_get(other, &key)?, true),
                }
            }
            ExprKind::Chan { lhs: None, rhs } => match self.eval_expr(rhs, env)? {
                Value::Chan(ch) => self.chan_recv(&ch)?,
                other => (other, true),
            },
            _ => (self.eval_expr(source, env)?, true),
        };
        let mut targets = targets.iter();
        if let Some(target) = targets.next() {
            self.assign(target, value.clone(), env)?;
        }
        if let Some(target) = targets.next() {
            self.assign(target, Value::Bool(ok), env)?;
        }
        Ok(value)
    }

    /// Validation runs every branch.
    fn exec_if(
        &self,
        cond: &Expr,
        then: &[Stmt],
        else_ifs: &[(Expr, Vec<Stmt>)],
        otherwise: Option<&[Stmt]>,
        env: &Env,
    ) -> EvalResult {
        if self.ctx.is_validating() {
            self.eval_expr(cond, env)?;
            self.exec_block(then, &env.new_child())?;
            for (cond, body) in else_ifs {
                self.eval_expr(cond, env)?;
                self.exec_block(body, &env.new_child())?;
            }
            if let Some(body) = otherwise {
                self.exec_block(body, &env.new_child())?;
            }
            return Ok(Value::Nil);
        }

        if to_bool(&self.eval_expr(cond, env)?) {
            return self.exec_block(then, &env.new_child());
        }
        for (cond, body) in else_ifs {
            if to_bool(&self.eval_expr(cond, env)?) {
                return self.exec_block(body, &env.new_child());
            }
        }
        match otherwise {
            Some(body) => self.exec_block(body, &env.new_child()),
            None => Ok(Value::Nil),
        }
    }

    /// Errors other than interrupts divert into `catch`. `finally` always
    /// runs; its own failure replaces the outcome.
    fn exec_try(
        &self,
        body: &[Stmt],
        catch_var: Option<&Name>,
        catch: &[Stmt],
        finally: Option<&[Stmt]>,
        env: &Env,
    ) -> EvalResult {
        let outcome = match self.exec_block(body, &env.new_child()) {
            Err(ControlAction::Error(err)) if !err.is_interrupted() => {
                let scope = env.new_child();
                if let Some(name) = catch_var {
                    scope.define_value(name.clone(), Value::error(err));
                }
                self.exec_block(catch, &scope)
            }
            other => other,
        };
        if let Some(finally) = finally {
            self.exec_block(finally, &env.new_child())?;
        }
        outcome
    }

    fn exec_module(&self, name: &Name, body: &[Stmt], env: &Env) -> EvalResult {
        let scope = env.new_child();
        self.exec_block(body, &scope)?;
        tracing::debug!(module = %name, members = scope.local_names().len(), "define module");
        let module = Value::Module(scope);
        env.define_value(name.clone(), module.clone());
        Ok(module)
    }

    /// Cases compare with `equal`; `break` leaves the switch.
    fn exec_switch(
        &self,
        value: &Expr,
        cases: &[SwitchCase],
        default: Option<&[Stmt]>,
        env: &Env,
    ) -> EvalResult {
        let subject = self.eval_expr(value, env)?;
        let mut chosen = None;
        'cases: for case in cases {
            for candidate in &case.values {
                if equal(&subject, &self.eval_expr(candidate, env)?) {
                    chosen = Some(case.body.as_slice());
                    break 'cases;
                }
            }
        }
        let Some(body) = chosen.or(default) else {
            return Ok(Value::Nil);
        };
        match self.exec_block(body, &env.new_child()) {
            Err(ControlAction::Break) => Ok(Value::Nil),
            other => other,
        }
    }
}
