//! Loops.
//!
//! Each iteration passes a checkpoint and runs its body in a fresh scope.
//! `break` and `continue` are consumed by the innermost loop; every other
//! signal propagates. Validation runs each body once.

use kite_ir::{Expr, Name, Stmt};
use kite_value::convert::to_bool;
use kite_value::errors::{invalid_operation, syntax_rejection};
use kite_value::{ControlAction, Env, EvalError, EvalResult, Value};

use super::access::auto_deref;
use super::Interpreter;

/// What the loop does after one body run.
enum Flow {
    Next,
    Stop,
}

/// Consume loop signals.
fn flow(result: EvalResult) -> EvalResult<Flow> {
    match result {
        Ok(_) | Err(ControlAction::Continue) => Ok(Flow::Next),
        Err(ControlAction::Break) => Ok(Flow::Stop),
        Err(action) => Err(action),
    }
}

impl Interpreter {
    fn iteration(&self, body: &[Stmt], scope: &Env) -> EvalResult<Flow> {
        self.ctx.checkpoint()?;
        flow(self.exec_block(body, scope))
    }

    /// `for {}` and `for cond {}`.
    pub(crate) fn exec_loop(&self, cond: Option<&Expr>, body: &[Stmt], env: &Env) -> EvalResult {
        loop {
            if let Some(cond) = cond {
                let holds = to_bool(&self.eval_expr(cond, env)?);
                if !holds && !self.ctx.is_validating() {
                    break;
                }
            }
            if let Flow::Stop = self.iteration(body, &env.new_child())? {
                break;
            }
            if self.ctx.is_validating() {
                break;
            }
        }
        Ok(Value::Nil)
    }

    /// `for init; cond; post {}`. `init` bindings live in a scope shared by
    /// every iteration.
    pub(crate) fn exec_c_for(
        &self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &[Stmt],
        env: &Env,
    ) -> EvalResult {
        let scope = env.new_child();
        if let Some(init) = init {
            self.exec_stmt(init, &scope)?;
        }
        loop {
            if let Some(cond) = cond {
                let holds = to_bool(&self.eval_expr(cond, &scope)?);
                if !holds && !self.ctx.is_validating() {
                    break;
                }
            }
            if let Flow::Stop = self.iteration(body, &scope.new_child())? {
                break;
            }
            if let Some(post) = post {
                self.exec_stmt(post, &scope)?;
            }
            if self.ctx.is_validating() {
                break;
            }
        }
        Ok(Value::Nil)
    }

    /// Run one iteration with `vars` bound to `values`.
    fn bind_iteration(&self, vars: &[Name], values: [Value; 2], body: &[Stmt], env: &Env) -> EvalResult<Flow> {
        let scope = env.new_child();
        let [first, second] = values;
        match vars {
            [only] => scope.define_value(only.clone(), second),
            [a, b] => {
                scope.define_value(a.clone(), first);
                scope.define_value(b.clone(), second);
            }
            _ => {}
        }
        self.iteration(body, &scope)
    }

    /// `for v in xs`, `for i, v in xs`, `for k in m`, `for k, v in m`,
    /// `for v in ch`, `for c in s`.
    pub(crate) fn exec_for_each(
        &self,
        vars: &[Name],
        iterable: &Expr,
        body: &[Stmt],
        env: &Env,
    ) -> EvalResult {
        if vars.is_empty() || vars.len() > 2 {
            return Err(syntax_rejection("for-in takes one or two variables").into());
        }
        let validating = self.ctx.is_validating();
        match auto_deref(self.eval_expr(iterable, env)?)? {
            Value::Array(arr) => {
                let len = arr.len();
                if validating {
                    let first = arr.get(0).unwrap_or_else(|| arr.elem().zero_value());
                    self.bind_iteration(vars, [Value::Int(0), first], body, env)?;
                    return Ok(Value::Nil);
                }
                for i in 0..len {
                    let Some(item) = arr.get(i) else { break };
                    if let Flow::Stop = self.bind_iteration(vars, [Value::Int(i as i64), item], body, env)? {
                        break;
                    }
                }
            }
            Value::Map(map) => {
                let keys = {
                    let _guard = self.ctx.map_guard();
                    map.keys()
                };
                if validating {
                    let key = keys.into_iter().next().unwrap_or_else(|| map.key_type().zero_value());
                    let values = if vars.len() == 1 {
                        [Value::Nil, key]
                    } else {
                        [key, map.elem_type().zero_value()]
                    };
                    self.bind_iteration(vars, values, body, env)?;
                    return Ok(Value::Nil);
                }
                for key in keys {
                    let value = {
                        let _guard = self.ctx.map_guard();
                        map.get(&key)?
                    };
                    // Deleted while iterating.
                    let Some(value) = value else { continue };
                    let values = if vars.len() == 1 { [Value::Nil, key] } else { [key, value] };
                    if let Flow::Stop = self.bind_iteration(vars, values, body, env)? {
                        break;
                    }
                }
            }
            Value::Chan(ch) => {
                if vars.len() != 1 {
                    return Err(syntax_rejection("range over a channel takes one variable").into());
                }
                loop {
                    let (item, ok) = self.chan_recv(&ch)?;
                    if !ok {
                        break;
                    }
                    if let Flow::Stop = self.bind_iteration(vars, [Value::Nil, item], body, env)? {
                        break;
                    }
                    if validating {
                        break;
                    }
                }
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                if validating {
                    let first = chars.first().map_or_else(String::new, char::to_string);
                    self.bind_iteration(vars, [Value::Int(0), Value::string(first)], body, env)?;
                    return Ok(Value::Nil);
                }
                for (i, c) in chars.into_iter().enumerate() {
                    let values = [Value::Int(i as i64), Value::string(c.to_string())];
                    if let Flow::Stop = self.bind_iteration(vars, values, body, env)? {
                        break;
                    }
                }
            }
            Value::Nil => {}
            other => return Err(cannot_range(&other).into()),
        }
        Ok(Value::Nil)
    }
}

#[cold]
fn cannot_range(value: &Value) -> EvalError {
    invalid_operation(format!("cannot range over {}", value.type_name()))
}
