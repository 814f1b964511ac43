//! Call protocol.
//!
//! Script closures, host functions, bound methods and host-object methods
//! share one convention:
//!
//! 1. Arguments are bound against the callee's parameter layout, covering
//!    the four combinations of variadic callee and spread call site.
//! 2. Each argument converts to its declared parameter type.
//! 3. Results are normalized: no results is nil, one is itself, several
//!    form an `any` array. `f(g())` chains the raw result list instead.
//!
//! Script calls run in a fresh activation scope; deferred calls scheduled
//! there run newest first when the body finishes, whatever the outcome.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use kite_ir::{Expr, ExprKind, Position};
use kite_value::convert::convert_to;
use kite_value::errors::{
    argument_count_mismatch, argument_type_mismatch, host_panic, invalid_operation, not_callable,
    syntax_rejection,
};
use kite_value::{
    ArrayValue, ControlAction, DeferredCall, Env, EvalError, EvalResult, FuncValue, HostFunc,
    ScriptFunc, TypeDesc, Value,
};

use super::{control_to_error, Interpreter};
use crate::stack::ensure_sufficient_stack;

/// Parameter layout of a callee.
struct Binding {
    fixed: Vec<TypeDesc>,
    /// Element type of the variadic parameter.
    rest: Option<TypeDesc>,
}

fn convert_arg(value: &Value, ty: &TypeDesc) -> Result<Value, EvalError> {
    convert_to(value, ty).map_err(|_| argument_type_mismatch(&ty.to_string(), &value.type_name()))
}

fn convert_all(args: &[Value], types: &[TypeDesc]) -> Result<Vec<Value>, EvalError> {
    args.iter().zip(types).map(|(v, ty)| convert_arg(v, ty)).collect()
}

fn bind_args(binding: &Binding, mut args: Vec<Value>, spread: bool) -> Result<Vec<Value>, EvalError> {
    let spread_items = if spread {
        match args.pop() {
            Some(Value::Array(arr)) => Some(arr),
            Some(Value::Nil) => Some(ArrayValue::nil(TypeDesc::Any)),
            Some(other) => return Err(argument_type_mismatch("array", &other.type_name())),
            None => return Err(invalid_operation("spread call without arguments")),
        }
    } else {
        None
    };
    let n = binding.fixed.len();

    match (&binding.rest, spread_items) {
        (None, None) => {
            if args.len() != n {
                return Err(argument_count_mismatch(n, args.len()));
            }
            convert_all(&args, &binding.fixed)
        }
        (None, Some(items)) => {
            args.extend(items.to_vec());
            if args.len() != n {
                return Err(argument_count_mismatch(n, args.len()));
            }
            convert_all(&args, &binding.fixed)
        }
        (Some(elem), None) => {
            if args.len() < n {
                return Err(argument_count_mismatch(n + 1, args.len()));
            }
            let tail = args.split_off(n);
            let mut bound = convert_all(&args, &binding.fixed)?;
            let packed = tail
                .iter()
                .map(|v| convert_arg(v, elem))
                .collect::<Result<Vec<_>, _>>()?;
            bound.push(Value::Array(ArrayValue::new(elem.clone(), packed)));
            Ok(bound)
        }
        (Some(elem), Some(items)) => {
            if args.len() != n {
                return Err(argument_count_mismatch(n + 1, args.len() + 1));
            }
            let mut bound = convert_all(&args, &binding.fixed)?;
            bound.push(convert_arg(&Value::Array(items), &TypeDesc::slice(elem.clone()))?);
            Ok(bound)
        }
    }
}

/// Collapse a result list to a single value.
pub(crate) fn normalize(mut results: Vec<Value>) -> Value {
    match results.len() {
        0 => Value::Nil,
        1 => results.pop().unwrap_or(Value::Nil),
        _ => Value::array(results),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Interpreter {
    /// Call `func` and normalize its results.
    pub(crate) fn call_function(&self, func: &FuncValue, args: Vec<Value>, spread: bool) -> EvalResult {
        self.call_raw(func, args, spread).map(normalize)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(func = %func.name()))]
    pub(crate) fn call_raw(
        &self,
        func: &FuncValue,
        args: Vec<Value>,
        spread: bool,
    ) -> EvalResult<Vec<Value>> {
        match func {
            FuncValue::Script(f) => self.call_script(f, args, spread).map(|v| vec![v]),
            FuncValue::Host(f) => self.call_host(f, args, spread),
            FuncValue::Bound { recv, method } => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push((**recv).clone());
                full.extend(args);
                self.call_raw(method, full, spread)
            }
            FuncValue::HostMethod { obj, name } => {
                let args = if spread { Self::expand_spread(args)? } else { args };
                if self.ctx.is_validating() {
                    return Ok(Vec::new());
                }
                let label = format!("{}.{name}", obj.type_name());
                self.guard_host(&label, || obj.call_method(name, self, args))
                    .map_err(ControlAction::from)
            }
        }
    }

    fn expand_spread(mut args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        match args.pop() {
            Some(Value::Array(arr)) => {
                args.extend(arr.to_vec());
                Ok(args)
            }
            Some(Value::Nil) => Ok(args),
            Some(other) => Err(argument_type_mismatch("array", &other.type_name())),
            None => Err(invalid_operation("spread call without arguments")),
        }
    }

    fn script_binding(&self, f: &ScriptFunc) -> Result<Binding, EvalError> {
        let mut types = f
            .lit
            .params
            .iter()
            .map(|p| match &p.ty {
                Some(ty) => self.resolve_type(ty, &f.env),
                None => Ok(TypeDesc::Any),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rest = if f.lit.variadic { types.pop() } else { None };
        Ok(Binding { fixed: types, rest })
    }

    fn call_script(&self, f: &Arc<ScriptFunc>, args: Vec<Value>, spread: bool) -> EvalResult {
        let lit = &f.lit;
        let bound = bind_args(&self.script_binding(f)?, args, spread)?;
        if self.ctx.is_validating() && !self.ctx.mark_reachable(lit) {
            return Ok(Value::Nil);
        }

        let activation = f.env.new_activation();
        for (param, value) in lit.params.iter().zip(bound) {
            activation.define_value(param.name.clone(), value);
        }
        let result = match ensure_sufficient_stack(|| self.exec_block(&lit.body, &activation)) {
            Ok(_) => Ok(Value::Nil),
            Err(ControlAction::Return(value)) => Ok(value),
            Err(action) => Err(control_to_error(action)),
        };
        let deferred = self.run_defers(&activation);
        let value = result?;
        deferred?;
        Ok(value)
    }

    fn call_host(&self, f: &HostFunc, args: Vec<Value>, spread: bool) -> EvalResult<Vec<Value>> {
        let binding = match f.params.split_last() {
            Some((TypeDesc::Slice(elem), fixed)) if f.variadic => Binding {
                fixed: fixed.to_vec(),
                rest: Some((**elem).clone()),
            },
            Some((_, fixed)) if f.variadic => Binding {
                fixed: fixed.to_vec(),
                rest: Some(TypeDesc::Any),
            },
            _ => Binding {
                fixed: f.params.clone(),
                rest: None,
            },
        };
        let bound = bind_args(&binding, args, spread)?;
        if self.ctx.is_validating() {
            return Ok(f.results.iter().map(TypeDesc::zero_value).collect());
        }
        self.guard_host(&f.name, || f.call(self, bound))
            .map_err(ControlAction::from)
    }

    /// Run host code, converting a panic into a `Panic` error unless
    /// recovery is disabled.
    fn guard_host(
        &self,
        name: &str,
        body: impl FnOnce() -> Result<Vec<Value>, EvalError>,
    ) -> Result<Vec<Value>, EvalError> {
        if !self.ctx.recover_panics() {
            return body();
        }
        match catch_unwind(AssertUnwindSafe(body)) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(function = name, %message, "recovered host panic");
                Err(host_panic(name, &message))
            }
        }
    }

    /// Evaluate call arguments. A lone call argument passes its raw result
    /// list through, so `f(g())` spreads `g`'s results.
    fn eval_args(&self, args: &[Expr], env: &Env) -> EvalResult<Vec<Value>> {
        if let [single] = args {
            if single.is_call() {
                return self.eval_call_raw(single, env);
            }
        }
        args.iter().map(|arg| self.eval_expr(arg, env)).collect()
    }

    /// The callee and evaluated arguments of a call expression.
    fn prepare_call(&self, call: &Expr, env: &Env) -> EvalResult<(FuncValue, Vec<Value>, bool)> {
        let (callee, args, spread) = match &call.kind {
            ExprKind::Call { name, args, spread } => {
                (env.get_value(name).map_err(EvalError::from)?, args, *spread)
            }
            ExprKind::AnonCall { callee, args, spread } => {
                (self.eval_expr(callee, env)?, args, *spread)
            }
            _ => return Err(syntax_rejection("expected a call expression").into()),
        };
        let func = match callee {
            Value::Func(func) => func,
            other => return Err(not_callable(&other.type_name()).into()),
        };
        let args = self.eval_args(args, env)?;
        Ok((func, args, spread))
    }

    /// Evaluate a call expression to its raw result list.
    pub(crate) fn eval_call_raw(&self, call: &Expr, env: &Env) -> EvalResult<Vec<Value>> {
        ensure_sufficient_stack(|| {
            self.ctx
                .checkpoint()
                .map_err(|e| ControlAction::from(e.tag(call.pos)))?;
            let (func, args, spread) = self.prepare_call(call, env)?;
            self.call_raw(&func, args, spread)
        })
        .map_err(|action| action.tag(call.pos))
    }

    pub(crate) fn eval_call(&self, call: &Expr, env: &Env) -> EvalResult {
        let (func, args, spread) = self.prepare_call(call, env)?;
        self.call_function(&func, args, spread)
    }

    /// `go f(x)`: evaluate callee and arguments now, run the call on its
    /// own thread. Validation runs it inline.
    pub(crate) fn exec_go(&self, call: &Expr, env: &Env, pos: Position) -> EvalResult {
        if !call.is_call() {
            return Err(syntax_rejection("go needs a function call").into());
        }
        let (func, args, spread) = self.prepare_call(call, env)?;
        if self.ctx.is_validating() {
            self.call_function(&func, args, spread)?;
            return Ok(Value::Nil);
        }
        let worker = self.clone();
        let name = func.name();
        tracing::debug!(func = %name, %pos, "spawn goroutine");
        let handle = std::thread::Builder::new()
            .name(format!("kite-go-{name}"))
            .spawn(move || {
                if let Err(action) = worker.call_function(&func, args, spread) {
                    let err = control_to_error(action).tag(pos);
                    if err.is_interrupted() {
                        tracing::debug!(error = %err, "goroutine interrupted");
                    } else {
                        worker.ctx.report_async(err);
                    }
                }
            })
            .map_err(|e| invalid_operation(format!("cannot spawn goroutine: {e}")))?;
        self.ctx.track_spawned(handle);
        Ok(Value::Nil)
    }

    /// `defer f(x)`: evaluate callee and arguments now, schedule the call
    /// on the enclosing activation.
    pub(crate) fn exec_defer(&self, call: &Expr, env: &Env) -> EvalResult {
        if !call.is_call() {
            return Err(syntax_rejection("defer needs a function call").into());
        }
        let (func, args, spread) = self.prepare_call(call, env)?;
        env.push_defer(DeferredCall { func, args, spread });
        Ok(Value::Nil)
    }
}
