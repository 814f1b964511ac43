//! Tree-walking interpreter for Kite programs.
//!
//! # Architecture
//!
//! Evaluation is split by concern:
//! - `expr`: expression dispatch and operators
//! - `access`: member, index and slice reads
//! - `construct`: type resolution, `new`, `make`
//! - `lvalue`: assignment targets
//! - `call`: argument binding, script and host calls, `go`, `defer`
//! - `stmt`, `loops`, `select`: statements
//! - `chan`: blocking channel operations
//!
//! Every expression and statement passes a checkpoint on the shared
//! [`ExecContext`] before it runs, and errors are tagged with the position
//! of the innermost node they escape from.
//!
//! # Cloning
//!
//! An `Interpreter` is a cheap handle. Goroutines run on a clone, sharing
//! the run state (cancellation, budget, output) with the spawner.

mod access;
mod builder;
mod call;
mod chan;
mod construct;
mod expr;
mod loops;
mod lvalue;
mod select;
mod stmt;

use std::sync::Arc;

use kite_ir::Stmt;
use kite_value::errors::invalid_operation;
use kite_value::{ControlAction, Env, EvalError, EvalResult, FuncValue, Invoker, Value};

pub use builder::InterpreterBuilder;

use crate::context::ExecContext;
use crate::packages::{define_core, PackageRegistry};
use crate::print_handler::SharedPrintHandler;

#[derive(Clone)]
pub struct Interpreter {
    pub(crate) ctx: ExecContext,
    packages: Arc<PackageRegistry>,
    print: SharedPrintHandler,
}

impl Interpreter {
    /// An interpreter with default configuration, writing to stdout.
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// A root scope with the core builtins defined.
    pub fn new_env(&self) -> Env {
        let env = Env::new();
        define_core(&env, &self.print, &self.packages);
        env
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print
    }

    pub fn packages(&self) -> &Arc<PackageRegistry> {
        &self.packages
    }

    /// Run `stmts` in `env` and return the last statement's value.
    ///
    /// A top-level `return` ends the run with its value. Calls deferred at
    /// top level run before this returns.
    #[tracing::instrument(level = "debug", skip_all, fields(stmts = stmts.len()))]
    pub fn execute(&self, stmts: &[Stmt], env: &Env) -> Result<Value, EvalError> {
        let result = finish_body(self.exec_block(stmts, env));
        let deferred = self.run_defers(env);
        let value = result?;
        deferred?;
        Ok(value)
    }

    /// Check `stmts` without side effects.
    ///
    /// Both branches of every conditional run, loop bodies run once, host
    /// calls and channel operations are skipped, and each function body is
    /// entered once. Definitions land in a scratch scope under `env`.
    pub fn validate(&self, stmts: &[Stmt], env: &Env) -> Result<(), EvalError> {
        let checker = self.checker();
        let scratch = env.new_activation();
        let result = finish_body(checker.exec_block(stmts, &scratch));
        let deferred = checker.run_defers(&scratch);
        result?;
        deferred
    }

    /// Validate a single function body with nil arguments.
    pub fn validate_function(&self, func: &FuncValue) -> Result<(), EvalError> {
        let checker = self.checker();
        let args = match func {
            FuncValue::Script(f) => {
                let fixed = f.lit.params.len().saturating_sub(usize::from(f.lit.variadic));
                vec![Value::Nil; fixed]
            }
            _ => return Ok(()),
        };
        checker
            .call_function(func, args, false)
            .map(drop)
            .map_err(control_to_error)
    }

    /// A handle on the same run in validate mode.
    fn checker(&self) -> Interpreter {
        Interpreter {
            ctx: self.ctx.validating_copy(),
            packages: Arc::clone(&self.packages),
            print: Arc::clone(&self.print),
        }
    }

    /// Stop the run (and its goroutines) at the next checkpoint or blocking
    /// channel operation.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }

    /// Block every checkpoint until [`Interpreter::resume`] or cancellation.
    pub fn pause(&self) {
        self.ctx.pause();
    }

    pub fn resume(&self) {
        self.ctx.resume();
    }

    /// Steps taken so far by this run and its goroutines.
    pub fn steps(&self) -> u64 {
        self.ctx.steps()
    }

    /// Wait for every goroutine spawned so far.
    pub fn join_spawned(&self) {
        self.ctx.join_spawned();
    }

    /// Errors raised by goroutines since the last drain.
    pub fn drain_async_errors(&self) -> Vec<EvalError> {
        self.ctx.drain_async_errors()
    }

    /// Run a block directly in `env`.
    pub(crate) fn exec_block(&self, stmts: &[Stmt], env: &Env) -> EvalResult {
        let mut last = Value::Nil;
        for stmt in stmts {
            last = self.exec_stmt(stmt, env)?;
        }
        Ok(last)
    }

    /// Run the deferred calls of `env`'s activation, newest first. Every
    /// call runs even if an earlier one fails; the first failure is
    /// returned.
    pub(crate) fn run_defers(&self, env: &Env) -> Result<(), EvalError> {
        let mut first_error = None;
        while let Some(deferred) = env.get_defer() {
            env.remove_defer();
            if let Err(action) = self.call_function(&deferred.func, deferred.args, deferred.spread) {
                let err = control_to_error(action);
                tracing::debug!(error = %err, "deferred call failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Invoker for Interpreter {
    fn invoke(&self, func: &FuncValue, args: Vec<Value>) -> Result<Value, EvalError> {
        self.call_function(func, args, false)
            .map_err(control_to_error)
    }

    fn validating(&self) -> bool {
        self.ctx.is_validating()
    }
}

/// Resolve the signals that may end a body: `return` yields its value,
/// loop signals outside a loop are errors.
fn finish_body(result: EvalResult) -> Result<Value, EvalError> {
    match result {
        Ok(value) | Err(ControlAction::Return(value)) => Ok(value),
        Err(action) => Err(control_to_error(action)),
    }
}

/// Collapse a signal that escaped its construct into an error.
pub(crate) fn control_to_error(action: ControlAction) -> EvalError {
    match action {
        ControlAction::Error(err) => err,
        ControlAction::Break => invalid_operation("break outside of loop, switch or select"),
        ControlAction::Continue => invalid_operation("continue outside of loop"),
        ControlAction::Return(_) => invalid_operation("return outside of function"),
    }
}
