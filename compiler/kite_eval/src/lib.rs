//! Kite Eval - tree-walking evaluator for the Kite scripting language.
//!
//! This crate provides the runtime for Kite programs given as `kite_ir`
//! statement trees.
//!
//! # Architecture
//!
//! The evaluator uses:
//! - `Interpreter`: expression, statement and call evaluation against a
//!   [`kite_value::Env`] scope chain
//! - `ExecContext`: run state shared with goroutines (cancellation, step
//!   budget, pause gate, rate limit, map lock, async errors)
//! - `evaluate_binary` / `evaluate_unary`: direct enum-based operator
//!   dispatch
//! - `PackageRegistry`: host packages importable by scripts
//! - `SharedPrintHandler`: destination of `print` / `println`
//!
//! # Usage
//!
//! ```ignore
//! let interp = Interpreter::builder().max_steps(1_000_000).build();
//! let env = interp.new_env();
//! let result = interp.execute(&program, &env)?;
//! ```

mod config;
mod context;
pub mod interpreter;
mod operators;
mod packages;
mod print_handler;
mod stack;
mod unary_operators;

use std::sync::Once;

pub use config::RunConfig;
pub use context::{CancelSignal, ExecContext};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use operators::evaluate_binary;
pub use packages::{define_core, strings_package, Package, PackageRegistry};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use stack::ensure_sufficient_stack;
pub use unary_operators::evaluate_unary;

// Value types, for hosts that only depend on this crate.
pub use kite_value::{
    ControlAction, Env, EvalError, EvalErrorKind, EvalResult, FuncValue, HostObject,
    InterruptReason, Invoker, StructType, TypeDesc, Value,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber for debugging.
///
/// Call this early in your program to enable tracing output.
/// Uses `RUST_LOG` environment variable for filtering.
///
/// # Example
///
/// ```bash
/// RUST_LOG=kite_eval=debug kite-run script.kite
/// RUST_LOG=kite_eval::interpreter=trace kite-run script.kite
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests;
