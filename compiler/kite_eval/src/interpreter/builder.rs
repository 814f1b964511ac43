//! `InterpreterBuilder` for creating configured interpreters.

use std::sync::Arc;

use super::Interpreter;
use crate::config::RunConfig;
use crate::context::ExecContext;
use crate::packages::PackageRegistry;
use crate::print_handler::{stdout_handler, SharedPrintHandler};

/// Builder for [`Interpreter`].
///
/// Defaults: no step budget, no throttling, host panics recovered, output
/// to stdout, bundled packages registered.
#[derive(Default)]
pub struct InterpreterBuilder {
    config: RunConfig,
    print_handler: Option<SharedPrintHandler>,
    packages: Option<Arc<PackageRegistry>>,
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole run configuration.
    #[must_use]
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Interrupt the run after `steps` checkpoints.
    #[must_use]
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.config.max_steps = Some(steps);
        self
    }

    #[must_use]
    pub fn steps_per_second(mut self, steps: u64) -> Self {
        self.config.steps_per_second = Some(steps);
        self
    }

    /// Whether host panics become `Panic` errors (default) or propagate.
    #[must_use]
    pub fn recover_panics(mut self, recover: bool) -> Self {
        self.config.recover_panics = recover;
        self
    }

    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Share a package registry between interpreters.
    #[must_use]
    pub fn packages(mut self, packages: Arc<PackageRegistry>) -> Self {
        self.packages = Some(packages);
        self
    }

    pub fn build(self) -> Interpreter {
        tracing::debug!(config = ?self.config, "building interpreter");
        Interpreter {
            ctx: ExecContext::new(&self.config),
            packages: self
                .packages
                .unwrap_or_else(|| Arc::new(PackageRegistry::with_stdlib())),
            print: self.print_handler.unwrap_or_else(stdout_handler),
        }
    }
}
