//! Function values: script closures, host functions and bound methods.

use std::fmt;
use std::sync::Arc;

use kite_ir::{FuncLit, Name};

use super::{HostObject, Value};
use crate::env::Env;
use crate::errors::EvalError;
use crate::types::TypeDesc;

/// Lets host code call back into the evaluator.
///
/// Every call made through an invoker goes through the same argument
/// binding and return normalization as a script call.
pub trait Invoker {
    fn invoke(&self, func: &FuncValue, args: Vec<Value>) -> Result<Value, EvalError>;

    /// Whether the run is a validation pass (no side effects).
    fn validating(&self) -> bool {
        false
    }
}

/// Host function body: receives the invoker and bound arguments, returns
/// zero or more results.
pub type HostFn = dyn Fn(&dyn Invoker, Vec<Value>) -> Result<Vec<Value>, EvalError> + Send + Sync;

/// A native function exposed to scripts.
pub struct HostFunc {
    pub name: Name,
    /// Declared parameter types. For variadic functions the last entry is
    /// the slice type collecting trailing arguments.
    pub params: Vec<TypeDesc>,
    /// Declared result types. Validation passes return their zero values
    /// instead of running the body.
    pub results: Vec<TypeDesc>,
    pub variadic: bool,
    body: Box<HostFn>,
}

impl HostFunc {
    pub fn new<F>(name: &str, params: Vec<TypeDesc>, variadic: bool, body: F) -> Self
    where
        F: Fn(&dyn Invoker, Vec<Value>) -> Result<Vec<Value>, EvalError> + Send + Sync + 'static,
    {
        HostFunc {
            name: Name::new(name),
            params,
            results: Vec::new(),
            variadic,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn with_results(mut self, results: Vec<TypeDesc>) -> Self {
        self.results = results;
        self
    }

    /// Run the body with already bound arguments.
    #[inline]
    pub fn call(&self, invoker: &dyn Invoker, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        (self.body)(invoker, args)
    }
}

/// A closure over a function literal and its defining scope.
pub struct ScriptFunc {
    pub lit: Arc<FuncLit>,
    pub env: Env,
}

#[derive(Clone)]
pub enum FuncValue {
    Script(Arc<ScriptFunc>),
    Host(Arc<HostFunc>),
    /// A struct method with its receiver captured.
    Bound {
        recv: Box<Value>,
        method: Box<FuncValue>,
    },
    /// A method looked up on a host object.
    HostMethod {
        obj: Arc<dyn HostObject>,
        name: Name,
    },
}

impl FuncValue {
    pub fn script(lit: Arc<FuncLit>, env: Env) -> Self {
        FuncValue::Script(Arc::new(ScriptFunc { lit, env }))
    }

    pub fn host<F>(name: &str, params: Vec<TypeDesc>, variadic: bool, body: F) -> Self
    where
        F: Fn(&dyn Invoker, Vec<Value>) -> Result<Vec<Value>, EvalError> + Send + Sync + 'static,
    {
        FuncValue::Host(Arc::new(HostFunc::new(name, params, variadic, body)))
    }

    /// Name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            FuncValue::Script(f) => f
                .lit
                .name
                .as_ref()
                .map_or_else(|| "anonymous".to_string(), ToString::to_string),
            FuncValue::Host(f) => f.name.to_string(),
            FuncValue::Bound { method, .. } => method.name(),
            FuncValue::HostMethod { obj, name } => format!("{}.{name}", obj.type_name()),
        }
    }

    /// Identity address. Script closures are keyed by their literal, so
    /// every closure created from one literal shares an identity.
    pub fn addr(&self) -> usize {
        match self {
            FuncValue::Script(f) => Arc::as_ptr(&f.lit) as usize,
            FuncValue::Host(f) => Arc::as_ptr(f) as usize,
            FuncValue::Bound { method, .. } => method.addr(),
            FuncValue::HostMethod { obj, .. } => Arc::as_ptr(obj).cast::<()>() as usize,
        }
    }

    /// Function type as far as it is known.
    pub fn signature(&self) -> crate::types::FuncType {
        match self {
            FuncValue::Script(f) => crate::types::FuncType {
                params: vec![TypeDesc::Any; f.lit.params.len()],
                results: Vec::new(),
                variadic: f.lit.variadic,
            },
            FuncValue::Host(f) => crate::types::FuncType {
                params: f.params.clone(),
                results: f.results.clone(),
                variadic: f.variadic,
            },
            FuncValue::Bound { method, .. } => {
                let mut sig = method.signature();
                if !sig.params.is_empty() {
                    sig.params.remove(0);
                }
                sig
            }
            FuncValue::HostMethod { .. } => crate::types::FuncType::default(),
        }
    }
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {}", self.name())
    }
}
