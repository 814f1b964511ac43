//! Host object capability.

use super::{Invoker, Value};
use crate::errors::{no_member, EvalError};

/// An opaque value owned by the embedding program.
///
/// Scripts reach fields and methods by name; everything defaults to
/// "no such member" so implementors override only what they expose.
pub trait HostObject: Send + Sync {
    fn type_name(&self) -> &str;

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn call_method(
        &self,
        name: &str,
        _invoker: &dyn Invoker,
        _args: Vec<Value>,
    ) -> Result<Vec<Value>, EvalError> {
        Err(no_member(self.type_name(), name))
    }

    fn has_field(&self, _name: &str) -> bool {
        false
    }

    fn field(&self, _name: &str) -> Option<Value> {
        None
    }

    fn set_field(&self, name: &str, _value: Value) -> Result<(), EvalError> {
        Err(no_member(self.type_name(), name))
    }
}
