//! Runtime values for the Kite evaluator.
//!
//! # Sharing
//!
//! Arrays, maps, structs, pointers and channels are handles: cloning a
//! `Value` clones the handle, and mutations through one clone are visible
//! through every other. Strings are immutable. Heap storage is created only
//! through the factory methods here and the collection constructors, which
//! keeps the `Heap` constructor crate-private.
//!
//! # Thread Safety
//!
//! `Value` is `Send + Sync`. Mutable storage sits behind `parking_lot`
//! locks that are never held across evaluation.

mod array;
mod chan;
mod func;
mod host;
mod map;
mod pointer;
mod structs;

use std::fmt;
use std::sync::Arc;

pub use array::ArrayValue;
pub use chan::ChanValue;
pub use func::{FuncValue, HostFn, HostFunc, Invoker, ScriptFunc};
pub use host::HostObject;
pub use map::{MapKey, MapValue};
pub use pointer::{new_slot, PointerValue, Slot};
pub use structs::StructValue;

use crate::env::Env;
use crate::errors::EvalError;
use crate::heap::Heap;
use crate::types::TypeDesc;

/// A dynamic value.
#[derive(Clone)]
pub enum Value {
    /// "Not applicable" at the plumbing level. Never script-visible.
    Invalid,
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Heap<String>),
    Array(ArrayValue),
    Map(MapValue),
    Struct(StructValue),
    Host(Arc<dyn HostObject>),
    Pointer(PointerValue),
    Chan(ChanValue),
    Func(FuncValue),
    Module(Env),
    /// An error bound by `catch`.
    Error(Heap<EvalError>),
}

// Factory Methods

impl Value {
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    /// An untyped (`[]any`) array.
    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(ArrayValue::new(TypeDesc::Any, items))
    }

    #[inline]
    pub fn typed_array(elem: TypeDesc, items: Vec<Value>) -> Self {
        Value::Array(ArrayValue::new(elem, items))
    }

    #[inline]
    pub fn error(err: EvalError) -> Self {
        Value::Error(Heap::new(err))
    }

    #[inline]
    pub fn host(obj: impl HostObject + 'static) -> Self {
        Value::Host(Arc::new(obj))
    }
}

// Queries

impl Value {
    /// Nil, or a nil-able kind without storage.
    ///
    /// Numbers, strings and bools are never nil.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Array(a) => a.is_nil(),
            Value::Map(m) => m.is_nil(),
            Value::Pointer(p) => p.is_nil(),
            Value::Chan(c) => c.is_nil(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// The runtime type of this value. `nil` reports `any`.
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Value::Invalid | Value::Nil => TypeDesc::Any,
            Value::Bool(_) => TypeDesc::Bool,
            Value::Int(_) => TypeDesc::Int,
            Value::Float(_) => TypeDesc::Float,
            Value::Str(_) => TypeDesc::String,
            Value::Array(a) => TypeDesc::slice(a.elem().clone()),
            Value::Map(m) => TypeDesc::map(m.key_type().clone(), m.elem_type().clone()),
            Value::Struct(s) => TypeDesc::Struct(Arc::clone(s.ty())),
            Value::Host(h) => TypeDesc::Host(kite_ir::Name::new(h.type_name())),
            Value::Pointer(p) => TypeDesc::pointer(p.elem().clone()),
            Value::Chan(c) => TypeDesc::Chan(Arc::new(c.elem().clone()), c.direction()),
            Value::Func(f) => TypeDesc::Func(Arc::new(f.signature())),
            Value::Module(_) => TypeDesc::Module,
            Value::Error(_) => TypeDesc::Error,
        }
    }

    /// Type name for messages and `typeOf`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Invalid => "invalid".to_string(),
            Value::Nil => "nil".to_string(),
            Value::Func(_) => "func".to_string(),
            other => other.type_desc().to_string(),
        }
    }

    /// Unwrap one pointer level. Nil pointers and non-pointers pass through.
    pub fn deref_once(&self) -> Value {
        match self {
            Value::Pointer(p) => p.load().unwrap_or(Value::Nil),
            other => other.clone(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Formats the way `print` shows values: strings raw, collections
/// space-separated, map entries sorted by key text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "<invalid>"),
            Value::Nil => write!(f, "<nil>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{}", &***s),
            Value::Array(a) => {
                write!(f, "[")?;
                write_list(f, &a.to_vec())?;
                write!(f, "]")
            }
            Value::Map(m) => {
                let mut entries: Vec<(String, String)> = m
                    .entries()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                entries.sort();
                write!(f, "map[")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "]")
            }
            Value::Struct(s) => {
                write!(f, "{{")?;
                write_list(f, &s.fields())?;
                write!(f, "}}")
            }
            Value::Host(h) => write!(f, "<{}>", h.type_name()),
            Value::Pointer(p) => match p.load() {
                Some(v) => write!(f, "&{v}"),
                None => write!(f, "<nil>"),
            },
            Value::Chan(c) => write!(f, "chan {}", c.elem()),
            Value::Func(func) => write!(f, "func {}", func.name()),
            Value::Module(_) => write!(f, "<module>"),
            Value::Error(e) => write!(f, "{}", e.message),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", &***s),
            Value::Invalid
            | Value::Nil
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Array(_)
            | Value::Map(_)
            | Value::Struct(_) => write!(f, "{self}"),
            other => write!(f, "{}({other})", other.type_name()),
        }
    }
}

#[cfg(test)]
mod tests;
