//! Kite Value - runtime values, coercion and scopes for the Kite evaluator.
//!
//! This crate provides:
//! - The dynamic [`Value`] model and its handle types (arrays, maps, structs,
//!   pointers, channels, functions)
//! - Runtime type descriptors ([`TypeDesc`]) with zero values
//! - Coercion ([`convert`]) and script equality ([`equal`])
//! - Evaluation errors and control-flow signals ([`EvalError`],
//!   [`ControlAction`])
//! - Scopes ([`Env`]) with slots, type tables and deferred-call stacks
//!
//! The evaluator itself lives in `kite_eval`; host packages depend only on
//! this crate to define functions, struct types and host objects.

pub mod convert;
mod env;
mod equality;
pub mod errors;
mod heap;
mod types;
mod value;

pub use env::{DeferredCall, Env, ScopeError};
pub use equality::equal;
pub use errors::{ControlAction, EvalError, EvalErrorKind, EvalResult, InterruptReason};
pub use heap::Heap;
pub use types::{FieldDef, FuncType, Method, StructType, StructTypeBuilder, TypeDesc};
pub use value::{
    new_slot, ArrayValue, ChanValue, FuncValue, HostFn, HostFunc, HostObject, Invoker, MapKey,
    MapValue, PointerValue, ScriptFunc, Slot, StructValue, Value,
};
