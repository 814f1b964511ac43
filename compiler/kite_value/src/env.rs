//! Scopes.
//!
//! A scope maps names to [`Slot`]s (shared cells), so taking `&x` yields a
//! pointer that aliases the binding itself. Scopes chain to their parent;
//! lookups walk upward. Each scope also carries a type table.
//!
//! Scopes created with [`Env::new_activation`] mark a function activation
//! and own that activation's deferred-call stack. Defer operations on any
//! inner block scope are routed to the nearest activation.
//!
//! # Locking
//!
//! Each scope sits behind a `parking_lot::RwLock`. Locks are taken for the
//! duration of a single map operation and released before walking to the
//! parent, so evaluation never runs with a scope locked.

use std::fmt;
use std::sync::Arc;

use kite_ir::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::errors::{invalid_operation, undefined_symbol, EvalError};
use crate::types::TypeDesc;
use crate::value::{new_slot, FuncValue, Slot, Value};

/// Scope lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("undefined symbol '{0}'")]
    Undefined(String),
    #[error("'{0}' is not a module")]
    NotModule(String),
}

impl From<ScopeError> for EvalError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Undefined(name) => undefined_symbol(&name),
            ScopeError::NotModule(_) => invalid_operation(err.to_string()),
        }
    }
}

/// A call scheduled by `defer`, with its arguments already evaluated.
#[derive(Clone, Debug)]
pub struct DeferredCall {
    pub func: FuncValue,
    pub args: Vec<Value>,
    /// The last argument is an array to spread.
    pub spread: bool,
}

struct Scope {
    values: FxHashMap<Name, Slot>,
    types: FxHashMap<Name, TypeDesc>,
    parent: Option<Env>,
    activation: bool,
    defers: Vec<DeferredCall>,
}

impl Scope {
    fn new(parent: Option<Env>, activation: bool) -> Self {
        Scope {
            values: FxHashMap::default(),
            types: FxHashMap::default(),
            parent,
            activation,
            defers: Vec::new(),
        }
    }
}

/// Handle to a scope. Cloning shares the scope.
#[derive(Clone)]
pub struct Env(Arc<RwLock<Scope>>);

impl Env {
    /// A root scope with the predeclared types.
    pub fn new() -> Self {
        let mut scope = Scope::new(None, true);
        for name in TypeDesc::BUILTIN_NAMES {
            if let Some(ty) = TypeDesc::builtin(name) {
                scope.types.insert(Name::new(name), ty);
            }
        }
        Env(Arc::new(RwLock::new(scope)))
    }

    /// A block scope under `self`.
    #[must_use]
    pub fn new_child(&self) -> Env {
        Env(Arc::new(RwLock::new(Scope::new(Some(self.clone()), false))))
    }

    /// A function activation scope under `self`.
    #[must_use]
    pub fn new_activation(&self) -> Env {
        Env(Arc::new(RwLock::new(Scope::new(Some(self.clone()), true))))
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.read().parent.clone()
    }

    pub fn is_root(&self) -> bool {
        self.0.read().parent.is_none()
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn root(&self) -> Env {
        let mut env = self.clone();
        while let Some(parent) = env.parent() {
            env = parent;
        }
        env
    }

    /// The slot bound to `name` in this scope only.
    pub fn local_slot(&self, name: &str) -> Option<Slot> {
        self.0.read().values.get(name).cloned()
    }

    /// Read `name` from this scope only (module member access).
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.local_slot(name).map(|slot| slot.read().clone())
    }

    /// Find the slot bound to `name`, walking parents. Dotted names resolve
    /// through module values.
    pub fn slot(&self, name: &str) -> Option<Slot> {
        let mut env = self.clone();
        loop {
            if let Some(slot) = env.local_slot(name) {
                return Some(slot);
            }
            match env.parent() {
                Some(parent) => env = parent,
                None => break,
            }
        }
        let (path, last) = name.rsplit_once('.')?;
        self.env_from_path(path).ok()?.local_slot(last)
    }

    pub fn get_value(&self, name: &str) -> Result<Value, ScopeError> {
        self.slot(name)
            .map(|slot| slot.read().clone())
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))
    }

    /// Overwrite an existing binding. Fails when `name` is not defined.
    pub fn set_value(&self, name: &str, value: Value) -> Result<(), ScopeError> {
        let slot = self
            .slot(name)
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))?;
        *slot.write() = value;
        Ok(())
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define_value(&self, name: impl Into<Name>, value: Value) {
        self.0.write().values.insert(name.into(), new_slot(value));
    }

    /// Bind `name` in the root scope.
    pub fn define_global_value(&self, name: impl Into<Name>, value: Value) {
        self.root().define_value(name, value);
    }

    /// Remove `name` from this scope only.
    pub fn delete(&self, name: &str) {
        self.0.write().values.remove(name);
    }

    /// Remove `name` from the root scope.
    pub fn delete_global(&self, name: &str) {
        self.root().delete(name);
    }

    pub fn resolve_type(&self, name: &str) -> Option<TypeDesc> {
        let mut env = self.clone();
        loop {
            if let Some(ty) = env.0.read().types.get(name).cloned() {
                return Some(ty);
            }
            match env.parent() {
                Some(parent) => env = parent,
                None => break,
            }
        }
        let (path, last) = name.rsplit_once('.')?;
        let module = self.env_from_path(path).ok()?;
        let ty = module.0.read().types.get(last).cloned();
        ty
    }

    pub fn define_type(&self, name: impl Into<Name>, ty: TypeDesc) {
        let name = name.into();
        tracing::trace!(%name, %ty, "define type");
        self.0.write().types.insert(name, ty);
    }

    /// Resolve a dotted path (`a.b.c`) to the scope of the named module.
    pub fn env_from_path(&self, path: &str) -> Result<Env, ScopeError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut env = module_env(first, self.get_value(first)?)?;
        for segment in segments {
            let value = env
                .local_slot(segment)
                .map(|slot| slot.read().clone())
                .ok_or_else(|| ScopeError::Undefined(segment.to_string()))?;
            env = module_env(segment, value)?;
        }
        Ok(env)
    }

    /// Names bound directly in this scope.
    pub fn local_names(&self) -> Vec<Name> {
        self.0.read().values.keys().cloned().collect()
    }

    fn activation(&self) -> Env {
        let mut env = self.clone();
        loop {
            let parent = {
                let scope = env.0.read();
                if scope.activation {
                    return env.clone();
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => env = parent,
                None => return env,
            }
        }
    }

    /// Schedule a deferred call on the nearest activation.
    pub fn push_defer(&self, call: DeferredCall) {
        self.activation().0.write().defers.push(call);
    }

    /// The most recently scheduled deferred call, if any.
    pub fn get_defer(&self) -> Option<DeferredCall> {
        self.activation().0.read().defers.last().cloned()
    }

    /// Drop the most recently scheduled deferred call.
    pub fn remove_defer(&self) {
        self.activation().0.write().defers.pop();
    }

    pub fn defer_len(&self) -> usize {
        self.activation().0.read().defers.len()
    }
}

fn module_env(name: &str, value: Value) -> Result<Env, ScopeError> {
    match value {
        Value::Module(env) => Ok(env),
        _ => Err(ScopeError::NotModule(name.to_string())),
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.read();
        f.debug_struct("Env")
            .field("bindings", &scope.values.len())
            .field("activation", &scope.activation)
            .field("root", &scope.parent.is_none())
            .finish()
    }
}
