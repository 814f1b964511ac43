//! Struct instances.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Value;
use crate::heap::Heap;
use crate::types::StructType;

/// An instance of a registered struct type.
///
/// Clones share field storage; [`StructValue::copy`] makes an independent
/// shallow copy.
#[derive(Clone)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Heap<RwLock<Vec<Value>>>,
}

impl StructValue {
    pub fn new(ty: Arc<StructType>, fields: Vec<Value>) -> Self {
        StructValue {
            ty,
            fields: Heap::new(RwLock::new(fields)),
        }
    }

    #[inline]
    pub fn ty(&self) -> &Arc<StructType> {
        &self.ty
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.fields.read().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.fields.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Field value by name.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.ty.field_index(name).and_then(|i| self.get(i))
    }

    pub fn fields(&self) -> Vec<Value> {
        self.fields.read().clone()
    }

    #[must_use]
    pub fn copy(&self) -> StructValue {
        StructValue::new(Arc::clone(&self.ty), self.fields())
    }

    pub fn same_storage(&self, other: &StructValue) -> bool {
        Heap::ptr_eq(&self.fields, &other.fields)
    }

    pub fn addr(&self) -> usize {
        Heap::addr(&self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StructType, TypeDesc};

    #[test]
    fn copy_detaches_storage() {
        let ty = StructType::builder("P").field("X", TypeDesc::Int).build();
        let a = ty.instantiate();
        let b = a.copy();
        assert!(a.set(0, Value::Int(3)));
        assert!(matches!(b.field("X"), Some(Value::Int(0))));
        assert!(!a.same_storage(&b));
        assert!(a.same_storage(&a.clone()));
    }
}
