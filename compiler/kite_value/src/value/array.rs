//! Array (slice) values.

use parking_lot::RwLock;

use super::Value;
use crate::heap::Heap;
use crate::types::TypeDesc;

/// An ordered, mutable sequence with an element type.
///
/// Clones share storage. `items == None` is the nil array of its type.
#[derive(Clone)]
pub struct ArrayValue {
    elem: TypeDesc,
    items: Option<Heap<RwLock<Vec<Value>>>>,
}

impl ArrayValue {
    pub fn new(elem: TypeDesc, items: Vec<Value>) -> Self {
        ArrayValue {
            elem,
            items: Some(Heap::new(RwLock::new(items))),
        }
    }

    pub fn nil(elem: TypeDesc) -> Self {
        ArrayValue { elem, items: None }
    }

    #[inline]
    pub fn elem(&self) -> &TypeDesc {
        &self.elem
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.items.is_none()
    }

    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, |items| items.read().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items
            .as_ref()
            .and_then(|items| items.read().get(index).cloned())
    }

    /// Overwrite an existing element. Returns `false` when out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let Some(items) = &self.items else {
            return false;
        };
        match items.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append in place. Returns `false` for a nil array, which has no storage.
    pub fn push(&self, value: Value) -> bool {
        match &self.items {
            Some(items) => {
                items.write().push(value);
                true
            }
            None => false,
        }
    }

    /// Replace `begin..end` element-wise. The replacement must have the same length.
    pub fn replace_range(&self, begin: usize, end: usize, values: Vec<Value>) -> bool {
        let Some(items) = &self.items else {
            return begin == end && values.is_empty();
        };
        let mut items = items.write();
        if end > items.len() || begin > end || end - begin != values.len() {
            return false;
        }
        for (slot, value) in items[begin..end].iter_mut().zip(values) {
            *slot = value;
        }
        true
    }

    /// Copy of the current elements. No lock is held afterwards.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items
            .as_ref()
            .map_or_else(Vec::new, |items| items.read().clone())
    }

    /// Whether both arrays share storage.
    pub fn same_storage(&self, other: &ArrayValue) -> bool {
        match (&self.items, &other.items) {
            (Some(a), Some(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Identity address (0 for nil).
    pub fn addr(&self) -> usize {
        self.items.as_ref().map_or(0, Heap::addr)
    }
}
