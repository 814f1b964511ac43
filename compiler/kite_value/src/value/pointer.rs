//! Pointer values.
//!
//! A pointer shares a storage cell with whatever it was taken from. Scope
//! bindings are cells too, so `&x` aliases the variable itself.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Value;
use crate::types::TypeDesc;

/// A shared, mutable storage cell.
pub type Slot = Arc<RwLock<Value>>;

/// Create a fresh cell holding `value`.
pub fn new_slot(value: Value) -> Slot {
    Arc::new(RwLock::new(value))
}

#[derive(Clone)]
pub struct PointerValue {
    elem: TypeDesc,
    cell: Option<Slot>,
}

impl PointerValue {
    pub fn nil(elem: TypeDesc) -> Self {
        PointerValue { elem, cell: None }
    }

    /// Point at an existing cell.
    pub fn from_slot(elem: TypeDesc, cell: Slot) -> Self {
        PointerValue {
            elem,
            cell: Some(cell),
        }
    }

    /// Point at a fresh cell initialized to `value`.
    pub fn to_new(elem: TypeDesc, value: Value) -> Self {
        Self::from_slot(elem, new_slot(value))
    }

    #[inline]
    pub fn elem(&self) -> &TypeDesc {
        &self.elem
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.cell.is_none()
    }

    /// Read the pointee. `None` for a nil pointer.
    pub fn load(&self) -> Option<Value> {
        self.cell.as_ref().map(|c| c.read().clone())
    }

    /// Write the pointee. Returns `false` for a nil pointer.
    pub fn store(&self, value: Value) -> bool {
        match &self.cell {
            Some(c) => {
                *c.write() = value;
                true
            }
            None => false,
        }
    }

    pub fn addr(&self) -> usize {
        self.cell
            .as_ref()
            .map_or(0, |c| Arc::as_ptr(c).cast::<()>() as usize)
    }
}
