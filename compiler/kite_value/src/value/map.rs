//! Map values and hashable keys.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::Value;
use crate::errors::{unhashable_key, EvalError};
use crate::heap::Heap;
use crate::types::TypeDesc;

/// Hash key derived from a value.
///
/// Scalars hash by value. Pointers, channels, structs and host objects hash
/// by identity. Arrays, maps and functions are not hashable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Nil,
    Bool(bool),
    Int(i64),
    /// Bit pattern with `-0.0` folded onto `0.0`.
    Float(u64),
    Str(String),
    Ref(usize),
}

impl MapKey {
    pub fn of(value: &Value) -> Result<MapKey, EvalError> {
        Ok(match value {
            Value::Nil | Value::Invalid => MapKey::Nil,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Int(n) => MapKey::Int(*n),
            Value::Float(f) => {
                let f = if *f == 0.0 { 0.0 } else { *f };
                MapKey::Float(f.to_bits())
            }
            Value::Str(s) => MapKey::Str(s.to_string()),
            Value::Pointer(p) => MapKey::Ref(p.addr()),
            Value::Chan(c) => MapKey::Ref(c.addr()),
            Value::Struct(s) => MapKey::Ref(s.addr()),
            Value::Host(h) => MapKey::Ref(std::sync::Arc::as_ptr(h).cast::<()>() as usize),
            other => return Err(unhashable_key(&other.type_name())),
        })
    }
}

type Entries = FxHashMap<MapKey, (Value, Value)>;

/// A mutable key/value map with declared key and element types.
///
/// Clones share storage. `entries == None` is the nil map of its type.
#[derive(Clone)]
pub struct MapValue {
    key: TypeDesc,
    elem: TypeDesc,
    entries: Option<Heap<RwLock<Entries>>>,
}

impl MapValue {
    pub fn new(key: TypeDesc, elem: TypeDesc) -> Self {
        MapValue {
            key,
            elem,
            entries: Some(Heap::new(RwLock::new(FxHashMap::default()))),
        }
    }

    pub fn nil(key: TypeDesc, elem: TypeDesc) -> Self {
        MapValue {
            key,
            elem,
            entries: None,
        }
    }

    /// A `map[any]any` holding `pairs`.
    pub fn from_pairs(pairs: Vec<(Value, Value)>) -> Result<Self, EvalError> {
        let map = MapValue::new(TypeDesc::Any, TypeDesc::Any);
        for (k, v) in pairs {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    #[inline]
    pub fn key_type(&self) -> &TypeDesc {
        &self.key
    }

    #[inline]
    pub fn elem_type(&self) -> &TypeDesc {
        &self.elem
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.read().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `key`. `Ok(None)` means absent.
    pub fn get(&self, key: &Value) -> Result<Option<Value>, EvalError> {
        let key = MapKey::of(key)?;
        Ok(self
            .entries
            .as_ref()
            .and_then(|e| e.read().get(&key).map(|(_, v)| v.clone())))
    }

    /// Insert or overwrite. Returns `Ok(false)` for a nil map.
    pub fn insert(&self, key: Value, value: Value) -> Result<bool, EvalError> {
        let hashed = MapKey::of(&key)?;
        let Some(entries) = &self.entries else {
            return Ok(false);
        };
        entries.write().insert(hashed, (key, value));
        Ok(true)
    }

    /// Remove `key` if present.
    pub fn remove(&self, key: &Value) -> Result<(), EvalError> {
        let key = MapKey::of(key)?;
        if let Some(entries) = &self.entries {
            entries.write().remove(&key);
        }
        Ok(())
    }

    /// Snapshot of the keys.
    pub fn keys(&self) -> Vec<Value> {
        self.entries.as_ref().map_or_else(Vec::new, |e| {
            e.read().values().map(|(k, _)| k.clone()).collect()
        })
    }

    /// Snapshot of the entries.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries
            .as_ref()
            .map_or_else(Vec::new, |e| e.read().values().cloned().collect())
    }

    /// Whether both maps share storage.
    pub fn same_storage(&self, other: &MapValue) -> bool {
        match (&self.entries, &other.entries) {
            (Some(a), Some(b)) => Heap::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn addr(&self) -> usize {
        self.entries.as_ref().map_or(0, Heap::addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EvalErrorKind;

    #[test]
    fn insert_get_remove() {
        let m = MapValue::new(TypeDesc::String, TypeDesc::Int);
        assert!(m.insert(Value::string("a"), Value::Int(1)).unwrap_or(false));
        assert!(matches!(m.get(&Value::string("a")), Ok(Some(Value::Int(1)))));
        assert!(matches!(m.get(&Value::string("b")), Ok(None)));
        assert!(m.remove(&Value::string("a")).is_ok());
        assert!(m.is_empty());
    }

    #[test]
    fn nil_map_rejects_insert() {
        let m = MapValue::nil(TypeDesc::Any, TypeDesc::Any);
        assert!(matches!(m.insert(Value::Int(1), Value::Nil), Ok(false)));
        assert!(matches!(m.get(&Value::Int(1)), Ok(None)));
    }

    #[test]
    fn arrays_are_not_hashable() {
        let m = MapValue::new(TypeDesc::Any, TypeDesc::Any);
        let key = Value::array(vec![]);
        let err = m.insert(key, Value::Nil).err();
        assert!(matches!(
            err.map(|e| e.kind),
            Some(EvalErrorKind::InvalidOperation)
        ));
    }

    #[test]
    fn negative_zero_folds() {
        assert_eq!(
            MapKey::of(&Value::Float(-0.0)).ok(),
            MapKey::of(&Value::Float(0.0)).ok()
        );
    }

    #[test]
    fn int_and_float_keys_are_distinct() {
        assert_ne!(
            MapKey::of(&Value::Int(1)).ok(),
            MapKey::of(&Value::Float(1.0)).ok()
        );
    }
}
