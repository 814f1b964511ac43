//! Reads through member, index and slice expressions.
//!
//! One pointer level is unwrapped on the base before any of these.

use kite_ir::Name;
use kite_value::convert::{convert_to, try_to_int64};
use kite_value::errors::{
    index_out_of_range, invalid_operation, nil_dereference, no_member, unexported_member,
};
use kite_value::{
    equal, ArrayValue, EvalError, FuncValue, MapValue, PointerValue, StructValue, TypeDesc, Value,
};

use super::Interpreter;

/// Unwrap one pointer level. Nil pointers are an error.
pub(crate) fn auto_deref(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Pointer(p) => p.load().ok_or_else(nil_dereference),
        other => Ok(other),
    }
}

/// An index operand as a position in a sequence of `len` items.
fn checked_index(index: &Value, len: usize) -> Result<usize, EvalError> {
    let i = try_to_int64(index)
        .map_err(|_| invalid_operation(format!("index must be an integer, not {}", index.type_name())))?;
    usize::try_from(i)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| index_out_of_range(i, len))
}

/// Slice bounds: `0 <= begin <= end <= len`.
pub(crate) fn slice_bounds(
    begin: Option<&Value>,
    end: Option<&Value>,
    len: usize,
) -> Result<(usize, usize), EvalError> {
    let bound = |v: Option<&Value>, default: usize| -> Result<usize, EvalError> {
        let Some(v) = v else { return Ok(default) };
        let i = try_to_int64(v)
            .map_err(|_| invalid_operation(format!("slice index must be an integer, not {}", v.type_name())))?;
        usize::try_from(i)
            .ok()
            .filter(|&i| i <= len)
            .ok_or_else(|| index_out_of_range(i, len))
    };
    let (b, e) = (bound(begin, 0)?, bound(end, len)?);
    if b > e {
        return Err(invalid_operation(format!("invalid slice indices {b} > {e}")));
    }
    Ok((b, e))
}

/// Convert a key for lookup in `map` unless the map takes any key.
pub(crate) fn map_key(map: &MapValue, key: &Value) -> Result<Value, EvalError> {
    convert_to(key, map.key_type())
}

impl Interpreter {
    /// `map[key]` under the map lock. Missing keys read as the element's
    /// zero value.
    pub(crate) fn map_lookup(&self, map: &MapValue, key: &Value) -> Result<(Value, bool), EvalError> {
        let key = map_key(map, key)?;
        let found = {
            let _guard = self.ctx.map_guard();
            map.get(&key)?
        };
        Ok(match found {
            Some(value) => (value, true),
            None => (map.elem_type().zero_value(), false),
        })
    }

    pub(crate) fn member_get(&self, base: Value, name: &Name) -> Result<Value, EvalError> {
        if let Value::Module(env) = &base {
            return env
                .get_local(name)
                .ok_or_else(|| no_member("module", name));
        }
        let through_pointer = matches!(base, Value::Pointer(_));
        let pointer = base.clone();
        match auto_deref(base)? {
            Value::Struct(s) => self.struct_member(s, through_pointer.then_some(pointer), name),
            Value::Map(map) => self
                .map_lookup(&map, &Value::string(name.as_str()))
                .map(|(value, _)| value),
            Value::Host(obj) => {
                if obj.has_method(name) {
                    Ok(Value::Func(FuncValue::HostMethod {
                        obj,
                        name: name.clone(),
                    }))
                } else if let Some(value) = obj.field(name) {
                    Ok(value)
                } else {
                    Err(no_member(obj.type_name(), name))
                }
            }
            Value::Module(env) => env
                .get_local(name)
                .ok_or_else(|| no_member("module", name)),
            Value::Nil => Err(nil_dereference()),
            other => Err(no_member(&other.type_name(), name)),
        }
    }

    /// Methods first, then fields.
    ///
    /// Pointer-receiver methods receive the pointer the struct was reached
    /// through, or a pointer to a copy when reached by value. Value
    /// receivers always get a copy.
    fn struct_member(
        &self,
        s: StructValue,
        pointer: Option<Value>,
        name: &Name,
    ) -> Result<Value, EvalError> {
        if let Some(method) = s.ty().method(name) {
            let recv = if method.pointer_receiver {
                pointer.unwrap_or_else(|| {
                    let ty = TypeDesc::Struct(s.ty().clone());
                    Value::Pointer(PointerValue::to_new(ty, Value::Struct(s.copy())))
                })
            } else {
                Value::Struct(s.copy())
            };
            return Ok(Value::Func(FuncValue::Bound {
                recv: Box::new(recv),
                method: Box::new(method.func.clone()),
            }));
        }
        if s.ty().field_index(name).is_none() {
            return Err(no_member(&s.ty().name, name));
        }
        if !name.is_exported() {
            return Err(unexported_member(name));
        }
        s.field(name).ok_or_else(|| no_member(&s.ty().name, name))
    }

    pub(crate) fn index_get(&self, base: Value, index: &Value) -> Result<Value, EvalError> {
        match auto_deref(base)? {
            Value::Array(arr) => {
                let i = checked_index(index, arr.len())?;
                arr.get(i).ok_or_else(|| index_out_of_range(i as i64, arr.len()))
            }
            Value::Map(map) => self.map_lookup(&map, index).map(|(value, _)| value),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = checked_index(index, chars.len())?;
                Ok(Value::string(chars[i].to_string()))
            }
            Value::Module(env) => {
                let name = index.to_string();
                env.get_local(&name).ok_or_else(|| no_member("module", &name))
            }
            other => Err(invalid_operation(format!("cannot index {}", other.type_name()))),
        }
    }

    /// `x[a:b]` on arrays (a copy) and strings (by char).
    pub(crate) fn slice_get(
        &self,
        base: Value,
        begin: Option<&Value>,
        end: Option<&Value>,
    ) -> Result<Value, EvalError> {
        match auto_deref(base)? {
            Value::Array(arr) => {
                let items = arr.to_vec();
                let (b, e) = slice_bounds(begin, end, items.len())?;
                Ok(Value::Array(ArrayValue::new(arr.elem().clone(), items[b..e].to_vec())))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (b, e) = slice_bounds(begin, end, chars.len())?;
                Ok(Value::string(chars[b..e].iter().collect::<String>()))
            }
            other => Err(invalid_operation(format!("cannot slice {}", other.type_name()))),
        }
    }

    pub(crate) fn len_of(&self, value: Value) -> Result<Value, EvalError> {
        let n = match auto_deref(value)? {
            Value::Array(arr) => arr.len(),
            Value::Map(map) => {
                let _guard = self.ctx.map_guard();
                map.len()
            }
            Value::Str(s) => s.chars().count(),
            Value::Chan(ch) => ch.len(),
            Value::Nil => 0,
            other => {
                return Err(invalid_operation(format!("len of {}", other.type_name())));
            }
        };
        Ok(Value::Int(n as i64))
    }

    /// `item in list`: whether any element equals `item`.
    pub(crate) fn includes(&self, item: &Value, list: Value) -> Result<Value, EvalError> {
        match auto_deref(list)? {
            Value::Array(arr) => Ok(Value::Bool(arr.to_vec().iter().any(|v| equal(item, v)))),
            Value::Nil => Ok(Value::Bool(false)),
            other => Err(invalid_operation(format!("'in' needs an array, not {}", other.type_name()))),
        }
    }
}
