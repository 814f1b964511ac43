//! Script-level equality (`==`, `switch`, `in`).
//!
//! Loose at the edges and structural in the middle:
//! 1. `Invalid` equals only `Invalid`; nil equals only nil.
//! 2. One pointer level is unwrapped on each side.
//! 3. Number vs string parses the string; either side bool coerces both.
//! 4. Otherwise deep comparison. Int and float compare numerically and a
//!    float is always equal to itself, NaN included.

use crate::convert::{parse_number, try_to_bool};
use crate::value::Value;

pub fn equal(a: &Value, b: &Value) -> bool {
    match (a.is_invalid(), b.is_invalid()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }
    match (a.is_nil(), b.is_nil()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    let a = a.deref_once();
    let b = b.deref_once();

    match (&a, &b) {
        (Value::Int(_) | Value::Float(_), Value::Str(s))
        | (Value::Str(s), Value::Int(_) | Value::Float(_)) => {
            let num = if a.is_number() { &a } else { &b };
            return match parse_number(s) {
                Some(parsed) => numbers_equal(num, &parsed),
                None => false,
            };
        }
        (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            return match (try_to_bool(&a), try_to_bool(&b)) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            };
        }
        _ => {}
    }

    deep_equal(&a, &b)
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => floats_equal(*x, *y),
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
            floats_equal(*x as f64, *y)
        }
        _ => false,
    }
}

#[inline]
fn floats_equal(x: f64, y: f64) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

/// Structural comparison. Locks are released (snapshots taken) before
/// recursing into elements.
fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => numbers_equal(a, b),
        (Value::Str(x), Value::Str(y)) => x.as_str() == y.as_str(),
        (Value::Array(x), Value::Array(y)) => {
            if x.same_storage(y) {
                return true;
            }
            let (xs, ys) = (x.to_vec(), y.to_vec());
            xs.len() == ys.len() && xs.iter().zip(&ys).all(|(p, q)| equal(p, q))
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.same_storage(y) {
                return true;
            }
            if x.len() != y.len() {
                return false;
            }
            x.entries().iter().all(|(k, v)| match y.get(k) {
                Ok(Some(other)) => equal(v, &other),
                _ => false,
            })
        }
        (Value::Struct(x), Value::Struct(y)) => {
            if x.same_storage(y) {
                return true;
            }
            if x.ty().name != y.ty().name {
                return false;
            }
            let (xs, ys) = (x.fields(), y.fields());
            xs.len() == ys.len() && xs.iter().zip(&ys).all(|(p, q)| equal(p, q))
        }
        (Value::Pointer(x), Value::Pointer(y)) => x.addr() == y.addr(),
        (Value::Chan(x), Value::Chan(y)) => x.addr() == y.addr(),
        (Value::Func(x), Value::Func(y)) => x.addr() == y.addr(),
        (Value::Host(x), Value::Host(y)) => std::sync::Arc::ptr_eq(x, y),
        (Value::Module(x), Value::Module(y)) => x.ptr_eq(y),
        (Value::Error(x), Value::Error(y)) => x.kind == y.kind && x.message == y.message,
        _ => false,
    }
}

#[cfg(test)]
mod tests;
