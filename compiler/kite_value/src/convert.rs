//! Coercions between dynamic values.
//!
//! Two families:
//! - Best-effort (`to_int64`, `to_float64`, `to_bool`, `to_string`): never
//!   fail; unconvertible inputs yield the zero of the target.
//! - Checked (`try_to_*`, [`convert_to`]): fail with
//!   `TypeConversionFailure`. `convert_to` is what typed assignments,
//!   typed containers and argument binding use.

use crate::errors::{type_conversion_failure, EvalError};
use crate::types::TypeDesc;
use crate::value::{ArrayValue, MapValue, Value};

/// Parse a boolean the way Go's `strconv.ParseBool` does.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a number from text: integer first, then float.
pub fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::Int(n));
    }
    s.parse::<f64>().ok().map(Value::Float)
}

pub fn to_int64(value: &Value) -> i64 {
    try_to_int64(value).unwrap_or(0)
}

pub fn to_float64(value: &Value) -> f64 {
    try_to_float64(value).unwrap_or(0.0)
}

/// Truthiness. Numbers are true when nonzero, strings when they parse as
/// a true boolean; everything else is false.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Pointer(p) => p.load().is_some_and(|v| to_bool(&v)),
        other => try_to_bool(other).unwrap_or(false),
    }
}

pub fn to_string(value: &Value) -> String {
    value.to_string()
}

pub fn try_to_int64(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Float(f) => Ok(*f as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Str(s) => match parse_number(s) {
            Some(Value::Int(n)) => Ok(n),
            Some(Value::Float(f)) => Ok(f as i64),
            _ => Err(type_conversion_failure("string", "int64")),
        },
        Value::Pointer(p) => match p.load() {
            Some(v) => try_to_int64(&v),
            None => Err(type_conversion_failure("nil", "int64")),
        },
        other => Err(type_conversion_failure(&other.type_name(), "int64")),
    }
}

pub fn try_to_float64(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => match parse_number(s) {
            Some(Value::Int(n)) => Ok(n as f64),
            Some(Value::Float(f)) => Ok(f),
            _ => Err(type_conversion_failure("string", "float64")),
        },
        Value::Pointer(p) => match p.load() {
            Some(v) => try_to_float64(&v),
            None => Err(type_conversion_failure("nil", "float64")),
        },
        other => Err(type_conversion_failure(&other.type_name(), "float64")),
    }
}

pub fn try_to_bool(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(n) => Ok(*n != 0),
        Value::Float(f) => Ok(*f != 0.0),
        Value::Str(s) => parse_bool(s).ok_or_else(|| type_conversion_failure("string", "bool")),
        other => Err(type_conversion_failure(&other.type_name(), "bool")),
    }
}

/// Checked conversion of `value` to `target`.
///
/// - `any` accepts everything unchanged.
/// - `nil` converts to the zero value of any target.
/// - Numbers and bools convert among themselves; numbers and bools render
///   to strings; strings never convert to numbers.
/// - Arrays and maps convert element-wise. When the element types already
///   match (or the target element is `any`) the same storage is returned.
pub fn convert_to(value: &Value, target: &TypeDesc) -> Result<Value, EvalError> {
    if target.is_any() {
        return Ok(value.clone());
    }
    let fail = || type_conversion_failure(&value.type_name(), &target.to_string());
    match (value, target) {
        (Value::Nil, _) => Ok(target.zero_value()),
        (Value::Invalid, _) => Err(fail()),

        (Value::Bool(_) | Value::Int(_) | Value::Float(_), TypeDesc::Bool) => {
            try_to_bool(value).map(Value::Bool)
        }
        (Value::Str(s), TypeDesc::Bool) => parse_bool(s).map(Value::Bool).ok_or_else(fail),
        (Value::Bool(_) | Value::Int(_) | Value::Float(_), TypeDesc::Int) => {
            try_to_int64(value).map(Value::Int)
        }
        (Value::Bool(_) | Value::Int(_) | Value::Float(_), TypeDesc::Float) => {
            try_to_float64(value).map(Value::Float)
        }
        (Value::Str(_), TypeDesc::String) => Ok(value.clone()),
        (Value::Bool(_) | Value::Int(_) | Value::Float(_), TypeDesc::String) => {
            Ok(Value::string(value.to_string()))
        }

        (Value::Array(arr), TypeDesc::Slice(elem)) => convert_array(arr, elem).map_err(|_| fail()),
        (Value::Map(map), TypeDesc::Map(k, v)) => convert_map(map, k, v).map_err(|_| fail()),

        (Value::Pointer(_), TypeDesc::Pointer(_))
        | (Value::Chan(_), TypeDesc::Chan(..))
        | (Value::Func(_), TypeDesc::Func(_))
        | (Value::Error(_), TypeDesc::Error)
        | (Value::Module(_), TypeDesc::Module) => Ok(value.clone()),

        (Value::Struct(s), TypeDesc::Struct(ty)) if s.ty().name == ty.name => Ok(value.clone()),
        (Value::Host(h), TypeDesc::Host(name)) if h.type_name() == name.as_str() => {
            Ok(value.clone())
        }
        _ => Err(fail()),
    }
}

fn convert_array(arr: &ArrayValue, elem: &TypeDesc) -> Result<Value, EvalError> {
    if elem.is_any() || arr.elem() == elem {
        return Ok(Value::Array(arr.clone()));
    }
    if arr.is_nil() {
        return Ok(Value::Array(ArrayValue::nil(elem.clone())));
    }
    let items = arr
        .to_vec()
        .iter()
        .map(|item| convert_to(item, elem))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::typed_array(elem.clone(), items))
}

fn convert_map(map: &MapValue, key: &TypeDesc, elem: &TypeDesc) -> Result<Value, EvalError> {
    if (key.is_any() || map.key_type() == key) && (elem.is_any() || map.elem_type() == elem) {
        return Ok(Value::Map(map.clone()));
    }
    if map.is_nil() {
        return Ok(Value::Map(MapValue::nil(key.clone(), elem.clone())));
    }
    let out = MapValue::new(key.clone(), elem.clone());
    for (k, v) in map.entries() {
        out.insert(convert_to(&k, key)?, convert_to(&v, elem)?)?;
    }
    Ok(Value::Map(out))
}
