//! Binary operator implementations.
//!
//! Direct enum dispatch on the operator. `&&` and `||` short-circuit in the
//! interpreter; they land here only when both sides are already evaluated
//! (compound assignment).
//!
//! # Numeric rules
//!
//! Operands are widened to a common kind: float if either side is a float,
//! otherwise `i64`. Bools count as 0/1 and nil as 0; numeric strings parse.
//! Integer arithmetic wraps. Integer division or remainder by zero is an
//! error; float division by zero follows IEEE 754.

use kite_ir::BinaryOp;
use kite_value::convert::{convert_to, parse_number, to_bool};
use kite_value::errors::{division_by_zero, invalid_operation, nil_dereference, unsupported_operand};
use kite_value::{equal, ArrayValue, EvalError, Value};

/// A numeric operand after widening.
#[derive(Copy, Clone, Debug)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Num::Int(n) => n,
            Num::Float(f) => f as i64,
        }
    }
}

fn numeric(value: &Value, op: BinaryOp) -> Result<Num, EvalError> {
    match value {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(f) => Ok(Num::Float(*f)),
        Value::Bool(b) => Ok(Num::Int(i64::from(*b))),
        Value::Nil => Ok(Num::Int(0)),
        Value::Str(s) => match parse_number(s) {
            Some(Value::Int(n)) => Ok(Num::Int(n)),
            Some(Value::Float(f)) => Ok(Num::Float(f)),
            _ => Err(unsupported_operand(op.as_symbol(), "string")),
        },
        Value::Pointer(p) => match p.load() {
            Some(inner) => numeric(&inner, op),
            None => Err(nil_dereference()),
        },
        other => Err(unsupported_operand(op.as_symbol(), &other.type_name())),
    }
}

/// Evaluate a binary operation on two evaluated operands.
pub fn evaluate_binary(left: Value, right: Value, op: BinaryOp) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!equal(&left, &right))),
        BinaryOp::And => Ok(Value::Bool(to_bool(&left) && to_bool(&right))),
        BinaryOp::Or => Ok(Value::Bool(to_bool(&left) || to_bool(&right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => compare(&left, &right, op),
        BinaryOp::Add => add(left, right),
        BinaryOp::Mul => match (&left, &right) {
            (Value::Str(s), Value::Int(n)) => repeat(s, *n).map(Value::string),
            _ => arithmetic(&left, &right, op),
        },
        BinaryOp::Sub | BinaryOp::Div | BinaryOp::Pow => arithmetic(&left, &right, op),
        BinaryOp::Mod
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr => integral(&left, &right, op),
    }
}

/// Upper bound on the element or byte count of a single script allocation.
pub(crate) const MAX_ALLOC_LEN: usize = 1 << 28;

/// Negative counts give the empty string.
fn repeat(s: &str, count: i64) -> Result<String, EvalError> {
    let Ok(n) = usize::try_from(count) else {
        return Ok(String::new());
    };
    match s.len().checked_mul(n) {
        Some(total) if total <= MAX_ALLOC_LEN => Ok(s.repeat(n)),
        _ => Err(invalid_operation("string repeat count too large")),
    }
}

fn add(left: Value, right: Value) -> Result<Value, EvalError> {
    match (&left, &right) {
        (Value::Array(arr), _) => append(arr, &right),
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::string(format!("{left}{right}")))
        }
        _ => arithmetic(&left, &right, BinaryOp::Add),
    }
}

/// `array + x`: a new array with `x` appended, or with the elements of `x`
/// appended when it is an array. Elements convert to the left element type.
fn append(arr: &ArrayValue, right: &Value) -> Result<Value, EvalError> {
    let elem = arr.elem().clone();
    let mut items = arr.to_vec();
    match right {
        Value::Array(other) => {
            for item in other.to_vec() {
                items.push(convert_to(&item, &elem)?);
            }
        }
        other => items.push(convert_to(other, &elem)?),
    }
    Ok(Value::Array(ArrayValue::new(elem, items)))
}

fn arithmetic(left: &Value, right: &Value, op: BinaryOp) -> Result<Value, EvalError> {
    let (a, b) = (numeric(left, op)?, numeric(right, op)?);
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_arithmetic(x, y, op),
        _ => Ok(Value::Float(float_arithmetic(a.as_f64(), b.as_f64(), op))),
    }
}

fn int_arithmetic(x: i64, y: i64, op: BinaryOp) -> Result<Value, EvalError> {
    let n = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div => {
            if y == 0 {
                return Err(division_by_zero());
            }
            x.wrapping_div(y)
        }
        BinaryOp::Pow => match u32::try_from(y) {
            Ok(exp) => x.wrapping_pow(exp),
            Err(_) => return Ok(Value::Float((x as f64).powf(y as f64))),
        },
        _ => return Err(invalid_operation(format!("'{}' is not arithmetic", op.as_symbol()))),
    };
    Ok(Value::Int(n))
}

fn float_arithmetic(x: f64, y: f64, op: BinaryOp) -> f64 {
    match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Pow => x.powf(y),
        _ => f64::NAN,
    }
}

fn integral(left: &Value, right: &Value, op: BinaryOp) -> Result<Value, EvalError> {
    let x = numeric(left, op)?.as_i64();
    let y = numeric(right, op)?.as_i64();
    let n = match op {
        BinaryOp::Mod => {
            if y == 0 {
                return Err(division_by_zero());
            }
            x.wrapping_rem(y)
        }
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::Shl | BinaryOp::Shr => shift(x, y, op)?,
        _ => return Err(invalid_operation(format!("'{}' is not integral", op.as_symbol()))),
    };
    Ok(Value::Int(n))
}

fn shift(x: i64, y: i64, op: BinaryOp) -> Result<i64, EvalError> {
    let Ok(amount) = u32::try_from(y) else {
        return Err(invalid_operation(format!("negative shift amount {y}")));
    };
    Ok(match op {
        BinaryOp::Shl => x.checked_shl(amount).unwrap_or(0),
        _ => x.checked_shr(amount).unwrap_or(if x < 0 { -1 } else { 0 }),
    })
}

/// Ordering. Two strings compare lexically; anything else compares
/// numerically.
fn compare(left: &Value, right: &Value, op: BinaryOp) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => a.as_str().partial_cmp(b.as_str()),
        _ => match (numeric(left, op)?, numeric(right, op)?) {
            (Num::Int(a), Num::Int(b)) => a.partial_cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        },
    };
    // NaN orders with nothing.
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}
