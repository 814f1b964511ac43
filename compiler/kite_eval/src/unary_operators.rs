//! Unary operator implementations.

use kite_ir::UnaryOp;
use kite_value::convert::{parse_number, to_bool};
use kite_value::errors::unsupported_operand;
use kite_value::{EvalError, Value};

/// Evaluate a unary operation on an evaluated operand.
///
/// `!` works on any value through truthiness. `-` and `^` need a number;
/// bools and numeric strings are accepted.
pub fn evaluate_unary(value: Value, op: UnaryOp) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!to_bool(&value))),
        UnaryOp::Neg => match number(&value, op)? {
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            other => Err(unsupported_operand(op.as_symbol(), &other.type_name())),
        },
        UnaryOp::BitNot => match number(&value, op)? {
            Value::Int(n) => Ok(Value::Int(!n)),
            other => Err(unsupported_operand(op.as_symbol(), &other.type_name())),
        },
    }
}

fn number(value: &Value, op: UnaryOp) -> Result<Value, EvalError> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Str(s) => {
            parse_number(s).ok_or_else(|| unsupported_operand(op.as_symbol(), "string"))
        }
        Value::Pointer(_) => number(&value.deref_once(), op),
        other => Err(unsupported_operand(op.as_symbol(), &other.type_name())),
    }
}
