//! Tests for binary operator implementations.

#![allow(clippy::unwrap_used)]

use crate::operators::evaluate_binary;
use kite_ir::BinaryOp;
use kite_value::{EvalErrorKind, TypeDesc, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn int(value: Value) -> i64 {
    match value {
        Value::Int(n) => n,
        other => panic!("expected int, got {other:?}"),
    }
}

fn float(value: Value) -> f64 {
    match value {
        Value::Float(f) => f,
        other => panic!("expected float, got {other:?}"),
    }
}

fn boolean(value: Value) -> bool {
    match value {
        Value::Bool(b) => b,
        other => panic!("expected bool, got {other:?}"),
    }
}

fn eval(left: Value, right: Value, op: BinaryOp) -> Value {
    evaluate_binary(left, right, op).unwrap()
}

#[test]
fn test_int_operations() {
    assert_eq!(int(eval(Value::Int(2), Value::Int(3), BinaryOp::Add)), 5);
    assert_eq!(int(eval(Value::Int(5), Value::Int(3), BinaryOp::Sub)), 2);
    assert_eq!(int(eval(Value::Int(2), Value::Int(3), BinaryOp::Mul)), 6);
    assert_eq!(int(eval(Value::Int(7), Value::Int(2), BinaryOp::Div)), 3);
    assert_eq!(int(eval(Value::Int(7), Value::Int(2), BinaryOp::Mod)), 1);
    assert_eq!(int(eval(Value::Int(2), Value::Int(10), BinaryOp::Pow)), 1024);
}

#[test]
fn test_int_overflow_wraps() {
    assert_eq!(int(eval(Value::Int(i64::MAX), Value::Int(1), BinaryOp::Add)), i64::MIN);
    assert_eq!(int(eval(Value::Int(i64::MIN), Value::Int(-1), BinaryOp::Div)), i64::MIN);
}

#[test]
fn test_mixed_operands_widen_to_float() {
    assert_eq!(float(eval(Value::Int(1), Value::Float(0.5), BinaryOp::Add)), 1.5);
    assert_eq!(float(eval(Value::Float(3.0), Value::Int(2), BinaryOp::Div)), 1.5);
}

#[test]
fn test_negative_int_power_is_float() {
    assert_eq!(float(eval(Value::Int(2), Value::Int(-1), BinaryOp::Pow)), 0.5);
}

#[test]
fn test_bool_and_nil_are_numbers() {
    assert_eq!(int(eval(Value::Bool(true), Value::Int(1), BinaryOp::Add)), 2);
    assert_eq!(int(eval(Value::Nil, Value::Int(4), BinaryOp::Sub)), -4);
}

#[test]
fn test_division_by_zero() {
    let err = evaluate_binary(Value::Int(1), Value::Int(0), BinaryOp::Div).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InvalidOperation);
    assert!(evaluate_binary(Value::Int(1), Value::Int(0), BinaryOp::Mod).is_err());
    assert!(float(eval(Value::Float(1.0), Value::Int(0), BinaryOp::Div)).is_infinite());
}

#[test]
fn test_comparisons() {
    assert!(boolean(eval(Value::Int(2), Value::Int(3), BinaryOp::Lt)));
    assert!(boolean(eval(Value::Int(3), Value::Int(2), BinaryOp::Gt)));
    assert!(boolean(eval(Value::Int(2), Value::Float(2.0), BinaryOp::LtEq)));
    assert!(boolean(eval(Value::Int(2), Value::Int(2), BinaryOp::Eq)));
    assert!(boolean(eval(Value::Int(2), Value::Float(2.0), BinaryOp::Eq)));
    assert!(boolean(eval(Value::string("b"), Value::string("a"), BinaryOp::Gt)));
    assert!(!boolean(eval(Value::Float(f64::NAN), Value::Int(1), BinaryOp::Lt)));
    assert!(!boolean(eval(Value::Float(f64::NAN), Value::Int(1), BinaryOp::GtEq)));
}

#[test]
fn test_string_concatenation() {
    let joined = eval(Value::string("hello"), Value::string(" world"), BinaryOp::Add);
    assert_eq!(joined.to_string(), "hello world");
    assert_eq!(eval(Value::string("x"), Value::Int(1), BinaryOp::Add).to_string(), "x1");
    assert_eq!(eval(Value::Int(1), Value::string("x"), BinaryOp::Add).to_string(), "1x");
}

#[test]
fn test_numeric_strings_parse() {
    assert_eq!(int(eval(Value::string("6"), Value::Int(2), BinaryOp::Div)), 3);
    let err = evaluate_binary(Value::string("six"), Value::Int(2), BinaryOp::Div).unwrap_err();
    assert!(err.message.contains("string"), "{}", err.message);
}

#[test]
fn test_string_repetition() {
    assert_eq!(eval(Value::string("ab"), Value::Int(3), BinaryOp::Mul).to_string(), "ababab");
    assert_eq!(eval(Value::string("ab"), Value::Int(-1), BinaryOp::Mul).to_string(), "");
}

#[test]
fn test_string_repetition_too_large_is_error() {
    let err = evaluate_binary(Value::string("ab"), Value::Int(i64::MAX), BinaryOp::Mul).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InvalidOperation);
    assert!(err.message.contains("too large"), "{}", err.message);

    let err = evaluate_binary(Value::string("x"), Value::Int(1 << 40), BinaryOp::Mul).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InvalidOperation);
}

#[test]
fn test_array_append_converts_to_elem_type() {
    let arr = Value::typed_array(TypeDesc::Int, vec![Value::Int(1)]);
    let grown = eval(arr.clone(), Value::Float(2.9), BinaryOp::Add);
    assert_eq!(grown.to_string(), "[1 2]");
    // The left operand is untouched.
    assert_eq!(arr.to_string(), "[1]");

    let joined = eval(arr, Value::array(vec![Value::Int(5), Value::Int(6)]), BinaryOp::Add);
    assert_eq!(joined.to_string(), "[1 5 6]");
}

#[test]
fn test_bit_operations() {
    assert_eq!(int(eval(Value::Int(0b1100), Value::Int(0b1010), BinaryOp::BitAnd)), 0b1000);
    assert_eq!(int(eval(Value::Int(0b1100), Value::Int(0b1010), BinaryOp::BitOr)), 0b1110);
    assert_eq!(int(eval(Value::Int(0b1100), Value::Int(0b1010), BinaryOp::BitXor)), 0b0110);
    assert_eq!(int(eval(Value::Float(7.9), Value::Int(2), BinaryOp::Mod)), 1);
}

#[test]
fn test_shifts() {
    assert_eq!(int(eval(Value::Int(1), Value::Int(4), BinaryOp::Shl)), 16);
    assert_eq!(int(eval(Value::Int(-16), Value::Int(2), BinaryOp::Shr)), -4);
    assert_eq!(int(eval(Value::Int(1), Value::Int(64), BinaryOp::Shl)), 0);
    assert_eq!(int(eval(Value::Int(-1), Value::Int(100), BinaryOp::Shr)), -1);
    assert!(evaluate_binary(Value::Int(1), Value::Int(-1), BinaryOp::Shl).is_err());
}

#[test]
fn test_logical_operators_use_truthiness() {
    assert!(boolean(eval(Value::Int(1), Value::string("true"), BinaryOp::And)));
    assert!(!boolean(eval(Value::Nil, Value::Int(0), BinaryOp::Or)));
}

#[test]
fn test_unsupported_operand() {
    let err = evaluate_binary(Value::array(Vec::new()), Value::Int(1), BinaryOp::Sub).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InvalidOperation);
}

proptest! {
    #[test]
    fn int_add_matches_wrapping_add(a in any::<i64>(), b in any::<i64>()) {
        prop_assert_eq!(int(eval(Value::Int(a), Value::Int(b), BinaryOp::Add)), a.wrapping_add(b));
    }

    #[test]
    fn any_float_operand_gives_a_float(a in -1_000_000i64..1_000_000, b in -1e6f64..1e6) {
        prop_assert!(matches!(eval(Value::Int(a), Value::Float(b), BinaryOp::Add), Value::Float(_)));
        prop_assert!(matches!(eval(Value::Float(b), Value::Int(a), BinaryOp::Mul), Value::Float(_)));
    }

    #[test]
    fn lt_and_gteq_disagree(a in -1000i64..1000, b in -1000i64..1000) {
        let lt = boolean(eval(Value::Int(a), Value::Int(b), BinaryOp::Lt));
        let ge = boolean(eval(Value::Int(a), Value::Int(b), BinaryOp::GtEq));
        prop_assert_ne!(lt, ge);
    }
}
