use super::*;
use crate::types::TypeDesc;
use crate::value::{new_slot, MapValue, PointerValue};
use proptest::prelude::*;

#[test]
fn nil_rules() {
    assert!(equal(&Value::Nil, &Value::Nil));
    assert!(!equal(&Value::Nil, &Value::Int(0)));
    assert!(!equal(&Value::Int(0), &Value::Nil));
    let nil_array = TypeDesc::slice(TypeDesc::Int).zero_value();
    assert!(equal(&nil_array, &Value::Nil));
}

#[test]
fn invalid_rules() {
    assert!(equal(&Value::Invalid, &Value::Invalid));
    assert!(!equal(&Value::Invalid, &Value::Nil));
    assert!(!equal(&Value::Nil, &Value::Invalid));
}

#[test]
fn string_number_comparisons_parse() {
    assert!(equal(&Value::string("3"), &Value::Int(3)));
    assert!(equal(&Value::Int(3), &Value::string("3")));
    assert!(equal(&Value::string("1.5"), &Value::Float(1.5)));
    assert!(!equal(&Value::string("abc"), &Value::Int(3)));
}

#[test]
fn bool_comparisons_coerce() {
    assert!(equal(&Value::Bool(true), &Value::Int(1)));
    assert!(equal(&Value::string("false"), &Value::Bool(false)));
    assert!(!equal(&Value::Bool(true), &Value::string("maybe")));
}

#[test]
fn int_and_float_compare_numerically() {
    assert!(equal(&Value::Int(2), &Value::Float(2.0)));
    assert!(!equal(&Value::Int(2), &Value::Float(2.5)));
}

#[test]
fn nan_equals_itself() {
    let nan = Value::Float(f64::NAN);
    assert!(equal(&nan, &nan));
}

#[test]
fn arrays_compare_deeply() {
    let a = Value::array(vec![Value::Int(1), Value::string("x")]);
    let b = Value::array(vec![Value::Int(1), Value::string("x")]);
    let c = Value::array(vec![Value::Int(1)]);
    assert!(equal(&a, &b));
    assert!(!equal(&a, &c));
}

#[test]
fn maps_compare_deeply() {
    let a = MapValue::from_pairs(vec![(Value::string("k"), Value::Int(1))]);
    let b = MapValue::from_pairs(vec![(Value::string("k"), Value::Int(1))]);
    let c = MapValue::from_pairs(vec![(Value::string("k"), Value::Int(2))]);
    let (Ok(a), Ok(b), Ok(c)) = (a, b, c) else {
        panic!("string keys are hashable");
    };
    assert!(equal(&Value::Map(a.clone()), &Value::Map(b)));
    assert!(!equal(&Value::Map(a), &Value::Map(c)));
}

#[test]
fn pointers_unwrap_one_level() {
    let p = Value::Pointer(PointerValue::from_slot(TypeDesc::Int, new_slot(Value::Int(4))));
    assert!(equal(&p, &Value::Int(4)));
    assert!(equal(&Value::Int(4), &p));
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        "[a-z0-9.]{0,8}".prop_map(Value::string),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::array)
    })
}

proptest! {
    #[test]
    fn every_value_equals_itself(v in value()) {
        prop_assert!(equal(&v, &v));
    }

    #[test]
    fn equality_is_symmetric_for_scalars(a in scalar(), b in scalar()) {
        prop_assert_eq!(equal(&a, &b), equal(&b, &a));
    }

    #[test]
    fn int_float_agree(n in -(1i64 << 52)..(1i64 << 52)) {
        prop_assert!(equal(&Value::Int(n), &Value::Float(n as f64)));
    }
}
