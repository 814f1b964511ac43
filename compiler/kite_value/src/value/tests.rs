use super::*;
use crate::errors::EvalErrorKind;
use crate::types::StructType;
use pretty_assertions::assert_eq;

struct Counter {
    count: parking_lot::Mutex<i64>,
}

impl HostObject for Counter {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn has_field(&self, name: &str) -> bool {
        name == "Count"
    }

    fn field(&self, name: &str) -> Option<Value> {
        (name == "Count").then(|| Value::Int(*self.count.lock()))
    }
}

#[test]
fn display_matches_print_format() {
    assert_eq!(Value::Nil.to_string(), "<nil>");
    assert_eq!(Value::Float(2.0).to_string(), "2");
    assert_eq!(
        Value::array(vec![Value::Int(1), Value::string("a")]).to_string(),
        "[1 a]"
    );
    let map = MapValue::from_pairs(vec![
        (Value::string("b"), Value::Int(2)),
        (Value::string("a"), Value::Int(1)),
    ]);
    let Ok(map) = map else {
        panic!("string keys are hashable")
    };
    assert_eq!(Value::Map(map).to_string(), "map[a:1 b:2]");
}

#[test]
fn nil_kinds() {
    assert!(Value::Nil.is_nil());
    assert!(!Value::Int(0).is_nil());
    assert!(!Value::string("").is_nil());
    assert!(TypeDesc::chan(TypeDesc::Int).zero_value().is_nil());
    assert!(!Value::array(vec![]).is_nil());
}

#[test]
fn type_names() {
    assert_eq!(Value::Nil.type_name(), "nil");
    assert_eq!(Value::Int(1).type_name(), "int64");
    assert_eq!(Value::array(vec![]).type_name(), "[]any");
    assert_eq!(
        Value::typed_array(TypeDesc::String, vec![]).type_name(),
        "[]string"
    );
    let point = StructType::builder("Point").build();
    assert_eq!(Value::Struct(point.instantiate()).type_name(), "Point");
}

#[test]
fn host_objects_expose_fields() {
    let v = Value::host(Counter {
        count: parking_lot::Mutex::new(3),
    });
    let Value::Host(obj) = &v else {
        panic!("expected host value")
    };
    assert!(obj.has_field("Count"));
    assert!(matches!(obj.field("Count"), Some(Value::Int(3))));
    assert!(!obj.has_method("Inc"));
    let err = obj.set_field("Count", Value::Int(1)).err();
    assert_eq!(err.map(|e| e.kind), Some(EvalErrorKind::InvalidOperation));
    assert_eq!(v.to_string(), "<Counter>");
    assert_eq!(v.type_name(), "Counter");
}

#[test]
fn error_values_display_their_message() {
    let v = Value::error(crate::errors::thrown("boom").tag(kite_ir::Position::new(1, 1)));
    assert_eq!(v.to_string(), "boom");
}

#[test]
fn deref_once_reads_pointee() {
    let p = Value::Pointer(PointerValue::to_new(TypeDesc::Int, Value::Int(8)));
    assert!(matches!(p.deref_once(), Value::Int(8)));
    let nil = Value::Pointer(PointerValue::nil(TypeDesc::Int));
    assert!(matches!(nil.deref_once(), Value::Nil));
}
