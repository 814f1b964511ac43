//! Runtime type descriptors.
//!
//! A `TypeDesc` is what a source `TypeExpr` resolves to once names are looked
//! up in scope. Descriptors drive zero values, `make`, typed containers and
//! the checked conversions in [`crate::convert`].
//!
//! Sized numeric names (`int8`..`uint64`, `byte`, `rune`, `float32`) collapse
//! onto the two numeric representations the evaluator has.

use std::fmt;
use std::sync::Arc;

use kite_ir::{ChanDirection, Name};
use rustc_hash::FxHashMap;

use crate::value::{ArrayValue, ChanValue, FuncValue, HostFunc, MapValue, PointerValue, Value};

/// Runtime type.
#[derive(Clone, Debug)]
pub enum TypeDesc {
    /// `any` / `interface{}`: accepts every value unchanged.
    Any,
    Bool,
    Int,
    Float,
    String,
    Slice(Arc<TypeDesc>),
    Map(Arc<TypeDesc>, Arc<TypeDesc>),
    Pointer(Arc<TypeDesc>),
    Chan(Arc<TypeDesc>, ChanDirection),
    Func(Arc<FuncType>),
    Struct(Arc<StructType>),
    /// An opaque host type, identified by name.
    Host(Name),
    /// The type of values bound by `catch`.
    Error,
    /// A `module` namespace.
    Module,
}

/// Signature of a function type.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FuncType {
    pub params: Vec<TypeDesc>,
    pub results: Vec<TypeDesc>,
    pub variadic: bool,
}

impl TypeDesc {
    pub fn slice(elem: TypeDesc) -> Self {
        TypeDesc::Slice(Arc::new(elem))
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Map(Arc::new(key), Arc::new(value))
    }

    pub fn pointer(elem: TypeDesc) -> Self {
        TypeDesc::Pointer(Arc::new(elem))
    }

    pub fn chan(elem: TypeDesc) -> Self {
        TypeDesc::Chan(Arc::new(elem), ChanDirection::Both)
    }

    /// Resolve one of the predeclared type names.
    pub fn builtin(name: &str) -> Option<Self> {
        Some(match name {
            "any" | "interface" | "interface{}" => TypeDesc::Any,
            "bool" => TypeDesc::Bool,
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "uintptr" | "byte" | "rune" => TypeDesc::Int,
            "float32" | "float64" => TypeDesc::Float,
            "string" => TypeDesc::String,
            "error" => TypeDesc::Error,
            _ => return None,
        })
    }

    /// Every predeclared name, for seeding a root scope.
    pub const BUILTIN_NAMES: &'static [&'static str] = &[
        "any", "interface", "bool", "int", "int8", "int16", "int32", "int64", "uint", "uint8",
        "uint16", "uint32", "uint64", "uintptr", "byte", "rune", "float32", "float64", "string",
        "error",
    ];

    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, TypeDesc::Any)
    }

    /// Element type of a slice, pointer or channel.
    pub fn elem(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Slice(e) | TypeDesc::Pointer(e) | TypeDesc::Chan(e, _) => Some(e),
            TypeDesc::Map(_, v) => Some(v),
            _ => None,
        }
    }

    /// Whether values of this type can hold `nil`.
    pub fn is_nillable(&self) -> bool {
        matches!(
            self,
            TypeDesc::Any
                | TypeDesc::Slice(_)
                | TypeDesc::Map(..)
                | TypeDesc::Pointer(_)
                | TypeDesc::Chan(..)
                | TypeDesc::Func(_)
                | TypeDesc::Host(_)
                | TypeDesc::Error
        )
    }

    /// The zero value of this type.
    ///
    /// Collections, pointers and channels are nil-but-typed; structs get
    /// zeroed fields.
    pub fn zero_value(&self) -> Value {
        match self {
            TypeDesc::Any
            | TypeDesc::Func(_)
            | TypeDesc::Host(_)
            | TypeDesc::Error
            | TypeDesc::Module => Value::Nil,
            TypeDesc::Bool => Value::Bool(false),
            TypeDesc::Int => Value::Int(0),
            TypeDesc::Float => Value::Float(0.0),
            TypeDesc::String => Value::string(""),
            TypeDesc::Slice(elem) => Value::Array(ArrayValue::nil((**elem).clone())),
            TypeDesc::Map(k, v) => Value::Map(MapValue::nil((**k).clone(), (**v).clone())),
            TypeDesc::Pointer(elem) => Value::Pointer(PointerValue::nil((**elem).clone())),
            TypeDesc::Chan(elem, dir) => Value::Chan(ChanValue::nil((**elem).clone(), *dir)),
            TypeDesc::Struct(ty) => Value::Struct(ty.instantiate()),
        }
    }

    /// A usable instance of this type, as built by `make(T)`.
    ///
    /// Unlike [`TypeDesc::zero_value`], collections are allocated, pointers
    /// point at a fresh zero pointee and function types yield a stub that
    /// returns zero results.
    pub fn make_value(&self) -> Value {
        match self {
            TypeDesc::Slice(elem) => Value::Array(ArrayValue::new((**elem).clone(), Vec::new())),
            TypeDesc::Map(k, v) => Value::Map(MapValue::new((**k).clone(), (**v).clone())),
            TypeDesc::Pointer(elem) => {
                Value::Pointer(PointerValue::to_new((**elem).clone(), elem.make_value()))
            }
            TypeDesc::Chan(elem, dir) => {
                Value::Chan(ChanValue::new((**elem).clone(), 0).with_direction(*dir))
            }
            TypeDesc::Func(sig) => {
                let results = sig.results.clone();
                Value::Func(FuncValue::Host(Arc::new(HostFunc::new(
                    "func",
                    sig.params.clone(),
                    sig.variadic,
                    move |_, _| Ok(results.iter().map(TypeDesc::zero_value).collect()),
                ))))
            }
            other => other.zero_value(),
        }
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeDesc::Any, TypeDesc::Any)
            | (TypeDesc::Bool, TypeDesc::Bool)
            | (TypeDesc::Int, TypeDesc::Int)
            | (TypeDesc::Float, TypeDesc::Float)
            | (TypeDesc::String, TypeDesc::String)
            | (TypeDesc::Error, TypeDesc::Error)
            | (TypeDesc::Module, TypeDesc::Module) => true,
            (TypeDesc::Slice(a), TypeDesc::Slice(b))
            | (TypeDesc::Pointer(a), TypeDesc::Pointer(b)) => a == b,
            (TypeDesc::Map(ka, va), TypeDesc::Map(kb, vb)) => ka == kb && va == vb,
            (TypeDesc::Chan(a, da), TypeDesc::Chan(b, db)) => a == b && da == db,
            (TypeDesc::Func(a), TypeDesc::Func(b)) => a == b,
            (TypeDesc::Struct(a), TypeDesc::Struct(b)) => Arc::ptr_eq(a, b) || a.name == b.name,
            (TypeDesc::Host(a), TypeDesc::Host(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Any => write!(f, "any"),
            TypeDesc::Bool => write!(f, "bool"),
            TypeDesc::Int => write!(f, "int64"),
            TypeDesc::Float => write!(f, "float64"),
            TypeDesc::String => write!(f, "string"),
            TypeDesc::Slice(e) => write!(f, "[]{e}"),
            TypeDesc::Map(k, v) => write!(f, "map[{k}]{v}"),
            TypeDesc::Pointer(e) => write!(f, "*{e}"),
            TypeDesc::Chan(e, ChanDirection::Both) => write!(f, "chan {e}"),
            TypeDesc::Chan(e, ChanDirection::Send) => write!(f, "chan<- {e}"),
            TypeDesc::Chan(e, ChanDirection::Recv) => write!(f, "<-chan {e}"),
            TypeDesc::Func(sig) => {
                write!(f, "func(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                if let [single] = sig.results.as_slice() {
                    write!(f, " {single}")?;
                } else if !sig.results.is_empty() {
                    write!(f, " (")?;
                    for (i, r) in sig.results.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{r}")?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            TypeDesc::Struct(ty) => write!(f, "{}", ty.name),
            TypeDesc::Host(name) => write!(f, "{name}"),
            TypeDesc::Error => write!(f, "error"),
            TypeDesc::Module => write!(f, "module"),
        }
    }
}

/// A declared struct field.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: Name,
    pub ty: TypeDesc,
}

/// A method attached to a struct type.
///
/// The function receives the receiver as its first argument.
#[derive(Clone, Debug)]
pub struct Method {
    pub func: FuncValue,
    /// Declared on `*T`: calls on a plain `T` value bind an addressable copy.
    pub pointer_receiver: bool,
}

/// A registered struct type with its field layout and method table.
#[derive(Debug)]
pub struct StructType {
    pub name: Name,
    pub fields: Vec<FieldDef>,
    methods: FxHashMap<Name, Method>,
}

impl StructType {
    /// Start building a struct type.
    pub fn builder(name: &str) -> StructTypeBuilder {
        StructTypeBuilder {
            name: Name::new(name),
            fields: Vec::new(),
            methods: FxHashMap::default(),
        }
    }

    /// Index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name.as_str() == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// A fresh instance with every field at its zero value.
    pub fn instantiate(self: &Arc<Self>) -> crate::value::StructValue {
        crate::value::StructValue::new(
            Arc::clone(self),
            self.fields.iter().map(|f| f.ty.zero_value()).collect(),
        )
    }
}

/// Builder for [`StructType`].
pub struct StructTypeBuilder {
    name: Name,
    fields: Vec<FieldDef>,
    methods: FxHashMap<Name, Method>,
}

impl StructTypeBuilder {
    #[must_use]
    pub fn field(mut self, name: &str, ty: TypeDesc) -> Self {
        self.fields.push(FieldDef {
            name: Name::new(name),
            ty,
        });
        self
    }

    /// Add a value-receiver method.
    #[must_use]
    pub fn method(mut self, name: &str, func: FuncValue) -> Self {
        self.methods.insert(
            Name::new(name),
            Method {
                func,
                pointer_receiver: false,
            },
        );
        self
    }

    /// Add a pointer-receiver method.
    #[must_use]
    pub fn pointer_method(mut self, name: &str, func: FuncValue) -> Self {
        self.methods.insert(
            Name::new(name),
            Method {
                func,
                pointer_receiver: true,
            },
        );
        self
    }

    pub fn build(self) -> Arc<StructType> {
        Arc::new(StructType {
            name: self.name,
            fields: self.fields,
            methods: self.methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sized_numeric_names_collapse() {
        assert_eq!(TypeDesc::builtin("uint8"), Some(TypeDesc::Int));
        assert_eq!(TypeDesc::builtin("rune"), Some(TypeDesc::Int));
        assert_eq!(TypeDesc::builtin("float32"), Some(TypeDesc::Float));
        assert_eq!(TypeDesc::builtin("Point"), None);
    }

    #[test]
    fn every_builtin_name_resolves() {
        for name in TypeDesc::BUILTIN_NAMES {
            assert!(TypeDesc::builtin(name).is_some(), "{name}");
        }
    }

    #[test]
    fn display_composite_types() {
        let ty = TypeDesc::map(TypeDesc::String, TypeDesc::slice(TypeDesc::Int));
        assert_eq!(ty.to_string(), "map[string][]int64");
        assert_eq!(TypeDesc::pointer(TypeDesc::Any).to_string(), "*any");
        assert_eq!(TypeDesc::chan(TypeDesc::Bool).to_string(), "chan bool");
    }

    #[test]
    fn zero_values_are_typed_nils() {
        assert!(TypeDesc::slice(TypeDesc::Int).zero_value().is_nil());
        assert!(TypeDesc::map(TypeDesc::String, TypeDesc::Int)
            .zero_value()
            .is_nil());
        assert!(TypeDesc::Any.zero_value().is_nil());
        assert!(!TypeDesc::Int.zero_value().is_nil());
    }

    #[test]
    fn make_value_allocates() {
        assert!(!TypeDesc::slice(TypeDesc::Int).make_value().is_nil());
        assert!(!TypeDesc::map(TypeDesc::String, TypeDesc::Int)
            .make_value()
            .is_nil());
        match TypeDesc::pointer(TypeDesc::Int).make_value() {
            Value::Pointer(p) => assert!(matches!(p.load(), Some(Value::Int(0)))),
            other => panic!("expected pointer, got {other:?}"),
        }
    }

    #[test]
    fn struct_zero_value_zeroes_fields() {
        let ty = StructType::builder("Point")
            .field("X", TypeDesc::Int)
            .field("Label", TypeDesc::String)
            .build();
        let value = ty.instantiate();
        assert!(matches!(value.get(0), Some(Value::Int(0))));
        assert_eq!(value.get(1).map(|v| v.to_string()), Some(String::new()));
        assert_eq!(ty.field_index("Label"), Some(1));
        assert_eq!(ty.field_index("missing"), None);
    }

    #[test]
    fn struct_types_compare_by_name() {
        let a = StructType::builder("P").build();
        let b = StructType::builder("P").build();
        assert_eq!(TypeDesc::Struct(a), TypeDesc::Struct(b));
    }
}
