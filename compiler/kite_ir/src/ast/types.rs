//! Type expressions as written in source (`[]int`, `map[string]any`, ...).
//!
//! These are syntax only. The evaluator resolves them against the active
//! scope's type table into runtime type descriptors.

use std::fmt;

use crate::Name;

/// Direction of a channel type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ChanDirection {
    #[default]
    Both,
    /// `chan<- T`
    Send,
    /// `<-chan T`
    Recv,
}

/// A type as written in source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// `int`, `string`, `any`, `pkg.Type`
    Named(Name),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `map[K]V`
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `chan T`
    Chan(Box<TypeExpr>, ChanDirection),
    /// `func(A, B) R`
    Func {
        params: Vec<TypeExpr>,
        results: Vec<TypeExpr>,
        variadic: bool,
    },
}

impl TypeExpr {
    /// Shorthand for a named type.
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(Name::new(name))
    }

    /// Number of `[]` prefixes on this type.
    pub fn slice_depth(&self) -> usize {
        match self {
            TypeExpr::Slice(inner) => 1 + inner.slice_depth(),
            _ => 0,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{name}"),
            TypeExpr::Slice(inner) => write!(f, "[]{inner}"),
            TypeExpr::Map(k, v) => write!(f, "map[{k}]{v}"),
            TypeExpr::Pointer(inner) => write!(f, "*{inner}"),
            TypeExpr::Chan(inner, ChanDirection::Both) => write!(f, "chan {inner}"),
            TypeExpr::Chan(inner, ChanDirection::Send) => write!(f, "chan<- {inner}"),
            TypeExpr::Chan(inner, ChanDirection::Recv) => write!(f, "<-chan {inner}"),
            TypeExpr::Func {
                params,
                results,
                variadic,
            } => {
                write!(f, "func(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if *variadic && i + 1 == params.len() {
                        write!(f, "...")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                match results.as_slice() {
                    [] => Ok(()),
                    [single] => write!(f, " {single}"),
                    many => {
                        write!(f, " (")?;
                        for (i, r) in many.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{r}")?;
                        }
                        write!(f, ")")
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested_types() {
        let ty = TypeExpr::Map(
            Box::new(TypeExpr::named("string")),
            Box::new(TypeExpr::Slice(Box::new(TypeExpr::named("int")))),
        );
        assert_eq!(ty.to_string(), "map[string][]int");
    }

    #[test]
    fn display_variadic_func() {
        let ty = TypeExpr::Func {
            params: vec![TypeExpr::named("int"), TypeExpr::named("int")],
            results: vec![TypeExpr::named("int")],
            variadic: true,
        };
        assert_eq!(ty.to_string(), "func(int, ...int) int");
    }

    #[test]
    fn slice_depth_counts_prefixes() {
        let ty = TypeExpr::Slice(Box::new(TypeExpr::Slice(Box::new(TypeExpr::named("int")))));
        assert_eq!(ty.slice_depth(), 2);
        assert_eq!(TypeExpr::named("int").slice_depth(), 0);
    }
}
