//! Host packages and core builtins.
//!
//! A [`Package`] is a named set of host values and types. Scripts bring one
//! into scope with `import("name")`, which yields a fresh module namespace
//! populated from the package. The registry is shared by every run that
//! uses the same interpreter.
//!
//! Core builtins (`print`, `toInt`, `typeOf`, `import`, ...) are defined
//! straight into a root scope by [`define_core`].

use std::sync::Arc;

use kite_ir::Name;
use kite_value::convert::{to_bool, to_float64, to_int64};
use kite_value::errors::{argument_type_mismatch, host_error, invalid_operation};
use kite_value::{ArrayValue, Env, EvalError, FuncValue, HostFunc, Invoker, TypeDesc, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::operators::MAX_ALLOC_LEN;
use crate::print_handler::SharedPrintHandler;

/// A named set of host definitions importable by scripts.
pub struct Package {
    name: Name,
    values: Vec<(Name, Value)>,
    types: Vec<(Name, TypeDesc)>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Package {
            name: Name::new(name),
            values: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Add a function under its own name.
    #[must_use]
    pub fn function(mut self, func: FuncValue) -> Self {
        self.values.push((Name::new(func.name()), Value::Func(func)));
        self
    }

    #[must_use]
    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.values.push((Name::new(name), value));
        self
    }

    #[must_use]
    pub fn type_def(mut self, name: &str, ty: TypeDesc) -> Self {
        self.types.push((Name::new(name), ty));
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// A fresh namespace holding this package's definitions.
    fn instantiate(&self) -> Env {
        let env = Env::new();
        for (name, value) in &self.values {
            env.define_value(name.clone(), value.clone());
        }
        for (name, ty) in &self.types {
            env.define_type(name.clone(), ty.clone());
        }
        env
    }
}

#[derive(Default)]
pub struct PackageRegistry {
    packages: RwLock<FxHashMap<Name, Arc<Package>>>,
}

impl PackageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the bundled packages.
    pub fn with_stdlib() -> Self {
        let registry = Self::new();
        registry.register(strings_package());
        registry
    }

    /// Add or replace a package.
    pub fn register(&self, package: Package) {
        tracing::debug!(package = %package.name, "register package");
        self.packages
            .write()
            .insert(package.name.clone(), Arc::new(package));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.read().contains_key(name)
    }

    /// Instantiate package `name` as a module value.
    pub fn import(&self, name: &str) -> Result<Value, EvalError> {
        let package = self.packages.read().get(name).cloned();
        match package {
            Some(package) => Ok(Value::Module(package.instantiate())),
            None => Err(host_error(format!("package '{name}' not found"))),
        }
    }
}

fn host_fn<F>(
    name: &str,
    params: Vec<TypeDesc>,
    results: Vec<TypeDesc>,
    variadic: bool,
    body: F,
) -> FuncValue
where
    F: Fn(&dyn Invoker, Vec<Value>) -> Result<Vec<Value>, EvalError> + Send + Sync + 'static,
{
    FuncValue::Host(Arc::new(
        HostFunc::new(name, params, variadic, body).with_results(results),
    ))
}

/// The trailing variadic argument as a list.
fn rest(args: &[Value]) -> Vec<Value> {
    match args.last() {
        Some(Value::Array(items)) => items.to_vec(),
        _ => Vec::new(),
    }
}

fn str_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(ToString::to_string).unwrap_or_default()
}

/// Go `fmt.Print` spacing: a space between operands when neither is a
/// string.
fn format_print(items: &[Value]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 && !matches!(item, Value::Str(_)) && !matches!(items[i - 1], Value::Str(_)) {
            out.push(' ');
        }
        out.push_str(&item.to_string());
    }
    out
}

fn format_println(items: &[Value]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Define the core builtins in `env`.
pub fn define_core(env: &Env, print: &SharedPrintHandler, packages: &Arc<PackageRegistry>) {
    let any_rest = || vec![TypeDesc::slice(TypeDesc::Any)];

    let out = Arc::clone(print);
    env.define_value(
        "print",
        Value::Func(host_fn("print", any_rest(), Vec::new(), true, move |_, args| {
            out.print(&format_print(&rest(&args)));
            Ok(Vec::new())
        })),
    );
    let out = Arc::clone(print);
    env.define_value(
        "println",
        Value::Func(host_fn("println", any_rest(), Vec::new(), true, move |_, args| {
            out.println(&format_println(&rest(&args)));
            Ok(Vec::new())
        })),
    );

    let unary = |name: &str, result: TypeDesc, f: fn(&Value) -> Value| {
        host_fn(name, vec![TypeDesc::Any], vec![result], false, move |_, args| {
            Ok(vec![f(args.first().unwrap_or(&Value::Nil))])
        })
    };
    env.define_value(
        "toString",
        Value::Func(unary("toString", TypeDesc::String, |v| Value::string(v.to_string()))),
    );
    env.define_value(
        "toInt",
        Value::Func(unary("toInt", TypeDesc::Int, |v| Value::Int(to_int64(v)))),
    );
    env.define_value(
        "toFloat",
        Value::Func(unary("toFloat", TypeDesc::Float, |v| Value::Float(to_float64(v)))),
    );
    env.define_value(
        "toBool",
        Value::Func(unary("toBool", TypeDesc::Bool, |v| Value::Bool(to_bool(v)))),
    );
    env.define_value(
        "typeOf",
        Value::Func(unary("typeOf", TypeDesc::String, |v| Value::string(v.type_name()))),
    );

    env.define_value(
        "keys",
        Value::Func(host_fn(
            "keys",
            vec![TypeDesc::Any],
            vec![TypeDesc::slice(TypeDesc::Any)],
            false,
            |_, args| match args.first().map(Value::deref_once) {
                Some(Value::Map(map)) => {
                    let mut keys = map.keys();
                    keys.sort_by_cached_key(ToString::to_string);
                    Ok(vec![Value::array(keys)])
                }
                Some(Value::Nil) | None => Ok(vec![Value::array(Vec::new())]),
                Some(other) => Err(argument_type_mismatch("map", &other.type_name())),
            },
        )),
    );

    env.define_value(
        "range",
        Value::Func(host_fn(
            "range",
            vec![TypeDesc::slice(TypeDesc::Int)],
            vec![TypeDesc::slice(TypeDesc::Int)],
            true,
            |_, args| {
                let bounds: Vec<i64> = rest(&args).iter().map(to_int64).collect();
                let (start, end, step) = match bounds[..] {
                    [end] => (0, end, 1),
                    [start, end] => (start, end, 1),
                    [start, end, step] => (start, end, step),
                    _ => return Err(invalid_operation("range wants 1 to 3 arguments")),
                };
                if step == 0 {
                    return Err(invalid_operation("range step cannot be zero"));
                }
                let mut items = Vec::new();
                let mut i = start;
                while (step > 0 && i < end) || (step < 0 && i > end) {
                    if items.len() >= MAX_ALLOC_LEN {
                        return Err(invalid_operation("range too large"));
                    }
                    items.push(Value::Int(i));
                    i = match i.checked_add(step) {
                        Some(next) => next,
                        None => break,
                    };
                }
                Ok(vec![Value::Array(ArrayValue::new(TypeDesc::Int, items))])
            },
        )),
    );

    let registry = Arc::clone(packages);
    env.define_value(
        "import",
        Value::Func(host_fn(
            "import",
            vec![TypeDesc::String],
            vec![TypeDesc::Module],
            false,
            move |_, args| Ok(vec![registry.import(&str_arg(&args, 0))?]),
        )),
    );
}

/// The bundled `strings` package.
pub fn strings_package() -> Package {
    let s = || TypeDesc::String;
    let strings = || TypeDesc::slice(TypeDesc::String);
    Package::new("strings")
        .function(host_fn("ToUpper", vec![s()], vec![s()], false, |_, args| {
            Ok(vec![Value::string(str_arg(&args, 0).to_uppercase())])
        }))
        .function(host_fn("ToLower", vec![s()], vec![s()], false, |_, args| {
            Ok(vec![Value::string(str_arg(&args, 0).to_lowercase())])
        }))
        .function(host_fn("Join", vec![strings(), s()], vec![s()], false, |_, args| {
            let parts: Vec<String> = match args.first() {
                Some(Value::Array(items)) => items.to_vec().iter().map(ToString::to_string).collect(),
                _ => Vec::new(),
            };
            Ok(vec![Value::string(parts.join(&str_arg(&args, 1)))])
        }))
        .function(host_fn("Split", vec![s(), s()], vec![strings()], false, |_, args| {
            let (text, sep) = (str_arg(&args, 0), str_arg(&args, 1));
            let parts: Vec<Value> = if sep.is_empty() {
                text.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                text.split(sep.as_str()).map(Value::string).collect()
            };
            Ok(vec![Value::typed_array(TypeDesc::String, parts)])
        }))
        .function(host_fn(
            "Contains",
            vec![s(), s()],
            vec![TypeDesc::Bool],
            false,
            |_, args| Ok(vec![Value::Bool(str_arg(&args, 0).contains(&str_arg(&args, 1)))]),
        ))
        .function(host_fn(
            "Repeat",
            vec![s(), TypeDesc::Int],
            vec![s()],
            false,
            |_, args| {
                let count = args.get(1).map_or(0, to_int64);
                let Ok(count) = usize::try_from(count) else {
                    return Err(invalid_operation("negative repeat count"));
                };
                Ok(vec![Value::string(str_arg(&args, 0).repeat(count))])
            },
        ))
}
