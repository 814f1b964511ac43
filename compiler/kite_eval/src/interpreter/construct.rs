//! Type resolution and value construction (`new`, `make`, literals).

use std::sync::Arc;

use kite_ir::{Expr, Name, TypeExpr};
use kite_value::convert::{convert_to, try_to_int64};
use kite_value::errors::{invalid_operation, undefined_type};
use kite_value::{
    ArrayValue, ChanValue, Env, EvalError, EvalResult, FuncType, MapValue, PointerValue,
    TypeDesc, Value,
};

use super::Interpreter;
use crate::operators::MAX_ALLOC_LEN;

impl Interpreter {
    /// Resolve a written type against the scope's type tables.
    pub(crate) fn resolve_type(&self, ty: &TypeExpr, env: &Env) -> Result<TypeDesc, EvalError> {
        Ok(match ty {
            TypeExpr::Named(name) => env
                .resolve_type(name)
                .ok_or_else(|| undefined_type(name))?,
            TypeExpr::Slice(elem) => TypeDesc::slice(self.resolve_type(elem, env)?),
            TypeExpr::Map(k, v) => {
                TypeDesc::map(self.resolve_type(k, env)?, self.resolve_type(v, env)?)
            }
            TypeExpr::Pointer(elem) => TypeDesc::pointer(self.resolve_type(elem, env)?),
            TypeExpr::Chan(elem, dir) => TypeDesc::Chan(Arc::new(self.resolve_type(elem, env)?), *dir),
            TypeExpr::Func {
                params,
                results,
                variadic,
            } => TypeDesc::Func(Arc::new(FuncType {
                params: params
                    .iter()
                    .map(|p| self.resolve_type(p, env))
                    .collect::<Result<_, _>>()?,
                results: results
                    .iter()
                    .map(|r| self.resolve_type(r, env))
                    .collect::<Result<_, _>>()?,
                variadic: *variadic,
            })),
        })
    }

    /// A size operand: an integer, not negative.
    fn eval_size(&self, expr: &Expr, env: &Env, what: &str) -> EvalResult<usize> {
        let value = self.eval_expr(expr, env)?;
        let n = try_to_int64(&value)?;
        let size =
            usize::try_from(n).map_err(|_| invalid_operation(format!("negative {what} {n}")))?;
        if size > MAX_ALLOC_LEN {
            return Err(invalid_operation(format!("{what} {n} too large")).into());
        }
        Ok(size)
    }

    pub(crate) fn eval_array_literal(
        &self,
        elem: Option<&TypeExpr>,
        items: &[Expr],
        env: &Env,
    ) -> EvalResult {
        let elem = match elem {
            Some(ty) => self.resolve_type(ty, env)?,
            None => TypeDesc::Any,
        };
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let value = self.eval_expr(item, env)?;
            values.push(convert_to(&value, &elem).map_err(|e| e.tag(item.pos))?);
        }
        Ok(Value::Array(ArrayValue::new(elem, values)))
    }

    pub(crate) fn eval_map_literal(
        &self,
        types: Option<&(TypeExpr, TypeExpr)>,
        entries: &[(Expr, Expr)],
        env: &Env,
    ) -> EvalResult {
        let (key_ty, elem_ty) = match types {
            Some((k, v)) => (self.resolve_type(k, env)?, self.resolve_type(v, env)?),
            None => (TypeDesc::Any, TypeDesc::Any),
        };
        let map = MapValue::new(key_ty.clone(), elem_ty.clone());
        for (key_expr, value_expr) in entries {
            let key = self.eval_expr(key_expr, env)?;
            let value = self.eval_expr(value_expr, env)?;
            let key = convert_to(&key, &key_ty).map_err(|e| e.tag(key_expr.pos))?;
            let value = convert_to(&value, &elem_ty).map_err(|e| e.tag(value_expr.pos))?;
            map.insert(key, value).map_err(|e| e.tag(key_expr.pos))?;
        }
        Ok(Value::Map(map))
    }

    /// `new(T)`: a pointer to a fresh zero value.
    pub(crate) fn eval_new(&self, ty: &TypeExpr, env: &Env) -> EvalResult {
        let ty = self.resolve_type(ty, env)?;
        let zero = ty.zero_value();
        Ok(Value::Pointer(PointerValue::to_new(ty, zero)))
    }

    /// `make(T)` or `make([]T, len, cap)`.
    pub(crate) fn eval_make(
        &self,
        ty: &TypeExpr,
        len: Option<&Expr>,
        cap: Option<&Expr>,
        env: &Env,
    ) -> EvalResult {
        let ty = self.resolve_type(ty, env)?;
        let Some(len) = len else {
            return Ok(ty.make_value());
        };
        let TypeDesc::Slice(elem) = &ty else {
            return Err(invalid_operation(format!("cannot make {ty} with a length")).into());
        };
        let len = self.eval_size(len, env, "length")?;
        let cap = match cap {
            Some(cap) => self.eval_size(cap, env, "capacity")?,
            None => len,
        };
        if cap < len {
            return Err(invalid_operation(format!("length {len} larger than capacity {cap}")).into());
        }
        let mut items = Vec::new();
        items
            .try_reserve_exact(cap)
            .map_err(|e| invalid_operation(format!("cannot allocate {cap} elements: {e}")))?;
        items.resize(len, elem.zero_value());
        Ok(Value::Array(ArrayValue::new((**elem).clone(), items)))
    }

    /// `make(chan T, size)`.
    pub(crate) fn eval_make_chan(
        &self,
        elem: &TypeExpr,
        size: Option<&Expr>,
        env: &Env,
    ) -> EvalResult {
        let elem = self.resolve_type(elem, env)?;
        let size = match size {
            Some(size) => self.eval_size(size, env, "buffer size")?,
            None => 0,
        };
        Ok(Value::Chan(ChanValue::new(elem, size)))
    }

    /// `make type Name = expr`: define `Name` as the type of the value.
    pub(crate) fn eval_make_type(&self, name: &Name, value: &Expr, env: &Env) -> EvalResult {
        let value = self.eval_expr(value, env)?;
        env.define_type(name.clone(), value.type_desc());
        Ok(value)
    }
}
