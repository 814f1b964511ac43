//! Assignment targets.
//!
//! Writes that replace a container (first write to a nil map, appending to
//! a nil array, rebuilding a string) store the new container back into the
//! base expression, recursively.
//!
//! In validate mode targets are still evaluated and values still convert,
//! but nothing reachable from outside the pass is written: names are
//! shadowed in the current scope and container writes are dropped.

use kite_ir::{Expr, ExprKind, Name};
use kite_value::convert::{convert_to, try_to_int64};
use kite_value::errors::{
    index_out_of_range, invalid_assignment_target, invalid_operation, nil_dereference, no_member,
    undefined_symbol, unexported_member,
};
use kite_value::{ArrayValue, Env, EvalError, EvalResult, MapValue, Value};

use super::access::{map_key, slice_bounds};
use super::Interpreter;
use crate::operators::evaluate_binary;

impl Interpreter {
    /// Store `value` into `target`.
    pub(crate) fn assign(&self, target: &Expr, value: Value, env: &Env) -> EvalResult<()> {
        self.assign_inner(target, value, env)
            .map_err(|action| action.tag(target.pos))
    }

    fn assign_inner(&self, target: &Expr, value: Value, env: &Env) -> EvalResult<()> {
        match &target.kind {
            ExprKind::Ident(name) => self.assign_ident(name, value, env),
            ExprKind::Paren(inner) => self.assign(inner, value, env),
            ExprKind::Member { base, name } => {
                let base_value = self.eval_expr(base, env)?;
                self.assign_member(base, base_value, name, value, env)
            }
            ExprKind::Index { base, index } => {
                let base_value = self.eval_expr(base, env)?;
                let index = self.eval_expr(index, env)?;
                self.assign_index(base, base_value, &index, value, env)
            }
            ExprKind::Slice { base, begin, end } => {
                let base_value = self.eval_expr(base, env)?;
                let begin = begin.as_deref().map(|e| self.eval_expr(e, env)).transpose()?;
                let end = end.as_deref().map(|e| self.eval_expr(e, env)).transpose()?;
                self.assign_slice(base_value, begin.as_ref(), end.as_ref(), value)
                    .map_err(Into::into)
            }
            ExprKind::Deref(inner) => match self.eval_expr(inner, env)? {
                Value::Pointer(p) => {
                    let value = convert_to(&value, p.elem())?;
                    if self.ctx.is_validating() {
                        return Ok(());
                    }
                    if p.store(value) {
                        Ok(())
                    } else {
                        Err(nil_dereference().into())
                    }
                }
                other => Err(invalid_operation(format!("cannot dereference {}", other.type_name())).into()),
            },
            _ => Err(invalid_assignment_target().into()),
        }
    }

    /// Plain names overwrite the nearest binding or define a new one in the
    /// current scope. Dotted names must already exist.
    fn assign_ident(&self, name: &Name, value: Value, env: &Env) -> EvalResult<()> {
        if self.ctx.is_validating() {
            return shadow_ident(name, value, env);
        }
        if let Some(slot) = env.slot(name) {
            *slot.write() = value;
            return Ok(());
        }
        if name.is_path() {
            return Err(undefined_symbol(name).into());
        }
        env.define_value(name.clone(), value);
        Ok(())
    }

    fn assign_member(
        &self,
        base: &Expr,
        base_value: Value,
        name: &Name,
        value: Value,
        env: &Env,
    ) -> EvalResult<()> {
        if let Value::Module(module) = &base_value {
            if self.ctx.is_validating() {
                return Ok(());
            }
            match module.local_slot(name) {
                Some(slot) => *slot.write() = value,
                None => module.define_value(name.clone(), value),
            }
            return Ok(());
        }
        match super::access::auto_deref(base_value)? {
            Value::Struct(s) => {
                let Some(index) = s.ty().field_index(name) else {
                    return Err(no_member(&s.ty().name, name).into());
                };
                if !name.is_exported() {
                    return Err(unexported_member(name).into());
                }
                let ty = &s.ty().fields[index].ty;
                let value = convert_to(&value, ty)?;
                if !self.ctx.is_validating() {
                    s.set(index, value);
                }
                Ok(())
            }
            Value::Map(map) => {
                self.assign_map(base, map, &Value::string(name.as_str()), value, env)
            }
            Value::Host(_) | Value::Module(_) if self.ctx.is_validating() => Ok(()),
            Value::Host(obj) => obj.set_field(name, value).map_err(Into::into),
            Value::Module(module) => {
                module.define_value(name.clone(), value);
                Ok(())
            }
            Value::Nil => Err(nil_dereference().into()),
            other => Err(no_member(&other.type_name(), name).into()),
        }
    }

    fn assign_index(
        &self,
        base: &Expr,
        base_value: Value,
        index: &Value,
        value: Value,
        env: &Env,
    ) -> EvalResult<()> {
        match super::access::auto_deref(base_value)? {
            Value::Array(arr) => self.assign_array_index(base, arr, index, value, env),
            Value::Map(map) => self.assign_map(base, map, index, value, env),
            Value::Str(s) => {
                let mut chars: Vec<char> = s.chars().collect();
                let i = try_to_int64(index)?;
                let len = chars.len();
                let at = usize::try_from(i)
                    .ok()
                    .filter(|&at| at <= len)
                    .ok_or_else(|| index_out_of_range(i, len))?;
                let insert: Vec<char> = value.to_string().chars().collect();
                let replace_end = if at == len { at } else { at + 1 };
                chars.splice(at..replace_end, insert);
                self.assign(base, Value::string(chars.into_iter().collect::<String>()), env)
            }
            other => Err(invalid_operation(format!("cannot index {}", other.type_name())).into()),
        }
    }

    /// In range overwrites; `len` appends, or concatenates when the value
    /// is an array that does not convert to the element type.
    fn assign_array_index(
        &self,
        base: &Expr,
        arr: ArrayValue,
        index: &Value,
        value: Value,
        env: &Env,
    ) -> EvalResult<()> {
        let i = try_to_int64(index)?;
        let len = arr.len();
        let at = usize::try_from(i)
            .ok()
            .filter(|&at| at <= len)
            .ok_or_else(|| index_out_of_range(i, len))?;

        if at < len {
            let value = convert_to(&value, arr.elem())?;
            if !self.ctx.is_validating() {
                arr.set(at, value);
            }
            return Ok(());
        }
        match convert_to(&value, arr.elem()) {
            Ok(_) if self.ctx.is_validating() => Ok(()),
            Ok(converted) => {
                if arr.is_nil() {
                    let grown = ArrayValue::new(arr.elem().clone(), vec![converted]);
                    self.assign(base, Value::Array(grown), env)
                } else {
                    arr.push(converted);
                    Ok(())
                }
            }
            Err(err) => match value {
                Value::Array(_) => {
                    let joined = evaluate_binary(Value::Array(arr), value, kite_ir::BinaryOp::Add)?;
                    self.assign(base, joined, env)
                }
                _ => Err(err.into()),
            },
        }
    }

    /// Map writes convert key and value to the declared types. A nil map
    /// is allocated and written back to the base.
    fn assign_map(
        &self,
        base: &Expr,
        map: MapValue,
        key: &Value,
        value: Value,
        env: &Env,
    ) -> EvalResult<()> {
        let key = map_key(&map, key)?;
        let value = convert_to(&value, map.elem_type())?;
        if self.ctx.is_validating() {
            return Ok(());
        }
        if map.is_nil() {
            let fresh = MapValue::new(map.key_type().clone(), map.elem_type().clone());
            {
                let _guard = self.ctx.map_guard();
                fresh.insert(key, value)?;
            }
            return self.assign(base, Value::Map(fresh), env);
        }
        let _guard = self.ctx.map_guard();
        map.insert(key, value)?;
        Ok(())
    }

    /// `a[b:e] = values`: replace the range element-wise.
    fn assign_slice(
        &self,
        base_value: Value,
        begin: Option<&Value>,
        end: Option<&Value>,
        value: Value,
    ) -> Result<(), EvalError> {
        let arr = match super::access::auto_deref(base_value)? {
            Value::Array(arr) => arr,
            other => {
                return Err(invalid_operation(format!(
                    "cannot assign to a slice of {}",
                    other.type_name()
                )));
            }
        };
        let (b, e) = slice_bounds(begin, end, arr.len())?;
        let Value::Array(source) = value else {
            return Err(invalid_operation("slice assignment needs an array value"));
        };
        let items = source.to_vec();
        if items.len() != e - b {
            return Err(invalid_operation(format!(
                "slice assignment of {} values to {} slots",
                items.len(),
                e - b
            )));
        }
        let items = items
            .iter()
            .map(|v| convert_to(v, arr.elem()))
            .collect::<Result<Vec<_>, _>>()?;
        if !self.ctx.is_validating() {
            arr.replace_range(b, e, items);
        }
        Ok(())
    }

    /// `x++` / `x--` on an identifier.
    pub(crate) fn eval_inc_dec(&self, target: &Expr, delta: i64, env: &Env) -> EvalResult {
        let Some(name) = target.as_ident() else {
            return Err(invalid_operation("++ and -- need an identifier").into());
        };
        let current = env.get_value(name).map_err(EvalError::from)?;
        let next = match current {
            Value::Int(n) => Value::Int(n.wrapping_add(delta)),
            Value::Float(f) => Value::Float(f + delta as f64),
            other => Value::Int(kite_value::convert::to_int64(&other).wrapping_add(delta)),
        };
        if self.ctx.is_validating() {
            shadow_ident(name, next.clone(), env)?;
        } else {
            env.set_value(name, next.clone()).map_err(EvalError::from)?;
        }
        Ok(next)
    }
}

/// Validation writes to a plain name land in the current scope, shadowing
/// any outer binding. Dotted names must exist and are left untouched.
fn shadow_ident(name: &Name, value: Value, env: &Env) -> EvalResult<()> {
    if let Some(slot) = env.local_slot(name) {
        *slot.write() = value;
        return Ok(());
    }
    if name.is_path() {
        return match env.slot(name) {
            Some(_) => Ok(()),
            None => Err(undefined_symbol(name).into()),
        };
    }
    env.define_value(name.clone(), value);
    Ok(())
}
