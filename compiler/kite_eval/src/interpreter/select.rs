//! `select`.
//!
//! Case operands must be identifiers bound to channels. All operands (and
//! send values) are evaluated up front, then one `crossbeam` select waits on
//! every ready-able case plus the run's cancel receiver. Nil channels are
//! never ready. With a `default` arm the select does not block.

use crossbeam::channel::{Receiver, Select, Sender};
use kite_ir::{SelectCase, SelectOp, Stmt};
use kite_value::convert::convert_to;
use kite_value::errors::{invalid_operation, send_on_closed_channel, syntax_rejection};
use kite_value::{ChanValue, ControlAction, Env, EvalResult, TypeDesc, Value};

use super::Interpreter;

enum Ready {
    Recv {
        rx: Option<Receiver<Value>>,
        elem: TypeDesc,
    },
    Send {
        tx: Option<Sender<Value>>,
    },
}

/// `break` leaves the select.
fn leave(result: EvalResult) -> EvalResult {
    match result {
        Err(ControlAction::Break) => Ok(Value::Nil),
        other => other,
    }
}

impl Interpreter {
    fn select_chan(&self, case: &SelectCase, env: &Env) -> EvalResult<ChanValue> {
        let operand = case.op.chan();
        if operand.as_ident().is_none() {
            return Err(syntax_rejection("select case channel must be an identifier")
                .tag(case.pos)
                .into());
        }
        match self.eval_expr(operand, env)? {
            Value::Chan(ch) => Ok(ch),
            other => Err(invalid_operation(format!("select on {}", other.type_name()))
                .tag(case.pos)
                .into()),
        }
    }

    pub(crate) fn exec_select(
        &self,
        cases: &[SelectCase],
        default: Option<&[Stmt]>,
        env: &Env,
    ) -> EvalResult {
        if self.ctx.is_validating() {
            return self.validate_select(cases, default, env);
        }

        let mut ready = Vec::with_capacity(cases.len());
        let mut outgoing = Vec::with_capacity(cases.len());
        for case in cases {
            let ch = self.select_chan(case, env)?;
            match &case.op {
                SelectOp::Recv { .. } => {
                    ready.push(Ready::Recv {
                        rx: ch.receiver()?,
                        elem: ch.elem().clone(),
                    });
                    outgoing.push(None);
                }
                SelectOp::Send { value, .. } => {
                    let value = self.eval_expr(value, env)?;
                    let value = convert_to(&value, ch.elem())?;
                    ready.push(Ready::Send { tx: ch.sender()? });
                    outgoing.push(Some(value));
                }
            }
        }
        if self.ctx.is_cancelled() {
            return Err(self.ctx.interrupted_error().into());
        }

        let cancel = self.ctx.cancel_receiver();
        let mut sel = Select::new();
        let cancel_index = sel.recv(cancel);
        // Select operation index -> case index.
        let mut slots = Vec::with_capacity(cases.len());
        for (case_index, entry) in ready.iter().enumerate() {
            let op_index = match entry {
                Ready::Recv { rx: Some(rx), .. } => sel.recv(rx),
                Ready::Send { tx: Some(tx) } => sel.send(tx),
                _ => continue,
            };
            slots.push((op_index, case_index));
        }

        let oper = match default {
            Some(body) => match sel.try_select() {
                Ok(oper) => oper,
                Err(_) => return leave(self.exec_block(body, &env.new_child())),
            },
            None => sel.select(),
        };
        let index = oper.index();
        if index == cancel_index {
            let _ = oper.recv(cancel);
            return Err(self.ctx.interrupted_error().into());
        }
        let Some(&(_, case_index)) = slots.iter().find(|(op, _)| *op == index) else {
            return Err(invalid_operation("select chose an unknown case").into());
        };

        let scope = env.new_child();
        match (&ready[case_index], &cases[case_index].op) {
            (Ready::Recv { rx: Some(rx), elem }, SelectOp::Recv { bind, .. }) => {
                let value = oper.recv(rx).unwrap_or_else(|_| elem.zero_value());
                if let Some(name) = bind {
                    scope.define_value(name.clone(), value);
                }
            }
            (Ready::Send { tx: Some(tx) }, _) => {
                let value = outgoing[case_index].take().unwrap_or(Value::Nil);
                oper.send(tx, value)
                    .map_err(|_| ControlAction::from(send_on_closed_channel()))?;
            }
            _ => return Err(invalid_operation("select case mismatch").into()),
        }
        if self.ctx.is_cancelled() {
            return Err(self.ctx.interrupted_error().into());
        }
        tracing::trace!(case = case_index, "select case chosen");
        leave(self.exec_block(&cases[case_index].body, &scope))
    }

    /// Every case body runs once, in order, with receive bindings at the
    /// element's zero value.
    fn validate_select(
        &self,
        cases: &[SelectCase],
        default: Option<&[Stmt]>,
        env: &Env,
    ) -> EvalResult {
        for case in cases {
            let ch = self.select_chan(case, env)?;
            let scope = env.new_child();
            match &case.op {
                SelectOp::Recv { bind, .. } => {
                    if let Some(name) = bind {
                        scope.define_value(name.clone(), ch.elem().zero_value());
                    }
                }
                SelectOp::Send { value, .. } => {
                    self.eval_expr(value, env)?;
                }
            }
            leave(self.exec_block(&case.body, &scope))?;
        }
        if let Some(body) = default {
            leave(self.exec_block(body, &env.new_child()))?;
        }
        Ok(Value::Nil)
    }
}
