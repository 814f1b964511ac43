//! Blocking channel operations.
//!
//! Each operation selects on the channel and on the run's cancel receiver,
//! so a blocked goroutine wakes when the run is cancelled. A cancelled run
//! always reports `Interrupted`, even when the channel operation won the
//! race. Nil channels block until cancellation.

use crossbeam::channel::Select;
use kite_value::convert::convert_to;
use kite_value::errors::send_on_closed_channel;
use kite_value::{ChanValue, EvalError, Value};

use super::Interpreter;

impl Interpreter {
    pub(crate) fn chan_send(&self, ch: &ChanValue, value: Value) -> Result<(), EvalError> {
        let value = convert_to(&value, ch.elem())?;
        let tx = ch.sender()?;
        if self.ctx.is_validating() {
            return Ok(());
        }
        if self.ctx.is_cancelled() {
            return Err(self.ctx.interrupted_error());
        }
        let Some(tx) = tx else {
            return Err(self.wait_cancelled());
        };

        let cancel = self.ctx.cancel_receiver();
        let mut sel = Select::new();
        let cancel_index = sel.recv(cancel);
        sel.send(&tx);
        let oper = sel.select();
        if oper.index() == cancel_index {
            let _ = oper.recv(cancel);
            return Err(self.ctx.interrupted_error());
        }
        oper.send(&tx, value).map_err(|_| send_on_closed_channel())?;
        if self.ctx.is_cancelled() {
            return Err(self.ctx.interrupted_error());
        }
        Ok(())
    }

    /// Receive one value. A closed, drained channel yields the element's
    /// zero value and `false`.
    pub(crate) fn chan_recv(&self, ch: &ChanValue) -> Result<(Value, bool), EvalError> {
        let rx = ch.receiver()?;
        if self.ctx.is_validating() {
            return Ok((ch.elem().zero_value(), true));
        }
        if self.ctx.is_cancelled() {
            return Err(self.ctx.interrupted_error());
        }
        let Some(rx) = rx else {
            return Err(self.wait_cancelled());
        };

        let cancel = self.ctx.cancel_receiver();
        let mut sel = Select::new();
        let cancel_index = sel.recv(cancel);
        sel.recv(&rx);
        let oper = sel.select();
        if oper.index() == cancel_index {
            let _ = oper.recv(cancel);
            return Err(self.ctx.interrupted_error());
        }
        let received = oper.recv(&rx);
        if self.ctx.is_cancelled() {
            return Err(self.ctx.interrupted_error());
        }
        Ok(match received {
            Ok(value) => (value, true),
            Err(_) => (ch.elem().zero_value(), false),
        })
    }

    /// Block until the run is cancelled.
    fn wait_cancelled(&self) -> EvalError {
        // Only ever disconnects; nothing is sent on the cancel channel.
        let _ = self.ctx.cancel_receiver().recv();
        self.ctx.interrupted_error()
    }
}
