//! Channel values.
//!
//! Backed by `crossbeam` bounded channels; capacity 0 is a rendezvous
//! channel. Closing drops the owned sender, so receivers drain buffered
//! values and then observe disconnection. Blocking operations live in the
//! evaluator, where they can race cancellation.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use kite_ir::ChanDirection;
use parking_lot::RwLock;

use super::Value;
use crate::errors::{invalid_operation, send_on_closed_channel, EvalError};
use crate::types::TypeDesc;

struct ChanInner {
    tx: RwLock<Option<Sender<Value>>>,
    rx: Receiver<Value>,
    cap: usize,
}

#[derive(Clone)]
pub struct ChanValue {
    elem: TypeDesc,
    dir: ChanDirection,
    inner: Option<Arc<ChanInner>>,
}

impl ChanValue {
    pub fn new(elem: TypeDesc, cap: usize) -> Self {
        let (tx, rx) = channel::bounded(cap);
        ChanValue {
            elem,
            dir: ChanDirection::Both,
            inner: Some(Arc::new(ChanInner {
                tx: RwLock::new(Some(tx)),
                rx,
                cap,
            })),
        }
    }

    pub fn nil(elem: TypeDesc, dir: ChanDirection) -> Self {
        ChanValue {
            elem,
            dir,
            inner: None,
        }
    }

    #[must_use]
    pub fn with_direction(mut self, dir: ChanDirection) -> Self {
        self.dir = dir;
        self
    }

    #[inline]
    pub fn elem(&self) -> &TypeDesc {
        &self.elem
    }

    #[inline]
    pub fn direction(&self) -> ChanDirection {
        self.dir
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.inner.is_none()
    }

    /// A sender for one send operation.
    ///
    /// `Ok(None)` for a nil channel (the send blocks until cancelled).
    pub fn sender(&self) -> Result<Option<Sender<Value>>, EvalError> {
        if self.dir == ChanDirection::Recv {
            return Err(invalid_operation("send to receive-only channel"));
        }
        match &self.inner {
            None => Ok(None),
            Some(inner) => match &*inner.tx.read() {
                Some(tx) => Ok(Some(tx.clone())),
                None => Err(send_on_closed_channel()),
            },
        }
    }

    /// The receiving end. `Ok(None)` for a nil channel.
    pub fn receiver(&self) -> Result<Option<Receiver<Value>>, EvalError> {
        if self.dir == ChanDirection::Send {
            return Err(invalid_operation("receive from send-only channel"));
        }
        Ok(self.inner.as_ref().map(|inner| inner.rx.clone()))
    }

    pub fn close(&self) -> Result<(), EvalError> {
        let Some(inner) = &self.inner else {
            return Err(invalid_operation("close of nil channel"));
        };
        match inner.tx.write().take() {
            Some(_) => Ok(()),
            None => Err(invalid_operation("close of closed channel")),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.tx.read().is_none())
    }

    /// Buffered element count.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.rx.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cap(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.cap)
    }

    pub fn addr(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| Arc::as_ptr(inner).cast::<()>() as usize)
    }
}
