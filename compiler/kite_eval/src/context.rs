//! Per-run execution context.
//!
//! One [`ExecContext`] is shared (by `Arc`) between a run and every
//! goroutine it spawns. It carries:
//!
//! - the cancellation signal,
//! - the step counter and optional budget,
//! - the pause gate and the optional rate limiter,
//! - the lock serializing map access across goroutines,
//! - the channel collecting goroutine errors.
//!
//! A validating handle also carries the set of functions entered during
//! its pass. Each pass starts with an empty set.
//!
//! # Checkpoints
//!
//! [`ExecContext::checkpoint`] runs before every statement, every
//! expression and every loop iteration. It counts the step, then checks
//! cancellation, then waits out a pause, then waits for the rate limiter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use kite_ir::FuncLit;
use kite_value::errors::interrupted;
use kite_value::{EvalError, InterruptReason};
use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::config::RunConfig;

/// Broadcast cancellation.
///
/// The receiver end of a zero-capacity channel becomes permanently ready
/// once the sender is dropped, so blocking channel operations can select on
/// it alongside their own channel.
pub struct CancelSignal {
    flag: AtomicBool,
    reason: Mutex<Option<InterruptReason>>,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl CancelSignal {
    fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        CancelSignal {
            flag: AtomicBool::new(false),
            reason: Mutex::new(None),
            trigger: Mutex::new(Some(tx)),
            done: rx,
        }
    }

    /// Fire the signal. The first reason wins; later calls are no-ops.
    fn fire(&self, reason: InterruptReason) -> bool {
        {
            let mut slot = self.reason.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
        }
        self.flag.store(true, Ordering::Release);
        self.trigger.lock().take();
        true
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<InterruptReason> {
        *self.reason.lock()
    }

    /// Ready (disconnected) once cancelled.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.done
    }
}

/// Blocks checkpoints while paused.
struct PauseGate {
    paused: Mutex<bool>,
    cond: Condvar,
}

impl PauseGate {
    fn new() -> Self {
        PauseGate {
            paused: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn set(&self, paused: bool) {
        *self.paused.lock() = paused;
        self.cond.notify_all();
    }

    /// Wake waiters so they re-check cancellation.
    fn wake(&self) {
        let _guard = self.paused.lock();
        self.cond.notify_all();
    }

    fn wait(&self, cancel: &CancelSignal) {
        let mut paused = self.paused.lock();
        while *paused && !cancel.is_cancelled() {
            self.cond.wait(&mut paused);
        }
    }
}

/// Fixed one-second window limiter.
struct RateLimiter {
    per_second: u64,
    window: Mutex<(Instant, u64)>,
}

impl RateLimiter {
    fn new(per_second: u64) -> Self {
        RateLimiter {
            per_second,
            window: Mutex::new((Instant::now(), 0)),
        }
    }

    /// Take one step token, sleeping until the next window when the
    /// current one is spent. Sleeping ends early on cancellation.
    fn acquire(&self, cancel: &CancelSignal) {
        loop {
            let wait = {
                let mut window = self.window.lock();
                let elapsed = window.0.elapsed();
                if elapsed >= Duration::from_secs(1) {
                    *window = (Instant::now(), 0);
                }
                if window.1 < self.per_second {
                    window.1 += 1;
                    return;
                }
                Duration::from_secs(1).saturating_sub(window.0.elapsed())
            };
            // Returns at once with `Disconnected` when cancelled.
            if cancel.receiver().recv_timeout(wait).is_err() && cancel.is_cancelled() {
                return;
            }
        }
    }
}

struct Shared {
    cancel: CancelSignal,
    steps: AtomicU64,
    max_steps: Option<u64>,
    pause: PauseGate,
    limiter: Option<RateLimiter>,
    map_lock: Mutex<()>,
    async_tx: Sender<EvalError>,
    async_rx: Receiver<EvalError>,
    spawned: Mutex<Vec<JoinHandle<()>>>,
    recover_panics: bool,
}

/// Function literals entered during one validation pass, keyed by
/// address. Holding the `Arc` keeps every key's address live for the pass.
type ReachableSet = Mutex<FxHashMap<usize, Arc<FuncLit>>>;

/// Handle to the shared run state plus the per-handle validation pass.
#[derive(Clone)]
pub struct ExecContext {
    shared: Arc<Shared>,
    /// `Some` in validate mode.
    reachable: Option<Arc<ReachableSet>>,
}

impl ExecContext {
    pub fn new(config: &RunConfig) -> Self {
        let (async_tx, async_rx) = channel::unbounded();
        ExecContext {
            shared: Arc::new(Shared {
                cancel: CancelSignal::new(),
                steps: AtomicU64::new(0),
                max_steps: config.max_steps,
                pause: PauseGate::new(),
                limiter: config.steps_per_second.map(RateLimiter::new),
                map_lock: Mutex::new(()),
                async_tx,
                async_rx,
                spawned: Mutex::new(Vec::new()),
                recover_panics: config.recover_panics,
            }),
            reachable: None,
        }
    }

    /// A handle on the same run state in validate mode, starting a new
    /// validation pass.
    #[must_use]
    pub fn validating_copy(&self) -> Self {
        ExecContext {
            shared: Arc::clone(&self.shared),
            reachable: Some(Arc::new(Mutex::new(FxHashMap::default()))),
        }
    }

    #[inline]
    pub fn is_validating(&self) -> bool {
        self.reachable.is_some()
    }

    #[inline]
    pub fn recover_panics(&self) -> bool {
        self.shared.recover_panics
    }

    /// Count one step and honor cancellation, pause and throttling.
    pub fn checkpoint(&self) -> Result<(), EvalError> {
        let shared = &*self.shared;
        let steps = shared.steps.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(max) = shared.max_steps {
            if steps > max {
                tracing::trace!(steps, max, "step budget exhausted");
                self.cancel_with(InterruptReason::StepBudget);
                return Err(self.interrupted_error());
            }
        }
        if shared.cancel.is_cancelled() {
            return Err(self.interrupted_error());
        }
        shared.pause.wait(&shared.cancel);
        if let Some(limiter) = &shared.limiter {
            limiter.acquire(&shared.cancel);
        }
        if shared.cancel.is_cancelled() {
            return Err(self.interrupted_error());
        }
        Ok(())
    }

    pub fn steps(&self) -> u64 {
        self.shared.steps.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancel_with(InterruptReason::Cancelled);
    }

    fn cancel_with(&self, reason: InterruptReason) {
        if self.shared.cancel.fire(reason) {
            tracing::debug!(%reason, steps = self.steps(), "run interrupted");
            self.shared.pause.wake();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn cancel_receiver(&self) -> &Receiver<()> {
        self.shared.cancel.receiver()
    }

    /// The `Interrupted` error carrying the reason the run was stopped.
    #[cold]
    pub fn interrupted_error(&self) -> EvalError {
        interrupted(
            self.shared
                .cancel
                .reason()
                .unwrap_or(InterruptReason::Cancelled),
        )
    }

    pub fn pause(&self) {
        self.shared.pause.set(true);
    }

    pub fn resume(&self) {
        self.shared.pause.set(false);
    }

    /// Serialize a map operation against other goroutines.
    pub fn map_guard(&self) -> MutexGuard<'_, ()> {
        self.shared.map_lock.lock()
    }

    /// Record a function literal as entered in this validation pass.
    /// Returns `false` when it was already recorded, or when not validating.
    pub fn mark_reachable(&self, lit: &Arc<FuncLit>) -> bool {
        let Some(reachable) = &self.reachable else {
            return false;
        };
        let addr = Arc::as_ptr(lit) as usize;
        let mut seen = reachable.lock();
        if seen.contains_key(&addr) {
            return false;
        }
        seen.insert(addr, Arc::clone(lit));
        true
    }

    pub fn report_async(&self, err: EvalError) {
        if let Err(dropped) = self.shared.async_tx.send(err) {
            tracing::warn!(error = %dropped.0, "dropped goroutine error");
        }
    }

    pub fn drain_async_errors(&self) -> Vec<EvalError> {
        self.shared.async_rx.try_iter().collect()
    }

    /// Keep `handle` for [`ExecContext::join_spawned`], reaping goroutines
    /// that have already finished.
    pub fn track_spawned(&self, handle: JoinHandle<()>) {
        let finished = {
            let mut spawned = self.shared.spawned.lock();
            let (finished, running) = std::mem::take(&mut *spawned)
                .into_iter()
                .partition::<Vec<_>, _>(JoinHandle::is_finished);
            *spawned = running;
            spawned.push(handle);
            finished
        };
        for handle in finished {
            reap(handle);
        }
    }

    #[cfg(test)]
    fn tracked_goroutines(&self) -> usize {
        self.shared.spawned.lock().len()
    }

    /// Join every spawned goroutine, including ones spawned while joining.
    pub fn join_spawned(&self) {
        loop {
            let handles = std::mem::take(&mut *self.shared.spawned.lock());
            if handles.is_empty() {
                return;
            }
            handles.into_iter().for_each(reap);
        }
    }
}

fn reap(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::warn!("goroutine thread panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_value::EvalErrorKind;

    fn context(config: RunConfig) -> ExecContext {
        ExecContext::new(&config)
    }

    #[test]
    fn checkpoint_passes_until_cancelled() {
        let ctx = context(RunConfig::default());
        assert!(ctx.checkpoint().is_ok());
        ctx.cancel();
        let err = ctx.checkpoint().err();
        assert_eq!(
            err.map(|e| e.kind),
            Some(EvalErrorKind::Interrupted {
                reason: InterruptReason::Cancelled
            })
        );
    }

    #[test]
    fn step_budget_interrupts() {
        let ctx = context(RunConfig {
            max_steps: Some(3),
            ..RunConfig::default()
        });
        for _ in 0..3 {
            assert!(ctx.checkpoint().is_ok());
        }
        let err = ctx.checkpoint().err();
        assert_eq!(
            err.map(|e| e.kind),
            Some(EvalErrorKind::Interrupted {
                reason: InterruptReason::StepBudget
            })
        );
        // The budget reason sticks for every later checkpoint.
        assert!(ctx.is_cancelled());
        assert_eq!(
            ctx.interrupted_error().kind,
            EvalErrorKind::Interrupted {
                reason: InterruptReason::StepBudget
            }
        );
    }

    #[test]
    fn cancel_receiver_becomes_ready() {
        let ctx = context(RunConfig::default());
        assert!(ctx.cancel_receiver().try_recv().is_err());
        assert!(!ctx.is_cancelled());
        ctx.cancel();
        assert!(matches!(
            ctx.cancel_receiver().try_recv(),
            Err(channel::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn cancel_releases_paused_checkpoint() {
        let ctx = context(RunConfig::default());
        ctx.pause();
        let waiter = {
            let ctx = ctx.clone();
            std::thread::spawn(move || ctx.checkpoint())
        };
        std::thread::sleep(Duration::from_millis(20));
        ctx.cancel();
        let result = waiter.join();
        assert!(matches!(result, Ok(Err(e)) if e.is_interrupted()));
    }

    #[test]
    fn resume_releases_paused_checkpoint() {
        let ctx = context(RunConfig::default());
        ctx.pause();
        let waiter = {
            let ctx = ctx.clone();
            std::thread::spawn(move || ctx.checkpoint())
        };
        std::thread::sleep(Duration::from_millis(20));
        ctx.resume();
        assert!(matches!(waiter.join(), Ok(Ok(()))));
    }

    fn func_lit() -> Arc<FuncLit> {
        match kite_ir::build::func(&[], Vec::new()).kind {
            kite_ir::ExprKind::Func(lit) => lit,
            _ => unreachable!(),
        }
    }

    #[test]
    fn reachable_set_records_once_per_pass() {
        let ctx = context(RunConfig::default());
        let lit = func_lit();
        assert!(!ctx.mark_reachable(&lit));

        let pass = ctx.validating_copy();
        assert!(pass.mark_reachable(&lit));
        assert!(!pass.mark_reachable(&lit));
        // Clones share the pass.
        assert!(!pass.clone().mark_reachable(&lit));

        let next = ctx.validating_copy();
        assert!(next.mark_reachable(&lit));
    }

    #[test]
    fn finished_goroutines_are_reaped() {
        let ctx = context(RunConfig::default());
        let first = std::thread::spawn(|| {});
        while !first.is_finished() {
            std::thread::yield_now();
        }
        ctx.track_spawned(first);
        let (tx, rx) = channel::bounded::<()>(0);
        ctx.track_spawned(std::thread::spawn(move || {
            let _ = rx.recv();
        }));
        // The first thread was reaped; the blocked one is still tracked.
        assert_eq!(ctx.tracked_goroutines(), 1);
        drop(tx);
        ctx.join_spawned();
        assert_eq!(ctx.tracked_goroutines(), 0);
    }

    #[test]
    fn async_errors_drain() {
        let ctx = context(RunConfig::default());
        ctx.report_async(kite_value::errors::thrown("late"));
        let errors = ctx.drain_async_errors();
        assert_eq!(errors.len(), 1);
        assert!(ctx.drain_async_errors().is_empty());
    }
}
