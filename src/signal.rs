//! One-shot completion signal
//!
//! A [`CompletionSignal`] is created fresh for every asynchronous device
//! operation (prepare, execute). The device notifies it exactly once from
//! its own execution context; any number of harness threads may wait on it.
//!
//! # Ordering
//!
//! `notify` publishes the outcome under the signal's mutex and `wait`
//! observes it under the same mutex, so every write the producer made before
//! `notify` (in particular, writes to output pools) is visible to the waiter
//! once `wait` returns.
//!
//! # Misuse
//!
//! A second `notify` is a broken contract, not a device defect. It is
//! rejected with [`VtsError::SignalMisuse`], the first outcome is kept and
//! the rejection is counted in [`CompletionSignal::misuse_count`].

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{VtsError, VtsResult};

/// What a producer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// What a waiter observes.
///
/// `Timeout` is only ever produced by a deadline-bounded wait; it means the
/// signal was still pending when the deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalStatus {
    Success,
    Failure,
    Timeout,
}

impl SignalStatus {
    pub fn is_success(self) -> bool {
        self == SignalStatus::Success
    }

    /// Success or Failure, i.e. the producer has reported.
    pub fn is_terminal(self) -> bool {
        self != SignalStatus::Timeout
    }
}

impl From<Outcome> for SignalStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => SignalStatus::Success,
            Outcome::Failure => SignalStatus::Failure,
        }
    }
}

#[derive(Debug, Default)]
pub struct CompletionSignal {
    state: Mutex<Option<Outcome>>,
    cond: Condvar,
    misuse: AtomicUsize,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// New signal behind an `Arc`, ready to hand to a device.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // The protected value is a plain Option, so a panic elsewhere cannot
    // leave it half-written.
    fn lock_state(&self) -> MutexGuard<'_, Option<Outcome>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the operation complete.
    ///
    /// # Errors
    ///
    /// [`VtsError::SignalMisuse`] if the signal already left the pending
    /// state. The stored outcome is not changed.
    pub fn notify(&self, outcome: Outcome) -> VtsResult<()> {
        let mut state = self.lock_state();
        if let Some(first) = *state {
            let count = self.misuse.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::error!(
                ?first,
                rejected = ?outcome,
                count,
                "completion signal notified more than once"
            );
            return Err(VtsError::SignalMisuse(format!(
                "notify({:?}) after terminal state {:?}",
                outcome, first
            )));
        }

        *state = Some(outcome);
        self.cond.notify_all();
        tracing::trace!(?outcome, "completion signal notified");
        Ok(())
    }

    /// Block until the producer reports. Idempotent.
    pub fn wait(&self) -> SignalStatus {
        let state = self.lock_state();
        let state = self
            .cond
            .wait_while(state, |s| s.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        match *state {
            Some(outcome) => outcome.into(),
            // wait_while only returns once the predicate is false
            None => SignalStatus::Failure,
        }
    }

    /// Block until the producer reports or `deadline` passes.
    pub fn wait_until(&self, deadline: Instant) -> SignalStatus {
        let mut state = self.lock_state();
        loop {
            if let Some(outcome) = *state {
                return outcome.into();
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!("completion signal wait timed out");
                return SignalStatus::Timeout;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> SignalStatus {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => self.wait(),
        }
    }

    /// `wait` when `timeout` is `None`, `wait_timeout` otherwise.
    pub fn wait_for(&self, timeout: Option<Duration>) -> SignalStatus {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => self.wait(),
        }
    }

    /// Non-blocking peek; `None` while pending.
    pub fn status(&self) -> Option<SignalStatus> {
        self.lock_state().map(SignalStatus::from)
    }

    pub fn is_pending(&self) -> bool {
        self.lock_state().is_none()
    }

    /// Number of rejected notifications.
    pub fn misuse_count(&self) -> usize {
        self.misuse.load(Ordering::SeqCst)
    }
}
