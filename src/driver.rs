//! Device lifecycle driver
//!
//! Drives one case through the two-phase device contract:
//!
//! ```text
//! Uninitialized -> Compiling -> Compiled | CompileFailed
//! Compiled -> Executing -> Executed | ExecuteFailed
//! ```
//!
//! A fresh [`CompletionSignal`] is created for every asynchronous call and
//! every wait is bounded by [`HarnessConfig::wait_timeout`]. The prepared
//! model, if any, is held by a [`PreparedModelGuard`] and released when the
//! driver is dropped.
//!
//! [`HarnessConfig::wait_timeout`]: crate::config::HarnessConfig::wait_timeout

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::environment::VtsEnvironment;
use crate::error::{VtsError, VtsResult};
use crate::hal::{ErrorStatus, Model, PreparedModelGuard, PreparedModelId, Request};
use crate::signal::{CompletionSignal, SignalStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Uninitialized,
    Compiling,
    Compiled,
    CompileFailed,
    Executing,
    Executed,
    ExecuteFailed,
}

impl LifecycleState {
    /// A compiled handle is held and may be executed.
    pub fn can_execute(self) -> bool {
        matches!(
            self,
            LifecycleState::Compiled | LifecycleState::Executed | LifecycleState::ExecuteFailed
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "UNINITIALIZED",
            LifecycleState::Compiling => "COMPILING",
            LifecycleState::Compiled => "COMPILED",
            LifecycleState::CompileFailed => "COMPILE_FAILED",
            LifecycleState::Executing => "EXECUTING",
            LifecycleState::Executed => "EXECUTED",
            LifecycleState::ExecuteFailed => "EXECUTE_FAILED",
        };
        f.write_str(name)
    }
}

/// What `prepare_model` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    /// Synchronous acknowledgement
    pub status: ErrorStatus,
    /// Observed signal state; `None` when the device rejected synchronously
    /// and the signal was not awaited
    pub signal: Option<SignalStatus>,
    pub handle: Option<PreparedModelId>,
}

impl PrepareReport {
    /// Compiled-handle acceptance rule: ok status, successful signal and a
    /// handle, all at once.
    pub fn accepted(&self) -> bool {
        self.status.is_ok()
            && self.signal == Some(SignalStatus::Success)
            && self.handle.is_some()
    }
}

/// What `execute` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecuteReport {
    pub status: ErrorStatus,
    pub signal: SignalStatus,
}

impl ExecuteReport {
    pub fn succeeded(&self) -> bool {
        self.status.is_ok() && self.signal.is_success()
    }
}

pub struct LifecycleDriver<'env> {
    env: &'env VtsEnvironment,
    state: LifecycleState,
    prepared: Option<PreparedModelGuard>,
}

impl<'env> LifecycleDriver<'env> {
    pub fn new(env: &'env VtsEnvironment) -> Self {
        Self {
            env,
            state: LifecycleState::Uninitialized,
            prepared: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Handle of the accepted prepared model.
    pub fn prepared(&self) -> Option<PreparedModelId> {
        self.prepared.as_ref().map(PreparedModelGuard::id)
    }

    fn transition(&mut self, to: LifecycleState) {
        tracing::debug!(from = %self.state, to = %to, "lifecycle transition");
        self.state = to;
    }

    fn forbid(&self, action: &'static str) -> VtsError {
        VtsError::InvalidStateTransition {
            from: self.state.to_string(),
            action,
        }
    }

    /// Wait for `signal` within the configured deadline.
    ///
    /// # Errors
    ///
    /// [`VtsError::SignalMisuse`] if the device notified the signal more than
    /// once.
    fn await_signal(
        &self,
        signal: &CompletionSignal,
        phase: &'static str,
    ) -> VtsResult<SignalStatus> {
        let timeout = self.env.config().wait_timeout;
        let status = signal.wait_for(timeout);
        if status == SignalStatus::Timeout {
            tracing::warn!(phase, ?timeout, "device did not signal completion");
        }
        let misuse = signal.misuse_count();
        if misuse > 0 {
            return Err(VtsError::SignalMisuse(format!(
                "{} signal notified {} extra time(s)",
                phase, misuse
            )));
        }
        Ok(status)
    }

    /// Submit `model` for compilation and apply the acceptance rule.
    ///
    /// The preparation signal is awaited only when the device acknowledged
    /// with `NONE`.
    pub fn prepare(&mut self, model: &Model) -> VtsResult<PrepareReport> {
        if self.state != LifecycleState::Uninitialized {
            return Err(self.forbid("prepare"));
        }
        self.transition(LifecycleState::Compiling);

        let device = Arc::clone(self.env.device());
        let signal = CompletionSignal::shared();
        let (status, handle) = device.prepare_model(model, Arc::clone(&signal));
        let guard = handle.map(|id| PreparedModelGuard::new(Arc::clone(&device), id));

        let observed = if status.is_ok() {
            Some(self.await_signal(&signal, "prepare")?)
        } else {
            None
        };

        let report = PrepareReport {
            status,
            signal: observed,
            handle,
        };
        tracing::debug!(%status, signal = ?observed, ?handle, "prepare_model returned");

        if report.accepted() {
            self.prepared = guard;
            self.transition(LifecycleState::Compiled);
        } else {
            if status.is_ok() && handle.is_none() {
                tracing::warn!("device returned NONE without a prepared model");
            }
            self.transition(LifecycleState::CompileFailed);
        }
        Ok(report)
    }

    /// Execute `request` against the held prepared model. The execution
    /// signal is always awaited, whatever the synchronous status.
    pub fn execute(&mut self, request: &Request) -> VtsResult<ExecuteReport> {
        if !self.state.can_execute() || self.prepared.is_none() {
            return Err(self.forbid("execute"));
        }
        self.transition(LifecycleState::Executing);

        let guard = self
            .prepared
            .as_ref()
            .ok_or_else(|| crate::internal_error!("compiled state without a prepared model"))?;
        let id = guard.id();
        let signal = CompletionSignal::shared();
        let status = guard.execute(request, Arc::clone(&signal));

        let observed = self.await_signal(&signal, "execute")?;
        tracing::debug!(prepared = %id, %status, signal = ?observed, "execute returned");

        let report = ExecuteReport {
            status,
            signal: observed,
        };
        self.transition(if report.succeeded() {
            LifecycleState::Executed
        } else {
            LifecycleState::ExecuteFailed
        });
        Ok(report)
    }
}

impl fmt::Debug for LifecycleDriver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleDriver")
            .field("state", &self.state)
            .field("prepared", &self.prepared())
            .finish()
    }
}
