//! Fault injection for the reference device
//!
//! A [`FaultPlan`] makes the reference device break one clause of its
//! contract at a time, so the harness's own rejection paths can be tested.
//! The default plan injects nothing.

use crate::hal::ErrorStatus;
use crate::signal::Outcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Synchronous status `prepare_model` returns for a valid model
    pub prepare_status: Option<ErrorStatus>,

    /// Return no handle even though preparation succeeded
    pub drop_handle: bool,

    /// Outcome the preparation worker notifies instead of the real one
    pub prepare_outcome: Option<Outcome>,

    /// The preparation worker never notifies
    pub silent_prepare: bool,

    /// Synchronous status `execute` returns for a valid request
    pub execute_status: Option<ErrorStatus>,

    /// Outcome the execution worker notifies instead of the real one
    pub execute_outcome: Option<Outcome>,

    /// The execution worker never notifies
    pub silent_execution: bool,

    /// The execution worker notifies twice
    pub double_notify: bool,
}

impl FaultPlan {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_prepare_status(mut self, status: ErrorStatus) -> Self {
        self.prepare_status = Some(status);
        self
    }

    pub fn with_dropped_handle(mut self) -> Self {
        self.drop_handle = true;
        self
    }

    pub fn with_prepare_outcome(mut self, outcome: Outcome) -> Self {
        self.prepare_outcome = Some(outcome);
        self
    }

    pub fn with_silent_prepare(mut self) -> Self {
        self.silent_prepare = true;
        self
    }

    pub fn with_execute_status(mut self, status: ErrorStatus) -> Self {
        self.execute_status = Some(status);
        self
    }

    pub fn with_execute_outcome(mut self, outcome: Outcome) -> Self {
        self.execute_outcome = Some(outcome);
        self
    }

    pub fn with_silent_execution(mut self) -> Self {
        self.silent_execution = true;
        self
    }

    pub fn with_double_notify(mut self) -> Self {
        self.double_notify = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_empty() {
        assert!(FaultPlan::none().is_empty());
        assert!(!FaultPlan::none().with_dropped_handle().is_empty());
    }

    #[test]
    fn test_builder_sets_fields() {
        let plan = FaultPlan::none()
            .with_prepare_status(ErrorStatus::GeneralFailure)
            .with_prepare_outcome(Outcome::Failure)
            .with_silent_execution()
            .with_double_notify();
        assert_eq!(plan.prepare_status, Some(ErrorStatus::GeneralFailure));
        assert_eq!(plan.prepare_outcome, Some(Outcome::Failure));
        assert!(plan.silent_execution);
        assert!(plan.double_notify);
        assert!(!plan.drop_handle);
    }
}
