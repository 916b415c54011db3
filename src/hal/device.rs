//! Device contract consumed by the harness.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::hal::model::Model;
use crate::hal::request::Request;
use crate::hal::types::{Capabilities, DeviceStatus, ErrorStatus};
use crate::signal::CompletionSignal;

/// Token for a prepared model held in the device's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PreparedModelId(pub u64);

impl fmt::Display for PreparedModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prepared#{}", self.0)
    }
}

/// A compute device reachable through its declared contract.
///
/// Asynchronous entry points return their synchronous acknowledgement and
/// later notify the supplied signal exactly once from the device's own
/// execution context.
pub trait Device: Send + Sync {
    fn get_status(&self) -> DeviceStatus;

    fn get_capabilities(&self) -> (ErrorStatus, Capabilities);

    /// One flag per operation of `model`, in order.
    fn get_supported_operations(&self, model: &Model) -> (ErrorStatus, Vec<bool>);

    fn prepare_model(
        &self,
        model: &Model,
        signal: Arc<CompletionSignal>,
    ) -> (ErrorStatus, Option<PreparedModelId>);

    fn execute(
        &self,
        prepared: PreparedModelId,
        request: &Request,
        signal: Arc<CompletionSignal>,
    ) -> ErrorStatus;

    /// Drop the arena slot behind `prepared`. Unknown ids are ignored.
    fn release(&self, prepared: PreparedModelId);
}

/// Owns a prepared model for the lifetime of one case and releases it on
/// drop.
pub struct PreparedModelGuard {
    device: Arc<dyn Device>,
    id: PreparedModelId,
}

impl PreparedModelGuard {
    pub fn new(device: Arc<dyn Device>, id: PreparedModelId) -> Self {
        Self { device, id }
    }

    pub fn id(&self) -> PreparedModelId {
        self.id
    }

    pub fn execute(&self, request: &Request, signal: Arc<CompletionSignal>) -> ErrorStatus {
        self.device.execute(self.id, request, signal)
    }
}

impl fmt::Debug for PreparedModelGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedModelGuard").field("id", &self.id).finish()
    }
}

impl Drop for PreparedModelGuard {
    fn drop(&mut self) {
        tracing::trace!(prepared = %self.id, "releasing prepared model");
        self.device.release(self.id);
    }
}
