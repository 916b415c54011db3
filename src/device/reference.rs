//! Reference CPU device
//!
//! Implements [`Device`] on the host. Prepared models live in an arena keyed
//! by [`PreparedModelId`]; every preparation and execution runs on its own
//! named worker thread and reports through the caller's completion signal.
//! Outstanding workers are joined when the device is dropped.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::device::config::DeviceConfig;
use crate::device::faults::FaultPlan;
use crate::device::plan::ExecutionPlan;
use crate::error::VtsResult;
use crate::hal::{
    validate_model, validate_request, Capabilities, Device, DeviceStatus, ErrorStatus, Model,
    OperandType, PreparedModelId, Request,
};
use crate::signal::{CompletionSignal, Outcome};

#[derive(Debug)]
enum Slot {
    Compiling,
    Ready(Arc<ExecutionPlan>),
    Failed,
}

type Arena = Arc<Mutex<HashMap<PreparedModelId, Slot>>>;

#[derive(Debug, Default)]
struct Counters {
    prepared: AtomicUsize,
    executed: AtomicUsize,
    rejected: AtomicUsize,
    released: AtomicUsize,
}

/// Snapshot of the device's call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    /// Models accepted for preparation
    pub prepared: usize,
    /// Requests accepted for execution
    pub executed: usize,
    /// Calls answered with `INVALID_ARGUMENT`
    pub rejected: usize,
    pub released: usize,
    /// Prepared models still in the arena
    pub live: usize,
}

pub struct ReferenceDevice {
    config: DeviceConfig,
    faults: FaultPlan,
    next_id: AtomicU64,
    arena: Arena,
    counters: Arc<Counters>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

fn notify_logged(signal: &CompletionSignal, outcome: Outcome) {
    if let Err(e) = signal.notify(outcome) {
        tracing::error!(error = %e, "device worker could not notify");
    }
}

fn lock_arena(arena: &Arena) -> VtsResult<MutexGuard<'_, HashMap<PreparedModelId, Slot>>> {
    Ok(arena.lock()?)
}

impl ReferenceDevice {
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_faults(config, FaultPlan::none())
    }

    pub fn with_faults(config: DeviceConfig, faults: FaultPlan) -> Self {
        if !faults.is_empty() {
            tracing::info!(device = %config.name, ?faults, "fault injection enabled");
        }
        Self {
            config,
            faults,
            next_id: AtomicU64::new(1),
            arena: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn stats(&self) -> DeviceStats {
        let live = lock_arena(&self.arena).map(|a| a.len()).unwrap_or(0);
        DeviceStats {
            prepared: self.counters.prepared.load(Ordering::Relaxed),
            executed: self.counters.executed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            live,
        }
    }

    fn reject(&self, signal: &CompletionSignal) -> ErrorStatus {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        notify_logged(signal, Outcome::Failure);
        ErrorStatus::InvalidArgument
    }

    fn spawn(&self, label: &str, work: impl FnOnce() + Send + 'static) -> VtsResult<()> {
        let handle = thread::Builder::new()
            .name(format!("{}-{}", self.config.name, label))
            .spawn(work)?;
        let mut workers = self.workers.lock()?;
        workers.retain(|w| !w.is_finished());
        workers.push(handle);
        Ok(())
    }

    /// Primary operand type of every operation, `None` where it cannot be
    /// resolved.
    fn operation_types(model: &Model) -> impl Iterator<Item = Option<OperandType>> + '_ {
        model.operations.iter().map(|op| {
            op.inputs
                .first()
                .and_then(|&i| model.operand(i))
                .map(|operand| operand.operand_type)
        })
    }

    fn supported_flags(&self, model: &Model) -> Vec<bool> {
        let caps = self.config.capabilities();
        model
            .operations
            .iter()
            .zip(Self::operation_types(model))
            .map(|(op, ty)| ty.is_some_and(|ty| caps.supports(op.op_type, ty)))
            .collect()
    }
}

impl Device for ReferenceDevice {
    fn get_status(&self) -> DeviceStatus {
        self.config.status
    }

    fn get_capabilities(&self) -> (ErrorStatus, Capabilities) {
        (ErrorStatus::None, self.config.capabilities())
    }

    fn get_supported_operations(&self, model: &Model) -> (ErrorStatus, Vec<bool>) {
        if let Err(e) = validate_model(model) {
            tracing::debug!(device = %self.config.name, error = %e, "supported-ops query on malformed model");
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return (ErrorStatus::InvalidArgument, Vec::new());
        }
        (ErrorStatus::None, self.supported_flags(model))
    }

    fn prepare_model(
        &self,
        model: &Model,
        signal: Arc<CompletionSignal>,
    ) -> (ErrorStatus, Option<PreparedModelId>) {
        if let Err(e) = validate_model(model) {
            tracing::debug!(device = %self.config.name, error = %e, "rejecting malformed model");
            return (self.reject(&signal), None);
        }
        if let Some(position) = self.supported_flags(model).iter().position(|&ok| !ok) {
            tracing::debug!(
                device = %self.config.name,
                operation = position,
                op_type = ?model.operations[position].op_type,
                "rejecting model with unsupported operation"
            );
            return (self.reject(&signal), None);
        }

        let id = PreparedModelId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match lock_arena(&self.arena) {
            Ok(mut arena) => {
                arena.insert(id, Slot::Compiling);
            }
            Err(e) => {
                tracing::error!(error = %e, "prepared-model arena unavailable");
                notify_logged(&signal, Outcome::Failure);
                return (ErrorStatus::GeneralFailure, None);
            }
        }
        self.counters.prepared.fetch_add(1, Ordering::Relaxed);

        let model = model.clone();
        let arena = Arc::clone(&self.arena);
        let faults = self.faults.clone();
        let worker_signal = Arc::clone(&signal);
        let spawned = self.spawn(&format!("prepare-{}", id.0), move || {
            let (slot, outcome) = match ExecutionPlan::compile(&model) {
                Ok(plan) => (Slot::Ready(Arc::new(plan)), Outcome::Success),
                Err(e) => {
                    tracing::warn!(prepared = %id, error = %e, "compilation failed");
                    (Slot::Failed, Outcome::Failure)
                }
            };
            match lock_arena(&arena) {
                // A slot released while compiling stays released.
                Ok(mut arena) => {
                    if let Some(entry) = arena.get_mut(&id) {
                        *entry = slot;
                    }
                }
                Err(e) => tracing::error!(error = %e, "prepared-model arena unavailable"),
            }
            if faults.silent_prepare {
                tracing::debug!(prepared = %id, "withholding preparation notification");
                return;
            }
            let outcome = faults.prepare_outcome.unwrap_or(outcome);
            tracing::trace!(prepared = %id, ?outcome, "preparation finished");
            notify_logged(&worker_signal, outcome);
        });

        if let Err(e) = spawned {
            tracing::error!(error = %e, "could not start preparation worker");
            if let Ok(mut arena) = lock_arena(&self.arena) {
                arena.remove(&id);
            }
            notify_logged(&signal, Outcome::Failure);
            return (ErrorStatus::GeneralFailure, None);
        }

        let status = self.faults.prepare_status.unwrap_or(ErrorStatus::None);
        if self.faults.drop_handle {
            // A withheld handle can never be released by the caller.
            if let Ok(mut arena) = lock_arena(&self.arena) {
                arena.remove(&id);
            }
            tracing::debug!(prepared = %id, "withholding prepared-model handle");
            return (status, None);
        }
        (status, Some(id))
    }

    fn execute(
        &self,
        prepared: PreparedModelId,
        request: &Request,
        signal: Arc<CompletionSignal>,
    ) -> ErrorStatus {
        let ready = match lock_arena(&self.arena) {
            Ok(arena) => match arena.get(&prepared) {
                Some(Slot::Ready(plan)) => Some(Arc::clone(plan)),
                other => {
                    tracing::debug!(%prepared, slot = ?other, "execute on a model that is not ready");
                    None
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "prepared-model arena unavailable");
                notify_logged(&signal, Outcome::Failure);
                return ErrorStatus::GeneralFailure;
            }
        };
        let Some(plan) = ready else {
            return self.reject(&signal);
        };

        if let Err(e) = validate_request(request, plan.model()) {
            tracing::debug!(%prepared, error = %e, "rejecting malformed request");
            return self.reject(&signal);
        }
        self.counters.executed.fetch_add(1, Ordering::Relaxed);

        let request = request.clone();
        let faults = self.faults.clone();
        let latency = self.config.execution_latency;
        let worker_signal = Arc::clone(&signal);
        let work = move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            let outcome = match plan.execute(&request) {
                Ok(()) => Outcome::Success,
                Err(e) => {
                    tracing::warn!(%prepared, error = %e, "execution failed");
                    Outcome::Failure
                }
            };
            if faults.silent_execution {
                tracing::debug!(%prepared, "withholding execution notification");
                return;
            }
            let outcome = faults.execute_outcome.unwrap_or(outcome);
            notify_logged(&worker_signal, outcome);
            if faults.double_notify {
                notify_logged(&worker_signal, outcome);
            }
        };

        // Both notifications land before `execute` returns, so the waiter
        // always observes the second one.
        if self.faults.double_notify {
            work();
            return self.faults.execute_status.unwrap_or(ErrorStatus::None);
        }

        if let Err(e) = self.spawn(&format!("execute-{}", prepared.0), work) {
            tracing::error!(error = %e, "could not start execution worker");
            notify_logged(&signal, Outcome::Failure);
            return ErrorStatus::GeneralFailure;
        }

        self.faults.execute_status.unwrap_or(ErrorStatus::None)
    }

    fn release(&self, prepared: PreparedModelId) {
        match lock_arena(&self.arena) {
            Ok(mut arena) => {
                if arena.remove(&prepared).is_some() {
                    self.counters.released.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(%prepared, "released prepared model");
                }
            }
            Err(e) => tracing::error!(error = %e, "prepared-model arena unavailable"),
        }
    }
}

impl Drop for ReferenceDevice {
    fn drop(&mut self) {
        let workers = match self.workers.get_mut() {
            Ok(workers) => std::mem::take(workers),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        };
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!(device = %self.config.name, "device worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for ReferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceDevice")
            .field("name", &self.config.name)
            .field("faults", &self.faults)
            .field("stats", &self.stats())
            .finish()
    }
}
