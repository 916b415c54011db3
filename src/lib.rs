//! nnhal-vts - conformance harness for neural-network accelerator devices
//!
//! Drives a [`hal::Device`] through its two-phase contract (prepare a model,
//! then execute requests against the prepared model) and checks every
//! observable outcome: synchronous status codes, asynchronous completion
//! signals and the bytes written into shared output pools.
//!
//! A reference CPU device ([`device::ReferenceDevice`]) implements the
//! contract in-process, with injectable faults for exercising the harness
//! itself.

#![allow(clippy::new_without_default)] // Builders mirror the config types
#![allow(clippy::neg_cmp_op_on_partial_ord)] // NaN-aware float comparisons

pub mod config;
pub mod device;
pub mod driver;
pub mod environment;
pub mod error;
pub mod fixtures;
pub mod hal;
pub mod logging;
pub mod memory;
pub mod signal;
pub mod suite;
pub mod values;
pub mod verify;

pub use config::HarnessConfig;
pub use device::{DeviceConfig, FaultPlan, ReferenceDevice};
pub use driver::{ExecuteReport, LifecycleDriver, LifecycleState, PrepareReport};
pub use environment::VtsEnvironment;
pub use error::{ErrorCategory, VtsError, VtsResult};
pub use memory::SharedMemory;
pub use signal::{CompletionSignal, Outcome, SignalStatus};
pub use suite::{ConformanceSuite, SuiteReport, Verdict};
pub use verify::Checks;
