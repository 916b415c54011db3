//! Reference CPU device
//!
//! A host implementation of the [`Device`](crate::hal::Device) contract that
//! the harness and its tests run against. [`FaultPlan`] makes it break
//! individual clauses of the contract on purpose.

pub mod config;
pub mod faults;
pub mod plan;
pub mod reference;

pub use config::{DeviceConfig, DEFAULT_OPERATIONS};
pub use faults::FaultPlan;
pub use plan::ExecutionPlan;
pub use reference::{DeviceStats, ReferenceDevice};
