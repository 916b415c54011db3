//! Status codes and capability descriptors reported by a device.

use serde::Serialize;
use std::fmt;

use crate::hal::model::{OperandType, OperationType};

/// Outcome attached to every device entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorStatus {
    /// Success
    None,
    DeviceUnavailable,
    GeneralFailure,
    OutputInsufficientSize,
    InvalidArgument,
}

impl ErrorStatus {
    pub fn is_ok(self) -> bool {
        self == ErrorStatus::None
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorStatus::None => "NONE",
            ErrorStatus::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            ErrorStatus::GeneralFailure => "GENERAL_FAILURE",
            ErrorStatus::OutputInsufficientSize => "OUTPUT_INSUFFICIENT_SIZE",
            ErrorStatus::InvalidArgument => "INVALID_ARGUMENT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceStatus {
    Available,
    Busy,
    Offline,
    Unknown,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceStatus::Available => "AVAILABLE",
            DeviceStatus::Busy => "BUSY",
            DeviceStatus::Offline => "OFFLINE",
            DeviceStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Relative performance estimate (lower is better, must be positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceInfo {
    pub exec_time: f32,
    pub power_usage: f32,
}

impl PerformanceInfo {
    pub fn new(exec_time: f32, power_usage: f32) -> Self {
        Self {
            exec_time,
            power_usage,
        }
    }

    /// Both figures strictly positive (NaN fails).
    pub fn is_positive(&self) -> bool {
        self.exec_time > 0.0 && self.power_usage > 0.0
    }
}

/// One (operation, operand type) pair the device can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OperationTuple {
    pub operation_type: OperationType,
    pub operand_type: OperandType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    pub supported_operation_tuples: Vec<OperationTuple>,
    pub caches_compilation: bool,
    pub float32_performance: PerformanceInfo,
    pub quantized8_performance: PerformanceInfo,
}

impl Capabilities {
    pub fn supports(&self, operation_type: OperationType, operand_type: OperandType) -> bool {
        self.supported_operation_tuples
            .iter()
            .any(|t| t.operation_type == operation_type && t.operand_type == operand_type)
    }
}
