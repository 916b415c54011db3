//! Configuration for the reference CPU device

use std::time::Duration;

use crate::hal::{
    Capabilities, DeviceStatus, OperandType, OperationTuple, OperationType, PerformanceInfo,
};

/// Operation types the reference device can execute on float32 tensors.
pub const DEFAULT_OPERATIONS: [OperationType; 4] = [
    OperationType::Add,
    OperationType::Mul,
    OperationType::Relu,
    OperationType::Relu6,
];

/// Configuration for the reference CPU device
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Name used for worker threads and log fields
    pub name: String,

    /// What `get_status` reports
    pub status: DeviceStatus,

    /// Supported (operation, operand type) pairs
    pub supported: Vec<OperationTuple>,

    /// Reported float32 performance
    pub float32_performance: PerformanceInfo,

    /// Reported quantized performance
    pub quantized8_performance: PerformanceInfo,

    pub caches_compilation: bool,

    /// Extra time every execution worker sleeps before computing
    pub execution_latency: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: "reference-cpu".to_string(),
            status: DeviceStatus::Available,
            supported: DEFAULT_OPERATIONS
                .iter()
                .map(|&operation_type| OperationTuple {
                    operation_type,
                    operand_type: OperandType::TensorFloat32,
                })
                .collect(),
            float32_performance: PerformanceInfo::new(1.0, 1.0),
            quantized8_performance: PerformanceInfo::new(1.0, 1.0),
            caches_compilation: false,
            execution_latency: Duration::ZERO,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Replace the supported set with `operations` on float32 tensors.
    pub fn with_supported_operations(mut self, operations: &[OperationType]) -> Self {
        self.supported = operations
            .iter()
            .map(|&operation_type| OperationTuple {
                operation_type,
                operand_type: OperandType::TensorFloat32,
            })
            .collect();
        self
    }

    pub fn with_caches_compilation(mut self, caches_compilation: bool) -> Self {
        self.caches_compilation = caches_compilation;
        self
    }

    pub fn with_execution_latency(mut self, latency: Duration) -> Self {
        self.execution_latency = latency;
        self
    }

    /// Capabilities answered by `get_capabilities`.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            supported_operation_tuples: self.supported.clone(),
            caches_compilation: self.caches_compilation,
            float32_performance: self.float32_performance,
            quantized8_performance: self.quantized8_performance,
        }
    }
}
