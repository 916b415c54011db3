//! Test-run context
//!
//! A [`VtsEnvironment`] is built once per run and passed explicitly to every
//! case: the device under test plus the harness configuration.

use std::fmt;
use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::device::{DeviceConfig, FaultPlan, ReferenceDevice};
use crate::error::VtsResult;
use crate::hal::Device;

#[derive(Clone)]
pub struct VtsEnvironment {
    device: Arc<dyn Device>,
    config: HarnessConfig,
}

impl VtsEnvironment {
    pub fn new(device: Arc<dyn Device>, config: HarnessConfig) -> Self {
        Self { device, config }
    }

    /// Reference CPU device with default settings.
    pub fn reference(config: HarnessConfig) -> Self {
        Self::new(Arc::new(ReferenceDevice::new(DeviceConfig::default())), config)
    }

    /// Reference CPU device that misbehaves according to `faults`.
    pub fn with_faults(config: HarnessConfig, faults: FaultPlan) -> Self {
        Self::new(
            Arc::new(ReferenceDevice::with_faults(DeviceConfig::default(), faults)),
            config,
        )
    }

    /// Reference device, configuration read from the environment.
    pub fn from_env() -> VtsResult<Self> {
        Ok(Self::reference(HarnessConfig::from_env()?))
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }
}

impl fmt::Debug for VtsEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VtsEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
