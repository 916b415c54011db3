//! Common test utilities
//!
//! Environments over the reference device. Every environment bounds its
//! waits so a misbehaving device fails a test instead of hanging it.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use nnhal_vts::config::HarnessConfig;
use nnhal_vts::device::{DeviceConfig, FaultPlan, ReferenceDevice};
use nnhal_vts::environment::VtsEnvironment;

pub use serial_test::serial;

/// Deadline for waits in tests; generous next to the reference device.
pub const TEST_WAIT: Duration = Duration::from_secs(5);

/// Deadline for tests that expect a signal to stay pending.
pub const SHORT_WAIT: Duration = Duration::from_millis(50);

pub fn test_config() -> HarnessConfig {
    HarnessConfig::new().with_wait_timeout(TEST_WAIT)
}

pub fn reference_env() -> VtsEnvironment {
    VtsEnvironment::reference(test_config())
}

pub fn faulty_env(faults: FaultPlan) -> VtsEnvironment {
    VtsEnvironment::with_faults(test_config(), faults)
}

/// Faulty environment whose waits give up after [`SHORT_WAIT`].
pub fn short_wait_env(faults: FaultPlan) -> VtsEnvironment {
    VtsEnvironment::with_faults(HarnessConfig::new().with_wait_timeout(SHORT_WAIT), faults)
}

/// Environment that keeps a typed handle on the device for stats.
pub fn observed_env(config: DeviceConfig) -> (VtsEnvironment, Arc<ReferenceDevice>) {
    let device = Arc::new(ReferenceDevice::new(config));
    let env = VtsEnvironment::new(device.clone(), test_config());
    (env, device)
}
