//! Harness configuration
//!
//! [`HarnessConfig`] controls how long the harness waits on completion
//! signals, how output values are compared and which cases run.

use std::time::Duration;

use crate::error::VtsResult;

pub const WAIT_TIMEOUT_ENV: &str = "NNHAL_VTS_WAIT_TIMEOUT_MS";
pub const TOLERANCE_ENV: &str = "NNHAL_VTS_TOLERANCE";
pub const FILTER_ENV: &str = "NNHAL_VTS_FILTER";

/// Wait bound the command-line runner uses when neither a flag nor the
/// environment sets one.
pub const DEFAULT_CLI_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Upper bound on every completion-signal wait; `None` waits forever
    pub wait_timeout: Option<Duration>,

    /// Absolute tolerance for float output comparison; `0.0` is exact
    pub tolerance: f32,

    /// Only run cases whose name contains this substring
    pub case_filter: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            wait_timeout: None,
            tolerance: 0.0,
            case_filter: None,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Set `timeout` only when no wait bound is configured yet.
    pub fn or_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout.get_or_insert(timeout);
        self
    }

    /// Negative or NaN values are rejected by [`validate`](Self::validate).
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_case_filter(mut self, filter: impl Into<String>) -> Self {
        self.case_filter = Some(filter.into());
        self
    }

    /// Defaults overridden by `NNHAL_VTS_WAIT_TIMEOUT_MS`,
    /// `NNHAL_VTS_TOLERANCE` and `NNHAL_VTS_FILTER`.
    pub fn from_env() -> VtsResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(WAIT_TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                crate::config_error!("{}={:?} is not a millisecond count", WAIT_TIMEOUT_ENV, raw)
            })?;
            config.wait_timeout = Some(Duration::from_millis(millis));
        }

        if let Ok(raw) = std::env::var(TOLERANCE_ENV) {
            config.tolerance = raw
                .trim()
                .parse()
                .map_err(|_| crate::config_error!("{}={:?} is not a number", TOLERANCE_ENV, raw))?;
        }

        if let Ok(filter) = std::env::var(FILTER_ENV) {
            if !filter.is_empty() {
                config.case_filter = Some(filter);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VtsResult<()> {
        if !(self.tolerance >= 0.0) || !self.tolerance.is_finite() {
            return Err(crate::config_error!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            ));
        }
        if self.wait_timeout == Some(Duration::ZERO) {
            return Err(crate::config_error!("wait timeout must be positive"));
        }
        Ok(())
    }

    /// True if the case named `name` is selected by the filter.
    pub fn selects(&self, name: &str) -> bool {
        match &self.case_filter {
            Some(filter) => name.contains(filter.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VtsError;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(WAIT_TIMEOUT_ENV);
        std::env::remove_var(TOLERANCE_ENV);
        std::env::remove_var(FILTER_ENV);
    }

    #[test]
    fn test_fallback_wait_timeout_keeps_explicit_bound() {
        let unbounded = HarnessConfig::default().or_wait_timeout(DEFAULT_CLI_WAIT_TIMEOUT);
        assert_eq!(unbounded.wait_timeout, Some(Duration::from_secs(10)));

        let explicit = HarnessConfig::new()
            .with_wait_timeout(Duration::from_millis(250))
            .or_wait_timeout(DEFAULT_CLI_WAIT_TIMEOUT);
        assert_eq!(explicit.wait_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_default_harness_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.wait_timeout, None);
        assert_eq!(config.tolerance, 0.0);
        assert!(config.selects("anything"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = HarnessConfig::new()
            .with_wait_timeout(Duration::from_millis(250))
            .with_tolerance(1e-5)
            .with_case_filter("execute");
        assert_eq!(config.wait_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.tolerance, 1e-5);
        assert!(config.selects("simple_execute_graph_positive"));
        assert!(!config.selects("status"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(HarnessConfig::new().with_tolerance(-1.0).validate().is_err());
        assert!(HarnessConfig::new().with_tolerance(f32::NAN).validate().is_err());
        assert!(HarnessConfig::new()
            .with_wait_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var(WAIT_TIMEOUT_ENV, "1500");
        std::env::set_var(TOLERANCE_ENV, "0.001");
        std::env::set_var(FILTER_ENV, "generated");
        let config = HarnessConfig::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.wait_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.tolerance, 0.001);
        assert_eq!(config.case_filter.as_deref(), Some("generated"));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        clear_env();
        std::env::set_var(WAIT_TIMEOUT_ENV, "soon");
        let result = HarnessConfig::from_env();
        clear_env();
        assert!(matches!(result, Err(VtsError::InvalidConfiguration(_))));
    }

    #[test]
    #[serial]
    fn test_from_env_unset_is_default() {
        clear_env();
        assert_eq!(HarnessConfig::from_env().unwrap(), HarnessConfig::default());
    }
}
