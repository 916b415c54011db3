//! Environment-driven configuration

mod common;

use common::serial;
use nnhal_vts::config::{FILTER_ENV, TOLERANCE_ENV, WAIT_TIMEOUT_ENV};
use nnhal_vts::suite::ConformanceSuite;
use nnhal_vts::{VtsEnvironment, VtsError};
use std::time::Duration;

fn clear_env() {
    std::env::remove_var(WAIT_TIMEOUT_ENV);
    std::env::remove_var(TOLERANCE_ENV);
    std::env::remove_var(FILTER_ENV);
}

#[test]
#[serial]
fn test_environment_reads_harness_settings() -> anyhow::Result<()> {
    clear_env();
    std::env::set_var(WAIT_TIMEOUT_ENV, "2500");
    std::env::set_var(TOLERANCE_ENV, "0.001");
    std::env::set_var(FILTER_ENV, "supported_operations");
    let env = VtsEnvironment::from_env();
    clear_env();

    let env = env?;
    assert_eq!(env.config().wait_timeout, Some(Duration::from_millis(2500)));
    assert_eq!(env.config().tolerance, 0.001);

    let report = ConformanceSuite::standard().run(&env);
    assert!(report
        .cases
        .iter()
        .all(|c| c.name.contains("supported_operations")));
    assert_eq!(report.exit_code(), 0);
    Ok(())
}

#[test]
#[serial]
fn test_environment_rejects_bad_settings() {
    clear_env();
    std::env::set_var(TOLERANCE_ENV, "-1");
    let negative = VtsEnvironment::from_env();
    std::env::set_var(TOLERANCE_ENV, "tight");
    let garbage = VtsEnvironment::from_env();
    clear_env();
    std::env::set_var(WAIT_TIMEOUT_ENV, "0");
    let zero = VtsEnvironment::from_env();
    clear_env();

    for result in [negative, garbage, zero] {
        assert!(matches!(result, Err(VtsError::InvalidConfiguration(_))));
    }
}

#[test]
#[serial]
fn test_empty_filter_selects_everything() -> anyhow::Result<()> {
    clear_env();
    std::env::set_var(FILTER_ENV, "");
    let env = VtsEnvironment::from_env();
    clear_env();

    assert_eq!(env?.config().case_filter, None);
    Ok(())
}
