//! Lifecycle driver against the reference device, with and without faults

mod common;

use common::{faulty_env, observed_env, reference_env, short_wait_env};
use nnhal_vts::device::{DeviceConfig, FaultPlan};
use nnhal_vts::fixtures::{
    create_valid_test_model, create_valid_test_request, ModelFixture, RequestFixture,
    VALID_EXPECTED,
};
use nnhal_vts::hal::ErrorStatus;
use nnhal_vts::signal::{Outcome, SignalStatus};
use nnhal_vts::values::TypedValues;
use nnhal_vts::verify::read_output;
use nnhal_vts::{LifecycleDriver, LifecycleState, VtsError};
use std::time::Duration;

// ========== Preparation acceptance ==========

#[test]
fn test_valid_model_is_accepted() -> anyhow::Result<()> {
    let env = reference_env();
    let mut driver = LifecycleDriver::new(&env);
    let report = driver.prepare(&create_valid_test_model())?;

    assert_eq!(report.status, ErrorStatus::None);
    assert_eq!(report.signal, Some(SignalStatus::Success));
    assert!(report.handle.is_some());
    assert!(report.accepted());
    assert_eq!(driver.state(), LifecycleState::Compiled);
    Ok(())
}

#[test]
fn test_every_invalid_model_fails_preparation() -> anyhow::Result<()> {
    let env = reference_env();
    for fixture in ModelFixture::ALL.into_iter().filter(|f| *f != ModelFixture::Valid) {
        let mut driver = LifecycleDriver::new(&env);
        let report = driver.prepare(&fixture.build())?;
        assert_eq!(
            report.status,
            ErrorStatus::InvalidArgument,
            "fixture {}",
            fixture.name()
        );
        assert!(!report.accepted(), "fixture {}", fixture.name());
        assert_eq!(driver.state(), LifecycleState::CompileFailed);
    }
    Ok(())
}

#[test]
fn test_failed_sync_status_is_not_accepted() -> anyhow::Result<()> {
    let env = faulty_env(FaultPlan::none().with_prepare_status(ErrorStatus::GeneralFailure));
    let mut driver = LifecycleDriver::new(&env);
    let report = driver.prepare(&create_valid_test_model())?;

    assert_eq!(report.status, ErrorStatus::GeneralFailure);
    assert_eq!(report.signal, None);
    assert!(!report.accepted());
    assert_eq!(driver.prepared(), None);
    Ok(())
}

#[test]
fn test_missing_handle_is_not_accepted() -> anyhow::Result<()> {
    let env = faulty_env(FaultPlan::none().with_dropped_handle());
    let mut driver = LifecycleDriver::new(&env);
    let report = driver.prepare(&create_valid_test_model())?;

    assert_eq!(report.status, ErrorStatus::None);
    assert_eq!(report.signal, Some(SignalStatus::Success));
    assert_eq!(report.handle, None);
    assert!(!report.accepted());
    assert_eq!(driver.state(), LifecycleState::CompileFailed);
    Ok(())
}

#[test]
fn test_failed_signal_is_not_accepted() -> anyhow::Result<()> {
    let env = faulty_env(FaultPlan::none().with_prepare_outcome(Outcome::Failure));
    let mut driver = LifecycleDriver::new(&env);
    let report = driver.prepare(&create_valid_test_model())?;

    assert_eq!(report.status, ErrorStatus::None);
    assert_eq!(report.signal, Some(SignalStatus::Failure));
    assert!(report.handle.is_some());
    assert!(!report.accepted());
    Ok(())
}

#[test]
fn test_silent_preparation_times_out() -> anyhow::Result<()> {
    let env = short_wait_env(FaultPlan::none().with_silent_prepare());
    let mut driver = LifecycleDriver::new(&env);
    let report = driver.prepare(&create_valid_test_model())?;

    assert_eq!(report.signal, Some(SignalStatus::Timeout));
    assert!(!report.accepted());
    assert_eq!(driver.state(), LifecycleState::CompileFailed);
    Ok(())
}

// ========== Execution ==========

#[test]
fn test_valid_request_produces_expected_output() -> anyhow::Result<()> {
    let env = reference_env();
    let model = create_valid_test_model();
    let mut driver = LifecycleDriver::new(&env);
    assert!(driver.prepare(&model)?.accepted());

    let request = create_valid_test_request()?;
    let report = driver.execute(&request)?;
    assert_eq!(report.status, ErrorStatus::None);
    assert_eq!(report.signal, SignalStatus::Success);
    assert_eq!(driver.state(), LifecycleState::Executed);

    let output = read_output(&model, &request, 0)?;
    assert_eq!(output, TypedValues::Float32(VALID_EXPECTED.to_vec()));
    Ok(())
}

#[test]
fn test_malformed_requests_fail_with_terminal_signal() -> anyhow::Result<()> {
    let env = reference_env();
    for fixture in RequestFixture::MALFORMED {
        let mut driver = LifecycleDriver::new(&env);
        assert!(driver.prepare(&create_valid_test_model())?.accepted());

        let report = driver.execute(&fixture.build()?)?;
        assert_eq!(
            report.status,
            fixture.expected_execute_status(),
            "fixture {}",
            fixture.name()
        );
        assert!(report.signal.is_terminal(), "fixture {}", fixture.name());
        assert_eq!(driver.state(), LifecycleState::ExecuteFailed);
    }
    Ok(())
}

#[test]
fn test_oversized_request_dimensions_fail_with_terminal_signal() -> anyhow::Result<()> {
    let env = reference_env();
    let mut model = create_valid_test_model();
    model.operands[0].dimensions = vec![0; 4];
    let mut driver = LifecycleDriver::new(&env);
    assert!(driver.prepare(&model)?.accepted());

    let mut request = create_valid_test_request()?;
    request.inputs[0].dimensions = vec![u32::MAX; 4];
    let report = driver.execute(&request)?;
    assert_eq!(report.status, ErrorStatus::InvalidArgument);
    assert!(report.signal.is_terminal());
    assert!(!report.succeeded());
    Ok(())
}

#[test]
fn test_execute_again_after_failure() -> anyhow::Result<()> {
    let env = reference_env();
    let mut driver = LifecycleDriver::new(&env);
    assert!(driver.prepare(&create_valid_test_model())?.accepted());

    let failed = driver.execute(&RequestFixture::UndersizedPool.build()?)?;
    assert!(!failed.succeeded());

    let report = driver.execute(&create_valid_test_request()?)?;
    assert!(report.succeeded());
    Ok(())
}

#[test]
fn test_silent_execution_times_out() -> anyhow::Result<()> {
    let env = short_wait_env(FaultPlan::none().with_silent_execution());
    let mut driver = LifecycleDriver::new(&env);
    assert!(driver.prepare(&create_valid_test_model())?.accepted());

    let report = driver.execute(&create_valid_test_request()?)?;
    assert_eq!(report.status, ErrorStatus::None);
    assert_eq!(report.signal, SignalStatus::Timeout);
    assert!(!report.succeeded());
    assert_eq!(driver.state(), LifecycleState::ExecuteFailed);
    Ok(())
}

#[test]
fn test_sync_failure_with_successful_signal_is_a_failure() -> anyhow::Result<()> {
    let env = faulty_env(FaultPlan::none().with_execute_status(ErrorStatus::GeneralFailure));
    let mut driver = LifecycleDriver::new(&env);
    assert!(driver.prepare(&create_valid_test_model())?.accepted());

    let report = driver.execute(&create_valid_test_request()?)?;
    assert_eq!(report.status, ErrorStatus::GeneralFailure);
    assert_eq!(report.signal, SignalStatus::Success);
    assert!(!report.succeeded());
    Ok(())
}

#[test]
fn test_double_notification_is_fatal() -> anyhow::Result<()> {
    let env = faulty_env(FaultPlan::none().with_double_notify());
    let mut driver = LifecycleDriver::new(&env);
    assert!(driver.prepare(&create_valid_test_model())?.accepted());

    let err = driver.execute(&create_valid_test_request()?).unwrap_err();
    assert!(matches!(err, VtsError::SignalMisuse(_)));
    assert!(err.is_fatal());
    Ok(())
}

// ========== Resource release ==========

#[test]
fn test_prepared_model_released_with_driver() -> anyhow::Result<()> {
    let (env, device) = observed_env(
        DeviceConfig::default().with_execution_latency(Duration::from_millis(1)),
    );
    {
        let mut driver = LifecycleDriver::new(&env);
        assert!(driver.prepare(&create_valid_test_model())?.accepted());
        assert!(driver.execute(&create_valid_test_request()?)?.succeeded());
        assert_eq!(device.stats().live, 1);
    }

    let stats = device.stats();
    assert_eq!(stats.prepared, 1);
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.live, 0);
    Ok(())
}
