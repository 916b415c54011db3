//! End-to-end suite runs

mod common;

use common::{faulty_env, observed_env, reference_env, test_config};
use nnhal_vts::device::{DeviceConfig, FaultPlan};
use nnhal_vts::fixtures::{all_generated_cases, ModelFixture, RequestFixture};
use nnhal_vts::hal::OperationType;
use nnhal_vts::signal::Outcome;
use nnhal_vts::suite::{ConformanceCase, ConformanceSuite, Verdict};
use nnhal_vts::verify::Checks;
use nnhal_vts::{HarnessConfig, ReferenceDevice, VtsEnvironment};
use std::sync::Arc;

#[test]
fn test_standard_suite_passes_on_reference_device() {
    let report = ConformanceSuite::standard().run(&reference_env());

    let failed: Vec<_> = report
        .cases
        .iter()
        .filter(|c| c.verdict != Verdict::Passed)
        .collect();
    assert!(failed.is_empty(), "cases did not pass: {:#?}", failed);
    assert!(!report.aborted);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_standard_suite_lists_every_fixture() {
    let suite = ConformanceSuite::standard();
    let names = suite.names();

    let expected = 4
        + ModelFixture::MALFORMED.len()
        + 2
        + (ModelFixture::ALL.len() - 1)
        + 1
        + RequestFixture::MALFORMED.len()
        + all_generated_cases().len();
    assert_eq!(names.len(), expected);
    assert!(names.contains(&"simple_prepare_model_negative_test_unsupported"));
    assert!(names.contains(&"simple_execute_graph_negative_test_undersized_pool"));
    assert!(names.contains(&"generated_add_then_relu"));
}

#[test]
fn test_suite_releases_every_prepared_model() {
    let (env, device) = observed_env(DeviceConfig::default());
    let report = ConformanceSuite::standard().run(&env);
    assert_eq!(report.exit_code(), 0);

    let stats = device.stats();
    assert!(stats.prepared > 0);
    assert_eq!(stats.released, stats.prepared);
    assert_eq!(stats.live, 0);
}

#[test]
fn test_failing_executions_fail_the_run() {
    let env = faulty_env(FaultPlan::none().with_execute_outcome(Outcome::Failure));
    let report = ConformanceSuite::standard().run(&env);

    assert!(!report.aborted);
    assert_eq!(report.exit_code(), 1);
    let positive = report.case("simple_execute_graph_positive_test").unwrap();
    assert_eq!(positive.verdict, Verdict::Failed);
    assert!(positive.failures[0].contains("execution signal"));
    // Rejections do not depend on the worker's outcome.
    assert_eq!(
        report
            .case("simple_execute_graph_negative_test_dimension_mismatch")
            .unwrap()
            .verdict,
        Verdict::Passed
    );
}

#[test]
fn test_double_notification_aborts_the_run() {
    let env = faulty_env(FaultPlan::none().with_double_notify());
    let report = ConformanceSuite::standard().run(&env);

    assert!(report.aborted);
    assert!(report.abort_reason.is_some());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(
        report.case("simple_prepare_model_positive_test").unwrap().verdict,
        Verdict::Passed
    );
    assert_eq!(
        report.case("simple_execute_graph_positive_test").unwrap().verdict,
        Verdict::Aborted
    );
    assert_eq!(
        report.case("generated_mul").unwrap().verdict,
        Verdict::Skipped
    );
}

#[test]
fn test_missing_operation_fails_only_dependent_cases() {
    let device_config = DeviceConfig::default().with_supported_operations(&[
        OperationType::Add,
        OperationType::Relu,
        OperationType::Relu6,
    ]);
    let (env, _device) = observed_env(device_config);
    let report = ConformanceSuite::standard().run(&env);

    assert_eq!(report.case("generated_mul").unwrap().verdict, Verdict::Failed);
    assert_eq!(
        report.case("generated_add_relu").unwrap().verdict,
        Verdict::Passed
    );
    assert_eq!(report.count(Verdict::Failed), 1);
}

#[test]
fn test_unsupported_cases_follow_advertised_capabilities() {
    let device_config = DeviceConfig::default().with_supported_operations(&[
        OperationType::Add,
        OperationType::Mul,
        OperationType::Relu,
        OperationType::Relu1,
        OperationType::Relu6,
    ]);
    let device = Arc::new(ReferenceDevice::new(device_config));
    let env = VtsEnvironment::new(device, test_config().with_case_filter("unsupported"));
    let report = ConformanceSuite::standard().run(&env);

    assert_eq!(report.cases.len(), 2);
    assert_eq!(report.count(Verdict::Passed), 2, "{:#?}", report.cases);
}

#[test]
fn test_filter_and_json_report() -> anyhow::Result<()> {
    let env = VtsEnvironment::reference(HarnessConfig::new().with_case_filter("generated_"));
    let report = ConformanceSuite::standard().run(&env);
    assert_eq!(report.cases.len(), all_generated_cases().len());

    let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
    assert_eq!(json["aborted"], false);
    assert_eq!(json["cases"][0]["verdict"], "passed");
    assert!(json["cases"][0]["checks"].as_u64().unwrap() > 0);
    Ok(())
}

#[test]
fn test_custom_case_runs_in_order() {
    let suite = ConformanceSuite::new(vec![
        ConformanceCase::new("passes", |_, checks: &mut Checks| {
            checks.expect_true("always", true);
            Ok(())
        }),
        ConformanceCase::new("fails", |_, checks: &mut Checks| {
            checks.expect_eq("answer", 41, 42);
            Ok(())
        }),
    ]);
    let report = suite.run(&reference_env());

    assert_eq!(report.cases[0].verdict, Verdict::Passed);
    assert_eq!(report.cases[1].verdict, Verdict::Failed);
    assert_eq!(report.cases[1].failures, vec!["answer: expected 42, got 41"]);
}
