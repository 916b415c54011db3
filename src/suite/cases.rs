//! The conformance cases
//!
//! Every case is a function of the environment that records its assertions
//! into a [`Checks`] value. Cases that need a compiled model go through
//! [`prepare_or_halt`], which enforces the compiled-handle acceptance rule
//! clause by clause.

use std::fmt;
use std::sync::Arc;

use crate::driver::LifecycleDriver;
use crate::environment::VtsEnvironment;
use crate::error::VtsResult;
use crate::fixtures::{
    build_request, create_valid_test_model, create_valid_test_request, GeneratedCase,
    ModelFixture, RequestFixture, VALID_EXPECTED,
};
use crate::hal::{DeviceStatus, ErrorStatus, Model};
use crate::signal::SignalStatus;
use crate::values::TypedValues;
use crate::verify::{self, compare_values, Checks};

type CaseBody = dyn Fn(&VtsEnvironment, &mut Checks) -> VtsResult<()> + Send + Sync;

/// A named case of the suite
#[derive(Clone)]
pub struct ConformanceCase {
    name: String,
    body: Arc<CaseBody>,
}

impl ConformanceCase {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&VtsEnvironment, &mut Checks) -> VtsResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, env: &VtsEnvironment, checks: &mut Checks) -> VtsResult<()> {
        (self.body)(env, checks)
    }
}

impl fmt::Debug for ConformanceCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConformanceCase")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Prepare `model` and halt the case unless the status is `NONE`, the signal
/// resolved `SUCCESS` and a handle came back.
pub fn prepare_or_halt(
    driver: &mut LifecycleDriver<'_>,
    model: &Model,
    checks: &mut Checks,
) -> VtsResult<()> {
    let report = driver.prepare(model)?;
    checks.require_status("prepare_model status", report.status, ErrorStatus::None)?;
    checks.require_eq(
        "preparation signal",
        report.signal,
        Some(SignalStatus::Success),
    )?;
    checks.require_true("prepared model handle present", report.handle.is_some())
}

// ========== Device queries ==========

pub fn create_device(env: &VtsEnvironment, _checks: &mut Checks) -> VtsResult<()> {
    tracing::debug!(?env, "device handle acquired");
    Ok(())
}

pub fn status_test(env: &VtsEnvironment, checks: &mut Checks) -> VtsResult<()> {
    checks.expect_eq("device status", env.device().get_status(), DeviceStatus::Available);
    Ok(())
}

pub fn get_capabilities_test(env: &VtsEnvironment, checks: &mut Checks) -> VtsResult<()> {
    let (status, caps) = env.device().get_capabilities();
    checks.expect_status("get_capabilities status", status, ErrorStatus::None);
    checks.expect_true(
        "supported operation tuples non-empty",
        !caps.supported_operation_tuples.is_empty(),
    );
    checks.expect_true(
        "float32 exec_time > 0",
        caps.float32_performance.exec_time > 0.0,
    );
    checks.expect_true(
        "float32 power_usage > 0",
        caps.float32_performance.power_usage > 0.0,
    );
    checks.expect_true(
        "quantized8 exec_time > 0",
        caps.quantized8_performance.exec_time > 0.0,
    );
    checks.expect_true(
        "quantized8 power_usage > 0",
        caps.quantized8_performance.power_usage > 0.0,
    );
    Ok(())
}

pub fn supported_operations_positive_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
) -> VtsResult<()> {
    let model = create_valid_test_model();
    let (status, supported) = env.device().get_supported_operations(&model);
    checks.expect_status("get_supported_operations status", status, ErrorStatus::None);
    checks.expect_eq(
        "support vector length",
        supported.len(),
        model.operation_count(),
    );
    Ok(())
}

pub fn supported_operations_negative_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
    fixture: ModelFixture,
) -> VtsResult<()> {
    let model = fixture.build();
    let (status, _) = env.device().get_supported_operations(&model);
    checks.expect_status(
        "get_supported_operations status",
        status,
        fixture.expected_supported_status(),
    );
    Ok(())
}

/// A well-formed model the device cannot run is answered, with a `false`
/// entry for the operation it lacks.
pub fn supported_operations_unsupported_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
) -> VtsResult<()> {
    let model = ModelFixture::Unsupported.build();
    let (status, supported) = env.device().get_supported_operations(&model);
    checks.require_status("get_supported_operations status", status, ErrorStatus::None)?;
    checks.expect_eq(
        "support vector length",
        supported.len(),
        model.operation_count(),
    );
    if advertises_every_operation(env, &model) {
        checks.expect_true(
            "every advertised operation reported supported",
            supported.iter().all(|&ok| ok),
        );
    } else {
        checks.expect_true("an operation is reported unsupported", supported.contains(&false));
    }
    Ok(())
}

/// Whether the device's capabilities list every (operation, primary operand
/// type) pair of `model`. A device that advertises the RELU1 fixture's
/// operation must run it.
fn advertises_every_operation(env: &VtsEnvironment, model: &Model) -> bool {
    let (status, caps) = env.device().get_capabilities();
    status == ErrorStatus::None
        && model.operations.iter().all(|operation| {
            operation
                .inputs
                .first()
                .and_then(|&index| model.operand(index))
                .is_some_and(|operand| caps.supports(operation.op_type, operand.operand_type))
        })
}

// ========== Preparation ==========

pub fn simple_prepare_model_positive_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
) -> VtsResult<()> {
    let mut driver = LifecycleDriver::new(env);
    let report = driver.prepare(&create_valid_test_model())?;
    checks.expect_status("prepare_model status", report.status, ErrorStatus::None);
    checks.expect_true("prepared model accepted", report.accepted());
    Ok(())
}

pub fn simple_prepare_model_negative_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
    fixture: ModelFixture,
) -> VtsResult<()> {
    let model = fixture.build();
    let mut driver = LifecycleDriver::new(env);
    let report = driver.prepare(&model)?;
    if fixture == ModelFixture::Unsupported && advertises_every_operation(env, &model) {
        tracing::debug!("device advertises the unsupported fixture's operations");
        checks.expect_status("prepare_model status", report.status, ErrorStatus::None);
        checks.expect_true("advertised model accepted", report.accepted());
        return Ok(());
    }
    checks.expect_status(
        "prepare_model status",
        report.status,
        fixture.expected_prepare_status(),
    );
    checks.expect_true("malformed model not accepted", !report.accepted());
    Ok(())
}

// ========== Execution ==========

pub fn simple_execute_graph_positive_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
) -> VtsResult<()> {
    let model = create_valid_test_model();
    let mut driver = LifecycleDriver::new(env);
    prepare_or_halt(&mut driver, &model, checks)?;

    let request = create_valid_test_request()?;
    let report = driver.execute(&request)?;
    checks.expect_status("execute status", report.status, ErrorStatus::None);
    checks.require_eq("execution signal", report.signal, SignalStatus::Success)?;

    let output = verify::read_output(&model, &request, 0)?;
    let expected = TypedValues::Float32(VALID_EXPECTED.to_vec());
    if let Err(mismatch) = compare_values(&output, &expected, env.config().tolerance) {
        checks.fail(format!("output 0: {}", mismatch));
    }
    Ok(())
}

pub fn simple_execute_graph_negative_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
    fixture: RequestFixture,
) -> VtsResult<()> {
    let mut driver = LifecycleDriver::new(env);
    prepare_or_halt(&mut driver, &create_valid_test_model(), checks)?;

    let request = fixture.build()?;
    let report = driver.execute(&request)?;
    verify::verify_execution_failure(checks, &report, fixture.expected_execute_status());
    Ok(())
}

/// Prepare the case's model once, then execute and verify every example.
pub fn generated_test(
    env: &VtsEnvironment,
    checks: &mut Checks,
    case: &GeneratedCase,
) -> VtsResult<()> {
    let model = (case.create_model)();
    let mut driver = LifecycleDriver::new(env);
    prepare_or_halt(&mut driver, &model, checks)?;

    for (number, example) in case.examples.iter().enumerate() {
        let request = build_request(&model, example)?;
        let report = driver.execute(&request)?;
        let status_ok = checks.expect_status(
            &format!("example {} execute status", number),
            report.status,
            ErrorStatus::None,
        );
        let signal_ok = checks.expect_eq(
            &format!("example {} execution signal", number),
            report.signal,
            SignalStatus::Success,
        );
        if status_ok && signal_ok {
            verify::verify_outputs(
                checks,
                &model,
                &request,
                &example.outputs,
                case.is_ignored,
                env.config().tolerance,
            )?;
        }
    }
    Ok(())
}
