//! Synchronous device queries: status, capabilities, supported operations

mod common;

use common::reference_env;
use nnhal_vts::device::DeviceConfig;
use nnhal_vts::environment::VtsEnvironment;
use nnhal_vts::fixtures::{create_valid_test_model, ModelFixture};
use nnhal_vts::hal::{DeviceStatus, ErrorStatus, OperandType, OperationType};
use nnhal_vts::{HarnessConfig, ReferenceDevice};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_reference_device_is_available() {
    let env = reference_env();
    assert_eq!(env.device().get_status(), DeviceStatus::Available);
}

#[test]
fn test_capabilities_are_positive_and_non_empty() {
    let env = reference_env();
    let (status, caps) = env.device().get_capabilities();
    assert_eq!(status, ErrorStatus::None);
    assert!(!caps.supported_operation_tuples.is_empty());
    assert!(caps.float32_performance.is_positive());
    assert!(caps.quantized8_performance.is_positive());
    assert!(caps.supports(OperationType::Add, OperandType::TensorFloat32));
    assert!(!caps.supports(OperationType::Relu1, OperandType::TensorFloat32));
}

#[test]
fn test_supported_operations_one_flag_per_operation() {
    let env = reference_env();
    let model = create_valid_test_model();
    let (status, supported) = env.device().get_supported_operations(&model);
    assert_eq!(status, ErrorStatus::None);
    assert_eq!(supported, vec![true; model.operation_count()]);
}

#[test]
fn test_supported_operations_rejects_every_malformed_fixture() {
    let env = reference_env();
    for fixture in ModelFixture::MALFORMED {
        let (status, supported) = env.device().get_supported_operations(&fixture.build());
        assert_eq!(
            status,
            ErrorStatus::InvalidArgument,
            "fixture {}",
            fixture.name()
        );
        assert!(supported.is_empty(), "fixture {}", fixture.name());
    }
}

#[test]
fn test_oversized_constant_is_rejected_without_panicking() {
    let env = reference_env();
    let mut model = create_valid_test_model();
    model.operands[1].dimensions = vec![u32::MAX; 4];
    let (status, supported) = env.device().get_supported_operations(&model);
    assert_eq!(status, ErrorStatus::InvalidArgument);
    assert!(supported.is_empty());
}

#[test]
fn test_unsupported_model_is_answered_with_false() {
    let env = reference_env();
    let model = ModelFixture::Unsupported.build();
    let (status, supported) = env.device().get_supported_operations(&model);
    assert_eq!(status, ErrorStatus::None);
    assert_eq!(supported.len(), model.operation_count());
    assert!(supported.contains(&false));
}

#[test]
fn test_restricted_device_reports_missing_operation() {
    let device = ReferenceDevice::new(
        DeviceConfig::default().with_supported_operations(&[OperationType::Mul]),
    );
    let env = VtsEnvironment::new(Arc::new(device), HarnessConfig::default());
    let (status, supported) = env
        .device()
        .get_supported_operations(&create_valid_test_model());
    assert_eq!(status, ErrorStatus::None);
    assert_eq!(supported, vec![false]);
}

proptest! {
    #[test]
    fn prop_operand_reference_past_the_end_is_rejected(extra in 0u32..1_000) {
        let env = reference_env();
        let mut model = create_valid_test_model();
        model.operations[0].inputs[0] = model.operands.len() as u32 + extra;

        let (status, _) = env.device().get_supported_operations(&model);
        prop_assert_eq!(status, ErrorStatus::InvalidArgument);

        let signal = nnhal_vts::CompletionSignal::shared();
        let (status, handle) = env.device().prepare_model(&model, Arc::clone(&signal));
        prop_assert_eq!(status, ErrorStatus::InvalidArgument);
        prop_assert!(handle.is_none());
        prop_assert!(signal.wait().is_terminal());
    }

    #[test]
    fn prop_unknown_operation_code_is_rejected(code in 22u32..u32::MAX) {
        let env = reference_env();
        let mut model = create_valid_test_model();
        model.operations[0].op_type = OperationType::from_code(code);
        prop_assume!(!model.operations[0].op_type.is_recognized());

        let (status, _) = env.device().get_supported_operations(&model);
        prop_assert_eq!(status, ErrorStatus::InvalidArgument);
    }
}
