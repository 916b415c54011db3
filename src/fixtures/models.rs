//! Model fixtures: one valid model and one model per violation class.

use crate::hal::{
    ErrorStatus, FusedActivation, Model, Operand, OperandLifeTime, OperandType, OperationType,
};
use crate::values::f32_bytes;

/// Shape shared by every tensor of the minimal ADD model.
pub const TENSOR_DIMS: [u32; 4] = [1, 2, 2, 1];

/// Values fed to the single model input.
pub const VALID_INPUT: [f32; 4] = [1.0, 2.0, 3.0, 4.0];

/// Constant second ADD operand.
pub const VALID_CONSTANT: [f32; 4] = [5.0, 6.0, 7.0, 8.0];

/// `VALID_INPUT + VALID_CONSTANT`
pub const VALID_EXPECTED: [f32; 4] = [6.0, 8.0, 10.0, 12.0];

/// Raw operation code no device recognizes.
pub const INVALID_OPERATION_CODE: u32 = 0xDEAD_BEEF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFixture {
    /// `output = input + constant`, no fused activation
    Valid,
    /// Operation type is an unrecognized code
    UnknownOperation,
    /// Model input list names an operand that does not exist
    InputIndexOutOfRange,
    /// The operation reads an operand that does not exist
    OperandReferenceOutOfRange,
    /// The declared model input is `TensorInt32` for a float ADD
    InputTypeMismatch,
    /// Well-formed RELU1 graph, outside the reference device's op set
    Unsupported,
}

impl ModelFixture {
    pub const ALL: [ModelFixture; 6] = [
        ModelFixture::Valid,
        ModelFixture::UnknownOperation,
        ModelFixture::InputIndexOutOfRange,
        ModelFixture::OperandReferenceOutOfRange,
        ModelFixture::InputTypeMismatch,
        ModelFixture::Unsupported,
    ];

    /// Fixtures that violate the model structure rules.
    pub const MALFORMED: [ModelFixture; 4] = [
        ModelFixture::UnknownOperation,
        ModelFixture::InputIndexOutOfRange,
        ModelFixture::OperandReferenceOutOfRange,
        ModelFixture::InputTypeMismatch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelFixture::Valid => "valid",
            ModelFixture::UnknownOperation => "unknown_operation",
            ModelFixture::InputIndexOutOfRange => "input_index_out_of_range",
            ModelFixture::OperandReferenceOutOfRange => "operand_reference_out_of_range",
            ModelFixture::InputTypeMismatch => "input_type_mismatch",
            ModelFixture::Unsupported => "unsupported",
        }
    }

    pub fn is_malformed(self) -> bool {
        Self::MALFORMED.contains(&self)
    }

    pub fn build(self) -> Model {
        match self {
            ModelFixture::Valid => create_valid_test_model(),
            ModelFixture::UnknownOperation => {
                let mut model = create_valid_test_model();
                model.operations[0].op_type = OperationType::from_code(INVALID_OPERATION_CODE);
                model
            }
            ModelFixture::InputIndexOutOfRange => {
                let mut model = create_valid_test_model();
                let missing = model.operands.len() as u32;
                model.input_indexes = vec![0, missing];
                model
            }
            ModelFixture::OperandReferenceOutOfRange => {
                let mut model = create_valid_test_model();
                let missing = model.operands.len() as u32;
                model.operations[0].inputs[1] = missing;
                model
            }
            ModelFixture::InputTypeMismatch => {
                let mut model = create_valid_test_model();
                model.operands[0].operand_type = OperandType::TensorInt32;
                model
            }
            ModelFixture::Unsupported => create_unsupported_test_model(),
        }
    }

    /// Status `prepare_model` must report.
    pub fn expected_prepare_status(self) -> ErrorStatus {
        match self {
            ModelFixture::Valid => ErrorStatus::None,
            _ => ErrorStatus::InvalidArgument,
        }
    }

    /// Status `get_supported_operations` must report. A well-formed model is
    /// answered even when the device cannot run it.
    pub fn expected_supported_status(self) -> ErrorStatus {
        if self.is_malformed() {
            ErrorStatus::InvalidArgument
        } else {
            ErrorStatus::None
        }
    }
}

/// ADD of a model input and a constant, `[1,2,2,1]` float32.
///
/// Operands: 0 input, 1 constant `{5,6,7,8}`, 2 activation (`FUSED_NONE`),
/// 3 output.
pub fn create_valid_test_model() -> Model {
    let mut model = Model::new();
    let dims = TENSOR_DIMS.to_vec();

    let constant_location = model.push_operand_value(&f32_bytes(&VALID_CONSTANT));
    let activation_location =
        model.push_operand_value(&FusedActivation::None.code().to_ne_bytes());

    let input = model.add_operand(
        Operand::new(OperandType::TensorFloat32, dims.clone(), OperandLifeTime::ModelInput)
            .with_consumers(1),
    );
    let constant = model.add_operand(
        Operand::new(OperandType::TensorFloat32, dims.clone(), OperandLifeTime::ConstantCopy)
            .with_consumers(1)
            .with_location(constant_location),
    );
    let activation = model.add_operand(
        Operand::new(OperandType::Int32, vec![], OperandLifeTime::ConstantCopy)
            .with_consumers(1)
            .with_location(activation_location),
    );
    let output = model.add_operand(Operand::new(
        OperandType::TensorFloat32,
        dims,
        OperandLifeTime::ModelOutput,
    ));

    model.add_operation(OperationType::Add, vec![input, constant, activation], vec![output]);
    model.input_indexes = vec![input];
    model.output_indexes = vec![output];
    model
}

/// Single RELU1 over a `[1,2,2,1]` float32 input.
pub fn create_unsupported_test_model() -> Model {
    let mut model = Model::new();
    let dims = TENSOR_DIMS.to_vec();

    let input = model.add_operand(
        Operand::new(OperandType::TensorFloat32, dims.clone(), OperandLifeTime::ModelInput)
            .with_consumers(1),
    );
    let output = model.add_operand(Operand::new(
        OperandType::TensorFloat32,
        dims,
        OperandLifeTime::ModelOutput,
    ));

    model.add_operation(OperationType::Relu1, vec![input], vec![output]);
    model.input_indexes = vec![input];
    model.output_indexes = vec![output];
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_model_layout() {
        let model = create_valid_test_model();
        assert_eq!(model.operands.len(), 4);
        assert_eq!(model.operation_count(), 1);
        assert_eq!(model.input_indexes, vec![0]);
        assert_eq!(model.output_indexes, vec![3]);
        assert_eq!(model.operand_values.len(), 20);
    }

    #[test]
    fn test_expected_output_is_sum() {
        for i in 0..4 {
            assert_eq!(VALID_INPUT[i] + VALID_CONSTANT[i], VALID_EXPECTED[i]);
        }
    }

    #[test]
    fn test_fixture_expectations() {
        assert_eq!(ModelFixture::Valid.expected_prepare_status(), ErrorStatus::None);
        for fixture in ModelFixture::MALFORMED {
            assert_eq!(fixture.expected_prepare_status(), ErrorStatus::InvalidArgument);
            assert_eq!(fixture.expected_supported_status(), ErrorStatus::InvalidArgument);
        }
        assert_eq!(
            ModelFixture::Unsupported.expected_supported_status(),
            ErrorStatus::None
        );
        assert_eq!(
            ModelFixture::Unsupported.expected_prepare_status(),
            ErrorStatus::InvalidArgument
        );
    }

    #[test]
    fn test_fixture_names_are_unique() {
        let mut names: Vec<_> = ModelFixture::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ModelFixture::ALL.len());
    }
}
