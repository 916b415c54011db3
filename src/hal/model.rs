//! Model (graph) description submitted to a device.
//!
//! A [`Model`] is a flat list of typed operands plus an ordered list of
//! operations that reference operands by index. Constants live either inline
//! in [`Model::operand_values`] (`ConstantCopy`) or in a shared pool
//! (`ConstantReference`).

use serde::Serialize;

use crate::memory::SharedMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperandType {
    Float32,
    Int32,
    Uint32,
    TensorFloat32,
    TensorInt32,
    TensorQuant8Asymm,
}

impl OperandType {
    /// Size in bytes of one element.
    pub fn element_size(self) -> usize {
        match self {
            OperandType::Float32
            | OperandType::Int32
            | OperandType::Uint32
            | OperandType::TensorFloat32
            | OperandType::TensorInt32 => 4,
            OperandType::TensorQuant8Asymm => 1,
        }
    }

    pub fn is_tensor(self) -> bool {
        matches!(
            self,
            OperandType::TensorFloat32 | OperandType::TensorInt32 | OperandType::TensorQuant8Asymm
        )
    }

    pub fn is_scalar(self) -> bool {
        !self.is_tensor()
    }
}

/// Operation codes. Unknown codes are kept verbatim so malformed models can
/// be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationType {
    Add,
    Mul,
    Relu,
    Relu1,
    Relu6,
    Unrecognized(u32),
}

impl OperationType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => OperationType::Add,
            18 => OperationType::Mul,
            19 => OperationType::Relu,
            20 => OperationType::Relu1,
            21 => OperationType::Relu6,
            other => OperationType::Unrecognized(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            OperationType::Add => 0,
            OperationType::Mul => 18,
            OperationType::Relu => 19,
            OperationType::Relu1 => 20,
            OperationType::Relu6 => 21,
            OperationType::Unrecognized(code) => code,
        }
    }

    pub fn is_recognized(self) -> bool {
        !matches!(self, OperationType::Unrecognized(_))
    }
}

/// Activation fused into ADD/MUL, carried as an INT32 scalar operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusedActivation {
    None,
    Relu,
    Relu1,
    Relu6,
}

impl FusedActivation {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(FusedActivation::None),
            1 => Some(FusedActivation::Relu),
            2 => Some(FusedActivation::Relu1),
            3 => Some(FusedActivation::Relu6),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            FusedActivation::None => 0,
            FusedActivation::Relu => 1,
            FusedActivation::Relu1 => 2,
            FusedActivation::Relu6 => 3,
        }
    }

    pub fn apply(self, value: f32) -> f32 {
        match self {
            FusedActivation::None => value,
            FusedActivation::Relu => value.max(0.0),
            FusedActivation::Relu1 => value.clamp(-1.0, 1.0),
            FusedActivation::Relu6 => value.clamp(0.0, 6.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperandLifeTime {
    TemporaryVariable,
    ModelInput,
    ModelOutput,
    ConstantCopy,
    ConstantReference,
    NoValue,
}

/// Byte range inside a pool (or inside `operand_values` for `ConstantCopy`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataLocation {
    pub pool_index: u32,
    pub offset: u32,
    pub length: u32,
}

impl DataLocation {
    pub fn new(pool_index: u32, offset: u32, length: u32) -> Self {
        Self {
            pool_index,
            offset,
            length,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == DataLocation::default()
    }

    /// One past the last byte, `None` on overflow.
    pub fn end(&self) -> Option<usize> {
        (self.offset as usize).checked_add(self.length as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operand {
    pub operand_type: OperandType,
    pub dimensions: Vec<u32>,
    pub number_of_consumers: u32,
    pub scale: f32,
    pub zero_point: i32,
    pub lifetime: OperandLifeTime,
    pub location: DataLocation,
}

impl Operand {
    pub fn new(operand_type: OperandType, dimensions: Vec<u32>, lifetime: OperandLifeTime) -> Self {
        Self {
            operand_type,
            dimensions,
            number_of_consumers: 0,
            scale: 0.0,
            zero_point: 0,
            lifetime,
            location: DataLocation::default(),
        }
    }

    pub fn with_consumers(mut self, consumers: u32) -> Self {
        self.number_of_consumers = consumers;
        self
    }

    pub fn with_location(mut self, location: DataLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_quantization(mut self, scale: f32, zero_point: i32) -> Self {
        self.scale = scale;
        self.zero_point = zero_point;
        self
    }

    /// Number of elements; a scalar has one. `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        element_count(&self.dimensions)
    }

    pub fn byte_size(&self) -> Option<usize> {
        byte_size(&self.dimensions, self.operand_type)
    }
}

/// Product of `dimensions`, `None` if it does not fit in `usize`.
pub fn element_count(dimensions: &[u32]) -> Option<usize> {
    dimensions
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
}

/// Bytes taken by `dimensions` elements of `operand_type`.
pub fn byte_size(dimensions: &[u32], operand_type: OperandType) -> Option<usize> {
    element_count(dimensions)?.checked_mul(operand_type.element_size())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub op_type: OperationType,
    pub inputs: Vec<u32>,
    pub outputs: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub operands: Vec<Operand>,
    pub operations: Vec<Operation>,
    pub input_indexes: Vec<u32>,
    pub output_indexes: Vec<u32>,
    pub operand_values: Vec<u8>,
    pub pools: Vec<SharedMemory>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operand and return its index.
    pub fn add_operand(&mut self, operand: Operand) -> u32 {
        let index = self.operands.len() as u32;
        self.operands.push(operand);
        index
    }

    pub fn add_operation(&mut self, op_type: OperationType, inputs: Vec<u32>, outputs: Vec<u32>) {
        self.operations.push(Operation {
            op_type,
            inputs,
            outputs,
        });
    }

    /// Copy `bytes` into `operand_values` (4-byte aligned) and return the
    /// location a `ConstantCopy` operand should carry.
    pub fn push_operand_value(&mut self, bytes: &[u8]) -> DataLocation {
        let padding = (4 - self.operand_values.len() % 4) % 4;
        self.operand_values.extend(std::iter::repeat(0u8).take(padding));
        let offset = self.operand_values.len() as u32;
        self.operand_values.extend_from_slice(bytes);
        DataLocation::new(0, offset, bytes.len() as u32)
    }

    pub fn operand(&self, index: u32) -> Option<&Operand> {
        self.operands.get(index as usize)
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_codes() {
        for op in [
            OperationType::Add,
            OperationType::Mul,
            OperationType::Relu,
            OperationType::Relu1,
            OperationType::Relu6,
        ] {
            assert_eq!(OperationType::from_code(op.code()), op);
        }
        assert_eq!(
            OperationType::from_code(0xDEAD_BEEF),
            OperationType::Unrecognized(0xDEAD_BEEF)
        );
        assert!(!OperationType::Unrecognized(7).is_recognized());
    }

    #[test]
    fn test_fused_activation_apply() {
        assert_eq!(FusedActivation::None.apply(-3.0), -3.0);
        assert_eq!(FusedActivation::Relu.apply(-3.0), 0.0);
        assert_eq!(FusedActivation::Relu1.apply(3.0), 1.0);
        assert_eq!(FusedActivation::Relu6.apply(7.5), 6.0);
        assert_eq!(FusedActivation::from_code(4), None);
    }

    #[test]
    fn test_operand_byte_size() {
        let tensor = Operand::new(
            OperandType::TensorFloat32,
            vec![1, 2, 2, 1],
            OperandLifeTime::ModelInput,
        );
        assert_eq!(tensor.element_count(), Some(4));
        assert_eq!(tensor.byte_size(), Some(16));

        let scalar = Operand::new(OperandType::Int32, vec![], OperandLifeTime::ConstantCopy);
        assert_eq!(scalar.element_count(), Some(1));
        assert_eq!(scalar.byte_size(), Some(4));

        let quant = Operand::new(
            OperandType::TensorQuant8Asymm,
            vec![3],
            OperandLifeTime::ModelInput,
        );
        assert_eq!(quant.byte_size(), Some(3));
    }

    #[test]
    fn test_oversized_dimensions_do_not_overflow() {
        let huge = Operand::new(
            OperandType::TensorFloat32,
            vec![u32::MAX; 4],
            OperandLifeTime::ModelInput,
        );
        assert_eq!(huge.element_count(), None);
        assert_eq!(huge.byte_size(), None);
        assert_eq!(byte_size(&[u32::MAX, u32::MAX], OperandType::TensorFloat32), None);
        assert_eq!(element_count(&[0, u32::MAX]), Some(0));
    }

    #[test]
    fn test_push_operand_value_aligns() {
        let mut model = Model::new();
        let first = model.push_operand_value(&[1, 2, 3]);
        assert_eq!(first, DataLocation::new(0, 0, 3));
        let second = model.push_operand_value(&[9, 9, 9, 9]);
        assert_eq!(second, DataLocation::new(0, 4, 4));
        assert_eq!(model.operand_values.len(), 8);
    }

    #[test]
    fn test_data_location_end_overflow() {
        let loc = DataLocation::new(0, u32::MAX, u32::MAX);
        assert_eq!(loc.end(), Some(u32::MAX as usize * 2));
        assert!(DataLocation::default().is_empty());
    }
}
