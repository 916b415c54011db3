//! Structural validation of models and requests.
//!
//! A device must reject anything that fails these checks with
//! `ErrorStatus::InvalidArgument`. Checks run in a fixed order (operands,
//! operations, model inputs, model outputs) so that a fixture with a single
//! defect always reports that defect.

use thiserror::Error;

use crate::hal::model::{
    byte_size, Model, Operand, OperandLifeTime, OperandType, OperationType,
};
use crate::hal::request::{Request, RequestArgument};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    // ========== Model ==========
    #[error("operand {index}: {reason}")]
    InvalidOperand { index: usize, reason: String },

    #[error("operation {operation} has unrecognized type code {code:#x}")]
    UnrecognizedOperation { operation: usize, code: u32 },

    #[error("operation {operation} references operand {index} but only {count} operands are declared")]
    OperandIndexOutOfRange {
        operation: usize,
        index: u32,
        count: usize,
    },

    #[error("operation {operation} ({op_type:?}) expects {expected} {role}s, got {actual}")]
    Arity {
        operation: usize,
        op_type: OperationType,
        role: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("operation {operation}: operand {index} has type {found:?}, expected {expected:?}")]
    OperandTypeMismatch {
        operation: usize,
        index: u32,
        expected: OperandType,
        found: OperandType,
    },

    #[error("model input index {index} out of range ({count} operands)")]
    InputIndexOutOfRange { index: u32, count: usize },

    #[error("model output index {index} out of range ({count} operands)")]
    OutputIndexOutOfRange { index: u32, count: usize },

    #[error("operand {index} used as {role} has lifetime {lifetime:?}")]
    WrongLifetime {
        index: u32,
        role: &'static str,
        lifetime: OperandLifeTime,
    },

    // ========== Request ==========
    #[error("request has {actual} {role} arguments, model declares {expected}")]
    ArgumentCount {
        role: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("request {role} {position}: pool index {pool_index} out of range ({pool_count} pools)")]
    PoolIndexOutOfRange {
        role: &'static str,
        position: usize,
        pool_index: u32,
        pool_count: usize,
    },

    #[error("request {role} {position}: dimensions {dimensions:?} incompatible with operand {declared:?}")]
    DimensionMismatch {
        role: &'static str,
        position: usize,
        dimensions: Vec<u32>,
        declared: Vec<u32>,
    },

    #[error("request {role} {position}: dimensions {dimensions:?} overflow the addressable size")]
    SizeOverflow {
        role: &'static str,
        position: usize,
        dimensions: Vec<u32>,
    },

    #[error("request {role} {position}: length {length} does not match operand size {expected}")]
    LengthMismatch {
        role: &'static str,
        position: usize,
        length: u32,
        expected: usize,
    },

    #[error("request {role} {position}: region {offset}+{length} exceeds pool of {pool_size} bytes")]
    RegionOutOfRange {
        role: &'static str,
        position: usize,
        offset: u32,
        length: u32,
        pool_size: usize,
    },

    #[error("request {role} {position}: omitted argument must not carry a location or dimensions")]
    OmittedWithLocation { role: &'static str, position: usize },

    #[error("request output {position} cannot be omitted")]
    OmittedOutput { position: usize },
}

pub type ValidationResult = Result<(), ValidationError>;

/// Input/output type signature of a recognized operation.
struct Signature {
    /// Tensor inputs sharing the primary element type.
    tensor_inputs: usize,
    /// Trailing INT32 scalar (fused activation).
    activation: bool,
}

fn signature(op_type: OperationType) -> Option<Signature> {
    match op_type {
        OperationType::Add | OperationType::Mul => Some(Signature {
            tensor_inputs: 2,
            activation: true,
        }),
        OperationType::Relu | OperationType::Relu1 | OperationType::Relu6 => Some(Signature {
            tensor_inputs: 1,
            activation: false,
        }),
        OperationType::Unrecognized(_) => None,
    }
}

const ELEMENTWISE_TYPES: [OperandType; 2] =
    [OperandType::TensorFloat32, OperandType::TensorQuant8Asymm];

/// Validate a model's structure.
pub fn validate_model(model: &Model) -> ValidationResult {
    for (index, operand) in model.operands.iter().enumerate() {
        validate_operand(model, index, operand)?;
    }

    let count = model.operands.len();
    for (position, operation) in model.operations.iter().enumerate() {
        let sig = signature(operation.op_type).ok_or(ValidationError::UnrecognizedOperation {
            operation: position,
            code: operation.op_type.code(),
        })?;

        for &index in operation.inputs.iter().chain(operation.outputs.iter()) {
            if index as usize >= count {
                return Err(ValidationError::OperandIndexOutOfRange {
                    operation: position,
                    index,
                    count,
                });
            }
        }

        let expected_inputs = sig.tensor_inputs + usize::from(sig.activation);
        if operation.inputs.len() != expected_inputs {
            return Err(ValidationError::Arity {
                operation: position,
                op_type: operation.op_type,
                role: "input",
                expected: expected_inputs,
                actual: operation.inputs.len(),
            });
        }
        if operation.outputs.len() != 1 {
            return Err(ValidationError::Arity {
                operation: position,
                op_type: operation.op_type,
                role: "output",
                expected: 1,
                actual: operation.outputs.len(),
            });
        }

        let primary_index = operation.inputs[0];
        let primary = model.operands[primary_index as usize].operand_type;
        if !ELEMENTWISE_TYPES.contains(&primary) {
            return Err(ValidationError::OperandTypeMismatch {
                operation: position,
                index: primary_index,
                expected: OperandType::TensorFloat32,
                found: primary,
            });
        }

        let tensor_operands = operation.inputs[..sig.tensor_inputs]
            .iter()
            .chain(operation.outputs.iter());
        for &index in tensor_operands {
            let found = model.operands[index as usize].operand_type;
            if found != primary {
                return Err(ValidationError::OperandTypeMismatch {
                    operation: position,
                    index,
                    expected: primary,
                    found,
                });
            }
        }

        if sig.activation {
            let index = operation.inputs[sig.tensor_inputs];
            let found = model.operands[index as usize].operand_type;
            if found != OperandType::Int32 {
                return Err(ValidationError::OperandTypeMismatch {
                    operation: position,
                    index,
                    expected: OperandType::Int32,
                    found,
                });
            }
        }

        let output = operation.outputs[0];
        let lifetime = model.operands[output as usize].lifetime;
        if !matches!(
            lifetime,
            OperandLifeTime::TemporaryVariable | OperandLifeTime::ModelOutput
        ) {
            return Err(ValidationError::WrongLifetime {
                index: output,
                role: "operation output",
                lifetime,
            });
        }
    }

    for &index in &model.input_indexes {
        let operand = model
            .operand(index)
            .ok_or(ValidationError::InputIndexOutOfRange { index, count })?;
        if operand.lifetime != OperandLifeTime::ModelInput {
            return Err(ValidationError::WrongLifetime {
                index,
                role: "model input",
                lifetime: operand.lifetime,
            });
        }
    }

    for &index in &model.output_indexes {
        let operand = model
            .operand(index)
            .ok_or(ValidationError::OutputIndexOutOfRange { index, count })?;
        if operand.lifetime != OperandLifeTime::ModelOutput {
            return Err(ValidationError::WrongLifetime {
                index,
                role: "model output",
                lifetime: operand.lifetime,
            });
        }
    }

    Ok(())
}

fn validate_operand(model: &Model, index: usize, operand: &Operand) -> ValidationResult {
    let invalid = |reason: String| ValidationError::InvalidOperand { index, reason };

    if operand.operand_type.is_scalar() && !operand.dimensions.is_empty() {
        return Err(invalid(format!(
            "scalar {:?} declares dimensions {:?}",
            operand.operand_type, operand.dimensions
        )));
    }

    let Some(size) = operand.byte_size() else {
        return Err(invalid(format!(
            "dimensions {:?} overflow the addressable size",
            operand.dimensions
        )));
    };

    if operand.operand_type == OperandType::TensorQuant8Asymm {
        if !(operand.scale > 0.0) {
            return Err(invalid(format!("quantized scale {} must be > 0", operand.scale)));
        }
        if !(0..=255).contains(&operand.zero_point) {
            return Err(invalid(format!(
                "quantized zero point {} outside 0..=255",
                operand.zero_point
            )));
        }
    }

    let location = &operand.location;
    match operand.lifetime {
        OperandLifeTime::ConstantCopy | OperandLifeTime::ConstantReference => {
            let available = if operand.lifetime == OperandLifeTime::ConstantCopy {
                if location.pool_index != 0 {
                    return Err(invalid(format!(
                        "constant copy must use pool 0, found pool {}",
                        location.pool_index
                    )));
                }
                model.operand_values.len()
            } else {
                model
                    .pools
                    .get(location.pool_index as usize)
                    .map(|pool| pool.len())
                    .ok_or_else(|| {
                        invalid(format!(
                            "constant reference to pool {} of {}",
                            location.pool_index,
                            model.pools.len()
                        ))
                    })?
            };
            match location.end() {
                Some(end) if end <= available => {}
                _ => {
                    return Err(invalid(format!(
                        "constant region {}+{} exceeds {} bytes",
                        location.offset, location.length, available
                    )))
                }
            }
            if location.length as usize != size {
                return Err(invalid(format!(
                    "constant length {} does not match operand size {}",
                    location.length, size
                )));
            }
        }
        _ => {
            if !location.is_empty() {
                return Err(invalid(format!(
                    "{:?} operand carries a location",
                    operand.lifetime
                )));
            }
        }
    }

    Ok(())
}

/// Validate a request against the (already validated) model it targets.
pub fn validate_request(request: &Request, model: &Model) -> ValidationResult {
    validate_arguments(request, model, &request.inputs, &model.input_indexes, "input")?;
    validate_arguments(request, model, &request.outputs, &model.output_indexes, "output")
}

fn validate_arguments(
    request: &Request,
    model: &Model,
    arguments: &[RequestArgument],
    indexes: &[u32],
    role: &'static str,
) -> ValidationResult {
    if arguments.len() != indexes.len() {
        return Err(ValidationError::ArgumentCount {
            role,
            expected: indexes.len(),
            actual: arguments.len(),
        });
    }

    for (position, (argument, &index)) in arguments.iter().zip(indexes).enumerate() {
        let operand = model.operand(index).ok_or(ValidationError::InputIndexOutOfRange {
            index,
            count: model.operands.len(),
        })?;

        if argument.has_no_value {
            if role == "output" {
                return Err(ValidationError::OmittedOutput { position });
            }
            if !argument.location.is_empty() || !argument.dimensions.is_empty() {
                return Err(ValidationError::OmittedWithLocation { role, position });
            }
            continue;
        }

        let location = &argument.location;
        let pool = request
            .pool(location.pool_index)
            .ok_or(ValidationError::PoolIndexOutOfRange {
                role,
                position,
                pool_index: location.pool_index,
                pool_count: request.pools.len(),
            })?;

        let dimensions = effective_dimensions(argument, operand).ok_or_else(|| {
            ValidationError::DimensionMismatch {
                role,
                position,
                dimensions: argument.dimensions.clone(),
                declared: operand.dimensions.clone(),
            }
        })?;

        let expected = byte_size(&dimensions, operand.operand_type).ok_or_else(|| {
            ValidationError::SizeOverflow {
                role,
                position,
                dimensions: dimensions.clone(),
            }
        })?;
        if location.length as usize != expected {
            return Err(ValidationError::LengthMismatch {
                role,
                position,
                length: location.length,
                expected,
            });
        }

        match location.end() {
            Some(end) if end <= pool.len() => {}
            _ => {
                return Err(ValidationError::RegionOutOfRange {
                    role,
                    position,
                    offset: location.offset,
                    length: location.length,
                    pool_size: pool.len(),
                })
            }
        }
    }

    Ok(())
}

/// Dimensions the argument actually binds, or `None` when the argument's
/// dimensions contradict the operand's declared ones.
pub fn effective_dimensions(argument: &RequestArgument, operand: &Operand) -> Option<Vec<u32>> {
    if argument.dimensions.is_empty() {
        return Some(operand.dimensions.clone());
    }
    if argument.dimensions.len() != operand.dimensions.len() {
        return None;
    }
    let compatible = argument
        .dimensions
        .iter()
        .zip(&operand.dimensions)
        .all(|(&given, &declared)| declared == 0 || given == declared);
    compatible.then(|| argument.dimensions.clone())
}
