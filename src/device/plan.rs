//! Compiled execution plans for the reference device.
//!
//! Compilation resolves every constant operand into a host buffer and turns
//! each operation into a [`Step`]. Execution copies request inputs into the
//! operand slots, runs the steps in model order and writes the model outputs
//! back into the request's pools.

use byteorder::{ByteOrder, NativeEndian};

use crate::error::{VtsError, VtsResult};
use crate::hal::{
    effective_dimensions, FusedActivation, Model, Operand, OperandLifeTime, OperandType,
    OperationType, Request,
};
use crate::values::{f32_bytes, TypedValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    Add(FusedActivation),
    Mul(FusedActivation),
    /// Standalone RELU, RELU1 or RELU6
    Clamp(FusedActivation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    kernel: Kernel,
    inputs: Vec<usize>,
    output: usize,
}

/// A validated model lowered for host execution
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    model: Model,
    input_indexes: Vec<usize>,
    output_indexes: Vec<usize>,
    constants: Vec<Option<Vec<f32>>>,
    steps: Vec<Step>,
}

fn read_constant(model: &Model, operand: &Operand) -> VtsResult<Vec<u8>> {
    let location = &operand.location;
    let offset = location.offset as usize;
    let length = location.length as usize;
    match operand.lifetime {
        OperandLifeTime::ConstantCopy => model
            .operand_values
            .get(offset..offset + length)
            .map(<[u8]>::to_vec)
            .ok_or(VtsError::PoolOutOfBounds {
                offset,
                length,
                size: model.operand_values.len(),
            }),
        OperandLifeTime::ConstantReference => {
            let pool = model.pools.get(location.pool_index as usize).ok_or_else(|| {
                crate::internal_error!("constant pool {} missing", location.pool_index)
            })?;
            pool.read(offset, length)
        }
        other => Err(crate::internal_error!("{:?} operand has no constant value", other)),
    }
}

fn read_activation(model: &Model, index: usize) -> VtsResult<FusedActivation> {
    let operand = &model.operands[index];
    let bytes = read_constant(model, operand)?;
    if bytes.len() != 4 {
        return Err(VtsError::Decode(format!(
            "activation operand {} holds {} bytes",
            index,
            bytes.len()
        )));
    }
    let code = NativeEndian::read_i32(&bytes);
    FusedActivation::from_code(code)
        .ok_or_else(|| VtsError::Decode(format!("unknown fused activation code {}", code)))
}

impl ExecutionPlan {
    /// Lower `model`. The model must already have passed `validate_model`.
    ///
    /// # Errors
    ///
    /// [`VtsError::Decode`] for constants that are not float32 tensors or for
    /// an unknown fused activation code.
    pub fn compile(model: &Model) -> VtsResult<Self> {
        let mut constants = vec![None; model.operands.len()];
        for (index, operand) in model.operands.iter().enumerate() {
            let is_constant = matches!(
                operand.lifetime,
                OperandLifeTime::ConstantCopy | OperandLifeTime::ConstantReference
            );
            if !is_constant || operand.operand_type != OperandType::TensorFloat32 {
                continue;
            }
            let bytes = read_constant(model, operand)?;
            let values = TypedValues::decode(operand.operand_type, &bytes)?;
            constants[index] = values.as_f32().map(<[f32]>::to_vec);
        }

        let mut steps = Vec::with_capacity(model.operations.len());
        for (position, operation) in model.operations.iter().enumerate() {
            let inputs: Vec<usize> = operation.inputs.iter().map(|&i| i as usize).collect();
            let output = operation.outputs[0] as usize;
            let step = match operation.op_type {
                OperationType::Add => Step {
                    kernel: Kernel::Add(read_activation(model, inputs[2])?),
                    inputs: inputs[..2].to_vec(),
                    output,
                },
                OperationType::Mul => Step {
                    kernel: Kernel::Mul(read_activation(model, inputs[2])?),
                    inputs: inputs[..2].to_vec(),
                    output,
                },
                OperationType::Relu => Step {
                    kernel: Kernel::Clamp(FusedActivation::Relu),
                    inputs,
                    output,
                },
                OperationType::Relu1 => Step {
                    kernel: Kernel::Clamp(FusedActivation::Relu1),
                    inputs,
                    output,
                },
                OperationType::Relu6 => Step {
                    kernel: Kernel::Clamp(FusedActivation::Relu6),
                    inputs,
                    output,
                },
                OperationType::Unrecognized(code) => {
                    return Err(crate::internal_error!(
                        "operation {} has unrecognized type {:#x}",
                        position, code
                    ))
                }
            };
            steps.push(step);
        }

        Ok(Self {
            model: model.clone(),
            input_indexes: model.input_indexes.iter().map(|&i| i as usize).collect(),
            output_indexes: model.output_indexes.iter().map(|&i| i as usize).collect(),
            constants,
            steps,
        })
    }

    /// The model this plan was compiled from.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Run the plan against `request`, writing every model output into its
    /// pool region.
    pub fn execute(&self, request: &Request) -> VtsResult<()> {
        let mut slots = self.constants.clone();

        for (position, argument) in request.inputs.iter().enumerate() {
            let index = self.input_indexes[position];
            if argument.has_no_value {
                continue;
            }
            let location = &argument.location;
            let pool = request.pool(location.pool_index).ok_or_else(|| {
                crate::internal_error!("input pool {} missing", location.pool_index)
            })?;
            let bytes = pool.read(location.offset as usize, location.length as usize)?;
            let values = TypedValues::decode(self.model.operands[index].operand_type, &bytes)?;
            slots[index] = values.as_f32().map(<[f32]>::to_vec);
        }

        for step in &self.steps {
            let result = self.run_step(step, &slots)?;
            slots[step.output] = Some(result);
        }

        for (position, argument) in request.outputs.iter().enumerate() {
            let index = self.output_indexes[position];
            let operand = &self.model.operands[index];
            if effective_dimensions(argument, operand).is_none() {
                return Err(crate::internal_error!(
                    "output {} dimensions {:?} incompatible with {:?}",
                    position, argument.dimensions, operand.dimensions
                ));
            }
            let values = slots[index].as_deref().ok_or_else(|| {
                crate::internal_error!("output operand {} was never computed", index)
            })?;
            let location = &argument.location;
            let pool = request.pool(location.pool_index).ok_or_else(|| {
                crate::internal_error!("output pool {} missing", location.pool_index)
            })?;
            pool.write(location.offset as usize, &f32_bytes(values))?;
        }

        Ok(())
    }

    fn run_step(&self, step: &Step, slots: &[Option<Vec<f32>>]) -> VtsResult<Vec<f32>> {
        let operand = |i: usize| {
            slots[step.inputs[i]].as_deref().ok_or_else(|| {
                crate::internal_error!("operand {} read before written", step.inputs[i])
            })
        };

        match step.kernel {
            Kernel::Add(activation) | Kernel::Mul(activation) => {
                let (a, b) = (operand(0)?, operand(1)?);
                if a.len() != b.len() {
                    return Err(crate::internal_error!(
                        "element-wise operands differ in length: {} vs {}",
                        a.len(),
                        b.len()
                    ));
                }
                let combine = |x: f32, y: f32| match step.kernel {
                    Kernel::Mul(_) => x * y,
                    _ => x + y,
                };
                Ok(a.iter()
                    .zip(b)
                    .map(|(&x, &y)| activation.apply(combine(x, y)))
                    .collect())
            }
            Kernel::Clamp(activation) => {
                Ok(operand(0)?.iter().map(|&x| activation.apply(x)).collect())
            }
        }
    }
}
