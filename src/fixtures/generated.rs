//! Generated example cases
//!
//! Each [`GeneratedCase`] pairs a model builder with example input/output
//! values. Requests are built from the example data: every input is packed
//! into one input pool and every output gets a slot in one output pool,
//! both laid out sequentially with 4-byte alignment.

use std::collections::BTreeMap;

use crate::error::VtsResult;
use crate::hal::{
    validate_request, DataLocation, FusedActivation, Model, Operand, OperandLifeTime, OperandType,
    OperationType, Request, RequestArgument,
};
use crate::memory::SharedMemory;
use crate::values::TypedValues;

/// Byte the output pool is filled with before execution (all-ones is a NaN
/// for float32, so unwritten outputs never compare equal).
pub const OUTPUT_FILL: u8 = 0xFF;

/// Example values keyed by input/output position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixedTypedExample {
    pub inputs: BTreeMap<usize, TypedValues>,
    pub outputs: BTreeMap<usize, TypedValues>,
}

impl MixedTypedExample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, position: usize, values: TypedValues) -> Self {
        self.inputs.insert(position, values);
        self
    }

    pub fn output(mut self, position: usize, values: TypedValues) -> Self {
        self.outputs.insert(position, values);
        self
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedCase {
    pub name: &'static str,
    pub create_model: fn() -> Model,
    /// Output positions whose values are not compared.
    pub is_ignored: fn(usize) -> bool,
    pub examples: Vec<MixedTypedExample>,
}

fn ignore_none(_: usize) -> bool {
    false
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Build a request for `example` against `model`.
///
/// # Errors
///
/// [`crate::VtsError::InvalidConfiguration`] when the example does not
/// provide exactly one value buffer per model input, a buffer's element type
/// differs from its operand's, or an output's size overflows.
/// [`crate::VtsError::Validation`] when the packed request does not fit the
/// model.
pub fn build_request(model: &Model, example: &MixedTypedExample) -> VtsResult<Request> {
    if example.inputs.len() != model.input_indexes.len() {
        return Err(crate::config_error!(
            "example provides {} inputs, model declares {}",
            example.inputs.len(),
            model.input_indexes.len()
        ));
    }

    let mut input_bytes = Vec::new();
    let mut inputs = Vec::with_capacity(example.inputs.len());
    for (position, &index) in model.input_indexes.iter().enumerate() {
        let values = example
            .inputs
            .get(&position)
            .ok_or_else(|| crate::config_error!("example has no value for input {}", position))?;
        let operand = model
            .operand(index)
            .ok_or_else(|| crate::config_error!("model input {} is not an operand", index))?;
        if !values.matches(operand.operand_type) {
            return Err(crate::config_error!(
                "input {} holds {} values for a {:?} operand",
                position,
                values.kind(),
                operand.operand_type
            ));
        }
        let offset = align4(input_bytes.len());
        input_bytes.resize(offset, 0);
        input_bytes.extend_from_slice(&values.to_bytes());
        inputs.push(RequestArgument::new(DataLocation::new(
            0,
            offset as u32,
            values.byte_len() as u32,
        )));
    }

    let mut output_size = 0usize;
    let mut outputs = Vec::with_capacity(model.output_indexes.len());
    for &index in &model.output_indexes {
        let operand = model
            .operand(index)
            .ok_or_else(|| crate::config_error!("model output {} is not an operand", index))?;
        let offset = align4(output_size);
        let length = operand.byte_size().ok_or_else(|| {
            crate::config_error!("output {} dimensions {:?} overflow", index, operand.dimensions)
        })?;
        outputs.push(RequestArgument::new(DataLocation::new(
            1,
            offset as u32,
            length as u32,
        )));
        output_size = offset + length;
    }

    let mut request = Request::new();
    request.add_pool(SharedMemory::from_bytes(&input_bytes)?);
    let output_pool = SharedMemory::allocate(output_size)?;
    output_pool.with_bytes_mut(|bytes| bytes.fill(OUTPUT_FILL))?;
    request.add_pool(output_pool);
    request.inputs = inputs;
    request.outputs = outputs;
    validate_request(&request, model)?;
    Ok(request)
}

// ========== Model builders ==========

fn tensor(dims: &[u32], lifetime: OperandLifeTime) -> Operand {
    Operand::new(OperandType::TensorFloat32, dims.to_vec(), lifetime)
}

fn activation_operand(model: &mut Model, activation: FusedActivation) -> u32 {
    let location = model.push_operand_value(&activation.code().to_ne_bytes());
    model.add_operand(
        Operand::new(OperandType::Int32, vec![], OperandLifeTime::ConstantCopy)
            .with_consumers(1)
            .with_location(location),
    )
}

fn binary_model(op_type: OperationType, dims: &[u32], activation: FusedActivation) -> Model {
    let mut model = Model::new();
    let a = model.add_operand(tensor(dims, OperandLifeTime::ModelInput).with_consumers(1));
    let b = model.add_operand(tensor(dims, OperandLifeTime::ModelInput).with_consumers(1));
    let act = activation_operand(&mut model, activation);
    let out = model.add_operand(tensor(dims, OperandLifeTime::ModelOutput));
    model.add_operation(op_type, vec![a, b, act], vec![out]);
    model.input_indexes = vec![a, b];
    model.output_indexes = vec![out];
    model
}

pub fn create_add_relu_model() -> Model {
    binary_model(OperationType::Add, &[2, 2], FusedActivation::Relu)
}

pub fn create_mul_model() -> Model {
    binary_model(OperationType::Mul, &[4], FusedActivation::None)
}

pub fn create_relu6_model() -> Model {
    let mut model = Model::new();
    let input = model.add_operand(tensor(&[1, 4], OperandLifeTime::ModelInput).with_consumers(1));
    let output = model.add_operand(tensor(&[1, 4], OperandLifeTime::ModelOutput));
    model.add_operation(OperationType::Relu6, vec![input], vec![output]);
    model.input_indexes = vec![input];
    model.output_indexes = vec![output];
    model
}

/// `sum = a + b` then `relu = RELU(sum)`; both are model outputs.
pub fn create_add_then_relu_model() -> Model {
    let dims = [4];
    let mut model = Model::new();
    let a = model.add_operand(tensor(&dims, OperandLifeTime::ModelInput).with_consumers(1));
    let b = model.add_operand(tensor(&dims, OperandLifeTime::ModelInput).with_consumers(1));
    let act = activation_operand(&mut model, FusedActivation::None);
    let sum = model.add_operand(tensor(&dims, OperandLifeTime::ModelOutput).with_consumers(1));
    let relu = model.add_operand(tensor(&dims, OperandLifeTime::ModelOutput));
    model.add_operation(OperationType::Add, vec![a, b, act], vec![sum]);
    model.add_operation(OperationType::Relu, vec![sum], vec![relu]);
    model.input_indexes = vec![a, b];
    model.output_indexes = vec![sum, relu];
    model
}

fn f32s(values: &[f32]) -> TypedValues {
    TypedValues::Float32(values.to_vec())
}

/// The shipped example suite.
pub fn all_generated_cases() -> Vec<GeneratedCase> {
    vec![
        GeneratedCase {
            name: "add_relu",
            create_model: create_add_relu_model,
            is_ignored: ignore_none,
            examples: vec![
                MixedTypedExample::new()
                    .input(0, f32s(&[1.0, -2.0, 3.0, -4.0]))
                    .input(1, f32s(&[0.5, 3.0, -1.0, 5.0]))
                    .output(0, f32s(&[1.5, 1.0, 2.0, 1.0])),
                MixedTypedExample::new()
                    .input(0, f32s(&[-1.0, -1.0, -1.0, -1.0]))
                    .input(1, f32s(&[0.25, 2.0, 0.0, -3.0]))
                    .output(0, f32s(&[0.0, 1.0, 0.0, 0.0])),
            ],
        },
        GeneratedCase {
            name: "mul",
            create_model: create_mul_model,
            is_ignored: ignore_none,
            examples: vec![MixedTypedExample::new()
                .input(0, f32s(&[1.0, 2.0, 3.0, 4.0]))
                .input(1, f32s(&[2.0, 0.5, -1.0, 10.0]))
                .output(0, f32s(&[2.0, 1.0, -3.0, 40.0]))],
        },
        GeneratedCase {
            name: "relu6",
            create_model: create_relu6_model,
            is_ignored: ignore_none,
            examples: vec![MixedTypedExample::new()
                .input(0, f32s(&[-2.0, 0.5, 6.5, 3.0]))
                .output(0, f32s(&[0.0, 0.5, 6.0, 3.0]))],
        },
        GeneratedCase {
            name: "add_then_relu",
            create_model: create_add_then_relu_model,
            // Only the activated result is checked.
            is_ignored: |position| position == 0,
            examples: vec![MixedTypedExample::new()
                .input(0, f32s(&[1.0, -2.0, 3.0, -4.0]))
                .input(1, f32s(&[-2.0, 1.0, 1.0, 1.0]))
                .output(1, f32s(&[0.0, 0.0, 4.0, 0.0]))],
        },
    ]
}
