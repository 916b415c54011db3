//! Request fixtures against the valid ADD model.

use crate::error::VtsResult;
use crate::fixtures::models::VALID_INPUT;
use crate::hal::{DataLocation, ErrorStatus, Request, RequestArgument};
use crate::memory::SharedMemory;
use crate::values::f32_bytes;

pub const INPUT_POOL: u32 = 0;
pub const OUTPUT_POOL: u32 = 1;

/// Sentinel the output pool is filled with before execution.
pub const OUTPUT_SENTINEL: f32 = -1.0;

const TENSOR_BYTES: u32 = (VALID_INPUT.len() * std::mem::size_of::<f32>()) as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestFixture {
    /// Input pool `{1,2,3,4}`, 16-byte output pool
    Valid,
    /// Input argument points at a pool that does not exist
    PoolIndexOutOfRange,
    /// Input argument dimensions disagree with the operand rank
    DimensionMismatch,
    /// Output pool is smaller than the output operand
    UndersizedPool,
}

impl RequestFixture {
    pub const ALL: [RequestFixture; 4] = [
        RequestFixture::Valid,
        RequestFixture::PoolIndexOutOfRange,
        RequestFixture::DimensionMismatch,
        RequestFixture::UndersizedPool,
    ];

    pub const MALFORMED: [RequestFixture; 3] = [
        RequestFixture::PoolIndexOutOfRange,
        RequestFixture::DimensionMismatch,
        RequestFixture::UndersizedPool,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RequestFixture::Valid => "valid",
            RequestFixture::PoolIndexOutOfRange => "pool_index_out_of_range",
            RequestFixture::DimensionMismatch => "dimension_mismatch",
            RequestFixture::UndersizedPool => "undersized_pool",
        }
    }

    pub fn build(self) -> VtsResult<Request> {
        match self {
            RequestFixture::Valid => create_valid_test_request(),
            RequestFixture::PoolIndexOutOfRange => {
                let mut request = create_valid_test_request()?;
                request.inputs[0].location.pool_index = request.pools.len() as u32;
                Ok(request)
            }
            RequestFixture::DimensionMismatch => {
                let mut request = create_valid_test_request()?;
                request.inputs[0].dimensions = vec![1, 2, 3, 4, 5, 6, 7, 8];
                Ok(request)
            }
            RequestFixture::UndersizedPool => {
                let mut request = create_valid_test_request()?;
                request.pools[OUTPUT_POOL as usize] =
                    SharedMemory::from_bytes(&f32_bytes(&[OUTPUT_SENTINEL; 2]))?;
                Ok(request)
            }
        }
    }

    pub fn expected_execute_status(self) -> ErrorStatus {
        match self {
            RequestFixture::Valid => ErrorStatus::None,
            _ => ErrorStatus::InvalidArgument,
        }
    }
}

/// Pool 0 holds the input tensor, pool 1 receives the output tensor.
pub fn create_valid_test_request() -> VtsResult<Request> {
    let mut request = Request::new();

    let input_pool = request.add_pool(SharedMemory::from_bytes(&f32_bytes(&VALID_INPUT))?);
    let output_pool = request.add_pool(SharedMemory::from_bytes(&f32_bytes(
        &[OUTPUT_SENTINEL; VALID_INPUT.len()],
    ))?);
    debug_assert_eq!((input_pool, output_pool), (INPUT_POOL, OUTPUT_POOL));

    request
        .inputs
        .push(RequestArgument::new(DataLocation::new(input_pool, 0, TENSOR_BYTES)));
    request
        .outputs
        .push(RequestArgument::new(DataLocation::new(output_pool, 0, TENSOR_BYTES)));
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::OperandType;
    use crate::values::TypedValues;

    #[test]
    fn test_valid_request_pools() {
        let request = create_valid_test_request().unwrap();
        assert_eq!(request.pools.len(), 2);
        assert_eq!(request.pools[0].len(), 16);
        assert_eq!(request.pools[1].len(), 16);

        let output = request.pools[1].read(0, 16).unwrap();
        assert_eq!(
            TypedValues::decode(OperandType::TensorFloat32, &output).unwrap(),
            TypedValues::Float32(vec![OUTPUT_SENTINEL; 4])
        );
    }

    #[test]
    fn test_malformed_fixtures_change_one_thing() {
        let valid = create_valid_test_request().unwrap();

        let request = RequestFixture::PoolIndexOutOfRange.build().unwrap();
        assert_eq!(request.inputs[0].location.pool_index, 2);
        assert_eq!(request.outputs, valid.outputs);

        let request = RequestFixture::DimensionMismatch.build().unwrap();
        assert_eq!(request.inputs[0].location, valid.inputs[0].location);
        assert_eq!(request.inputs[0].dimensions.len(), 8);

        let request = RequestFixture::UndersizedPool.build().unwrap();
        assert_eq!(request.inputs, valid.inputs);
        assert_eq!(request.outputs, valid.outputs);
        assert_eq!(request.pools[1].len(), 8);
    }

    #[test]
    fn test_fixtures_get_fresh_pools() {
        let a = create_valid_test_request().unwrap();
        let b = create_valid_test_request().unwrap();
        assert!(!a.pools[1].ptr_eq(&b.pools[1]));
    }
}
