//! Execution request: binds model inputs/outputs to shared memory pools.

use crate::hal::model::DataLocation;
use crate::memory::SharedMemory;

/// Binding of one model input or output to a pool region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestArgument {
    pub has_no_value: bool,
    pub location: DataLocation,
    /// Empty means "use the operand's declared dimensions".
    pub dimensions: Vec<u32>,
}

impl RequestArgument {
    pub fn new(location: DataLocation) -> Self {
        Self {
            has_no_value: false,
            location,
            dimensions: Vec::new(),
        }
    }

    pub fn no_value() -> Self {
        Self {
            has_no_value: true,
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<u32>) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// Inputs and outputs are positional: `inputs[i]` binds `model.input_indexes[i]`.
///
/// Pools are owned by the harness. Output pools are written by the device
/// between `execute` and the completion signal.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub inputs: Vec<RequestArgument>,
    pub outputs: Vec<RequestArgument>,
    pub pools: Vec<SharedMemory>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pool and return its index.
    pub fn add_pool(&mut self, pool: SharedMemory) -> u32 {
        let index = self.pools.len() as u32;
        self.pools.push(pool);
        index
    }

    pub fn pool(&self, index: u32) -> Option<&SharedMemory> {
        self.pools.get(index as usize)
    }
}
