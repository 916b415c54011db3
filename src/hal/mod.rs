//! Device contract: status codes, capabilities, models, requests, the
//! [`Device`] trait and structural validation.

pub mod device;
pub mod model;
pub mod request;
pub mod types;
pub mod validate;

pub use device::{Device, PreparedModelGuard, PreparedModelId};
pub use model::{
    DataLocation, FusedActivation, Model, Operand, OperandLifeTime, OperandType, Operation,
    OperationType,
};
pub use request::{Request, RequestArgument};
pub use types::{Capabilities, DeviceStatus, ErrorStatus, OperationTuple, PerformanceInfo};
pub use validate::{effective_dimensions, validate_model, validate_request, ValidationError};
