//! Model and request fixtures
//!
//! Every builder returns fresh, independently owned values; nothing is
//! cached between cases.

pub mod generated;
pub mod models;
pub mod requests;

pub use generated::{all_generated_cases, build_request, GeneratedCase, MixedTypedExample};
pub use models::{
    create_unsupported_test_model, create_valid_test_model, ModelFixture, VALID_EXPECTED,
    VALID_INPUT,
};
pub use requests::{create_valid_test_request, RequestFixture, OUTPUT_POOL, OUTPUT_SENTINEL};
