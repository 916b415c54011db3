//! Unified error handling for the conformance harness
//!
//! Device outcomes are never errors here: they are [`ErrorStatus`] values that
//! cases assert on. [`VtsError`] covers what goes wrong on the harness side:
//! - Assertion failures (a case observed something other than expected)
//! - Signal misuse (broken synchronization contract, fatal to the run)
//! - Lifecycle misuse (driving a case out of order)
//! - Memory pool and decoding failures
//! - Configuration errors
//!
//! [`ErrorStatus`]: crate::hal::ErrorStatus

use std::fmt;

use crate::hal::validate::ValidationError;

/// Unified error type for the harness
#[derive(Debug, thiserror::Error)]
pub enum VtsError {
    // ========== Case Errors ==========
    /// A `require` check failed and the case was halted
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// The lifecycle driver was asked for a transition its state forbids
    #[error("Invalid lifecycle transition: cannot {action} from {from}")]
    InvalidStateTransition { from: String, action: &'static str },

    /// Structural model/request validation failed
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // ========== Synchronization Errors ==========
    /// A completion signal was notified more than once
    #[error("Completion signal misuse: {0}")]
    SignalMisuse(String),

    // ========== Memory Errors ==========
    /// Creating a shared memory pool failed
    #[error("Shared memory mapping failed: {0}")]
    MemoryMapFailed(String),

    /// A pool access fell outside the mapped region
    #[error("Pool access out of bounds: offset={offset}, length={length}, pool size={size}")]
    PoolOutOfBounds {
        offset: usize,
        length: usize,
        size: usize,
    },

    /// Pool bytes could not be decoded as the declared element type
    #[error("Decode failed: {0}")]
    Decode(String),

    // ========== Configuration Errors ==========
    /// Invalid harness or device configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Internal Errors ==========
    /// Internal lock poisoned
    #[error("Internal lock poisoned: {0}")]
    LockPoisoned(String),

    /// Internal error (indicates a bug in the harness)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl VtsError {
    /// Categorize the error for handling decisions
    ///
    /// The suite runner aborts on [`ErrorCategory::Fatal`] and records every
    /// other category as a failure of the current case only.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VtsError::SignalMisuse(_) => ErrorCategory::Fatal,

            VtsError::Assertion(_) | VtsError::Validation(_) => ErrorCategory::Assertion,

            VtsError::MemoryMapFailed(_)
            | VtsError::PoolOutOfBounds { .. }
            | VtsError::Decode(_) => ErrorCategory::Device,

            VtsError::InvalidConfiguration(_) => ErrorCategory::User,

            VtsError::InvalidStateTransition { .. }
            | VtsError::Io(_)
            | VtsError::LockPoisoned(_)
            | VtsError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// True when the error breaks the synchronization contract and the
    /// whole run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self.category(), ErrorCategory::Fatal)
    }

    /// True for ordinary case failures (assertions and validation)
    pub fn is_assertion(&self) -> bool {
        matches!(self.category(), ErrorCategory::Assertion)
    }
}

/// Error category for handling decisions
///
/// - Fatal: abort the run, the harness itself cannot be trusted
/// - Assertion: the case failed, continue with the next case
/// - Device: memory or decoding problem around device-owned data
/// - User: fix the configuration
/// - Internal: harness bug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Fatal,
    Assertion,
    Device,
    User,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Fatal => write!(f, "Fatal"),
            ErrorCategory::Assertion => write!(f, "Assertion"),
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for VtsError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VtsError::LockPoisoned(err.to_string())
    }
}

/// Result alias used throughout the harness
pub type VtsResult<T> = std::result::Result<T, VtsError>;

// ========== Helper Macros ==========

/// Create an assertion error with context
///
/// # Examples
/// ```ignore
/// return Err(assertion_error!("expected {} outputs, got {}", 1, n));
/// ```
#[macro_export]
macro_rules! assertion_error {
    ($msg:expr) => {
        $crate::error::VtsError::Assertion($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::VtsError::Assertion(format!($fmt, $($arg)*))
    };
}

/// Create an internal error with context
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::VtsError::InternalError($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::VtsError::InternalError(format!($fmt, $($arg)*))
    };
}

/// Create a configuration error with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::VtsError::InvalidConfiguration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::VtsError::InvalidConfiguration(format!($fmt, $($arg)*))
    };
}
