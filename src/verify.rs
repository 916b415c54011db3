//! Result verification
//!
//! [`Checks`] collects the assertions of one case: `expect_*` records a
//! failure and lets the case continue, `require_*` stops it with
//! [`crate::VtsError::Assertion`]. Output pools are decoded by the operand's
//! element type and compared element-wise, exactly unless a tolerance is
//! configured.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::driver::ExecuteReport;
use crate::error::VtsResult;
use crate::hal::{ErrorStatus, Model, Request};
use crate::values::TypedValues;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checks {
    failures: Vec<String>,
    performed: usize,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "check failed");
        self.failures.push(message);
    }

    pub fn expect_true(&mut self, what: &str, condition: bool) -> bool {
        self.performed += 1;
        if !condition {
            self.fail(format!("{}: expected true", what));
        }
        condition
    }

    pub fn expect_eq<T: PartialEq + Debug>(&mut self, what: &str, actual: T, expected: T) -> bool {
        self.performed += 1;
        let equal = actual == expected;
        if !equal {
            self.fail(format!("{}: expected {:?}, got {:?}", what, expected, actual));
        }
        equal
    }

    /// Status codes are reported by their contract names.
    pub fn expect_status(
        &mut self,
        what: &str,
        actual: ErrorStatus,
        expected: ErrorStatus,
    ) -> bool {
        self.performed += 1;
        let equal = actual == expected;
        if !equal {
            self.fail(format!("{}: expected {}, got {}", what, expected, actual));
        }
        equal
    }

    pub fn require_true(&mut self, what: &str, condition: bool) -> VtsResult<()> {
        if self.expect_true(what, condition) {
            Ok(())
        } else {
            Err(crate::assertion_error!("{}: expected true", what))
        }
    }

    pub fn require_eq<T: PartialEq + Debug>(
        &mut self,
        what: &str,
        actual: T,
        expected: T,
    ) -> VtsResult<()> {
        let message = format!("{}: expected {:?}, got {:?}", what, expected, actual);
        if self.expect_eq(what, actual, expected) {
            Ok(())
        } else {
            Err(crate::assertion_error!(message))
        }
    }

    pub fn require_status(
        &mut self,
        what: &str,
        actual: ErrorStatus,
        expected: ErrorStatus,
    ) -> VtsResult<()> {
        if self.expect_status(what, actual, expected) {
            Ok(())
        } else {
            Err(crate::assertion_error!(
                "{}: expected {}, got {}",
                what,
                expected,
                actual
            ))
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Number of checks evaluated so far.
    pub fn performed(&self) -> usize {
        self.performed
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failures
    }
}

/// Decode output `position` of `request` as the element type of the matching
/// model output operand.
pub fn read_output(model: &Model, request: &Request, position: usize) -> VtsResult<TypedValues> {
    let index = *model
        .output_indexes
        .get(position)
        .ok_or_else(|| crate::assertion_error!("model has no output {}", position))?;
    let operand = model
        .operand(index)
        .ok_or_else(|| crate::assertion_error!("output operand {} missing", index))?;
    let argument = request
        .outputs
        .get(position)
        .ok_or_else(|| crate::assertion_error!("request has no output {}", position))?;
    let location = &argument.location;
    let pool = request
        .pool(location.pool_index)
        .ok_or_else(|| crate::assertion_error!("output pool {} missing", location.pool_index))?;
    let bytes = pool.read(location.offset as usize, location.length as usize)?;
    TypedValues::decode(operand.operand_type, &bytes)
}

/// Element-wise comparison; returns a description of the first mismatch.
///
/// Float elements match when `|actual - expected| <= tolerance` (so NaN
/// never matches); every other type compares exactly.
pub fn compare_values(
    actual: &TypedValues,
    expected: &TypedValues,
    tolerance: f32,
) -> Result<(), String> {
    if actual.kind() != expected.kind() {
        return Err(format!(
            "element type {} does not match expected {}",
            actual.kind(),
            expected.kind()
        ));
    }
    if actual.len() != expected.len() {
        return Err(format!(
            "{} elements, expected {}",
            actual.len(),
            expected.len()
        ));
    }

    let mismatch = match (actual, expected) {
        (TypedValues::Float32(a), TypedValues::Float32(e)) => a
            .iter()
            .zip(e)
            .position(|(&x, &y)| !((x - y).abs() <= tolerance))
            .map(|i| format!("element {}: got {}, expected {}", i, a[i], e[i])),
        (TypedValues::Int32(a), TypedValues::Int32(e)) => first_difference(a, e),
        (TypedValues::Uint32(a), TypedValues::Uint32(e)) => first_difference(a, e),
        (TypedValues::Quant8(a), TypedValues::Quant8(e)) => first_difference(a, e),
        _ => None,
    };
    match mismatch {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

fn first_difference<T: PartialEq + Debug>(actual: &[T], expected: &[T]) -> Option<String> {
    actual
        .iter()
        .zip(expected)
        .position(|(x, y)| x != y)
        .map(|i| format!("element {}: got {:?}, expected {:?}", i, actual[i], expected[i]))
}

/// Failure fixture: the expected status, and a signal that reached a
/// terminal state. Output memory is not inspected.
pub fn verify_execution_failure(
    checks: &mut Checks,
    report: &ExecuteReport,
    expected: ErrorStatus,
) {
    checks.expect_status("execute status", report.status, expected);
    checks.expect_true(
        "execution signal reached a terminal state",
        report.signal.is_terminal(),
    );
}

/// Compare every expected, non-ignored output against the request's pools.
pub fn verify_outputs(
    checks: &mut Checks,
    model: &Model,
    request: &Request,
    expected: &BTreeMap<usize, TypedValues>,
    is_ignored: impl Fn(usize) -> bool,
    tolerance: f32,
) -> VtsResult<()> {
    for (&position, values) in expected {
        if is_ignored(position) {
            tracing::trace!(position, "output ignored");
            continue;
        }
        let actual = read_output(model, request, position)?;
        checks.performed += 1;
        if let Err(mismatch) = compare_values(&actual, values, tolerance) {
            checks.fail(format!("output {}: {}", position, mismatch));
        }
    }
    Ok(())
}
