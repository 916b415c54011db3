//! Run report

use serde::Serialize;
use std::fmt;

use crate::error::VtsResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    /// The case hit a fatal error and stopped the run
    Aborted,
    /// Not run because an earlier case aborted the run
    Skipped,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed => "FAILED",
            Verdict::Aborted => "ABORTED",
            Verdict::Skipped => "SKIPPED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub verdict: Verdict,
    pub failures: Vec<String>,
    /// Checks evaluated
    pub checks: usize,
    pub duration_us: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuiteReport {
    pub cases: Vec<CaseResult>,
    pub aborted: bool,
    pub abort_reason: Option<String>,
}

impl SuiteReport {
    pub fn count(&self, verdict: Verdict) -> usize {
        self.cases.iter().filter(|c| c.verdict == verdict).count()
    }

    /// Every selected case passed and the run finished.
    pub fn all_passed(&self) -> bool {
        !self.aborted && self.cases.iter().all(|c| c.verdict == Verdict::Passed)
    }

    /// Process exit code: 0 iff [`all_passed`](Self::all_passed).
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    pub fn case(&self, name: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn to_json(&self) -> VtsResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::internal_error!("report serialization: {}", e))
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            writeln!(f, "[{:>7}] {}", case.verdict, case.name)?;
            for failure in &case.failures {
                writeln!(f, "          {}", failure)?;
            }
        }
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.count(Verdict::Passed),
            self.count(Verdict::Failed),
            self.count(Verdict::Skipped)
        )?;
        if let Some(reason) = &self.abort_reason {
            write!(f, "; run aborted: {}", reason)?;
        }
        Ok(())
    }
}
