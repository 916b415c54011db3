//! Conformance suite and runner
//!
//! [`ConformanceSuite::standard`] lists every case in a fixed order. The
//! runner executes the cases selected by the environment's filter, one at a
//! time, each inside its own `tracing` span. A fatal error (signal misuse)
//! aborts the run; the remaining cases are reported as skipped.

pub mod cases;
pub mod report;

use std::time::Instant;

use crate::environment::VtsEnvironment;
use crate::fixtures::{all_generated_cases, ModelFixture, RequestFixture};
use crate::verify::Checks;

pub use cases::ConformanceCase;
pub use report::{CaseResult, SuiteReport, Verdict};

#[derive(Debug, Clone, Default)]
pub struct ConformanceSuite {
    cases: Vec<ConformanceCase>,
}

impl ConformanceSuite {
    pub fn new(cases: Vec<ConformanceCase>) -> Self {
        Self { cases }
    }

    /// Device queries, preparation, execution, then the generated examples.
    pub fn standard() -> Self {
        let mut suite = Self::default();
        suite.push(ConformanceCase::new("create_device", cases::create_device));
        suite.push(ConformanceCase::new("status_test", cases::status_test));
        suite.push(ConformanceCase::new(
            "get_capabilities_test",
            cases::get_capabilities_test,
        ));

        suite.push(ConformanceCase::new(
            "supported_operations_positive_test",
            cases::supported_operations_positive_test,
        ));
        for fixture in ModelFixture::MALFORMED {
            suite.push(ConformanceCase::new(
                format!("supported_operations_negative_test_{}", fixture.name()),
                move |env, checks| cases::supported_operations_negative_test(env, checks, fixture),
            ));
        }
        suite.push(ConformanceCase::new(
            "supported_operations_unsupported_test",
            cases::supported_operations_unsupported_test,
        ));

        suite.push(ConformanceCase::new(
            "simple_prepare_model_positive_test",
            cases::simple_prepare_model_positive_test,
        ));
        for fixture in ModelFixture::ALL.into_iter().filter(|f| *f != ModelFixture::Valid) {
            suite.push(ConformanceCase::new(
                format!("simple_prepare_model_negative_test_{}", fixture.name()),
                move |env, checks| cases::simple_prepare_model_negative_test(env, checks, fixture),
            ));
        }

        suite.push(ConformanceCase::new(
            "simple_execute_graph_positive_test",
            cases::simple_execute_graph_positive_test,
        ));
        for fixture in RequestFixture::MALFORMED {
            suite.push(ConformanceCase::new(
                format!("simple_execute_graph_negative_test_{}", fixture.name()),
                move |env, checks| cases::simple_execute_graph_negative_test(env, checks, fixture),
            ));
        }

        for generated in all_generated_cases() {
            let name = format!("generated_{}", generated.name);
            suite.push(ConformanceCase::new(name, move |env, checks| {
                cases::generated_test(env, checks, &generated)
            }));
        }
        suite
    }

    pub fn push(&mut self, case: ConformanceCase) {
        self.cases.push(case);
    }

    pub fn cases(&self) -> &[ConformanceCase] {
        &self.cases
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(ConformanceCase::name).collect()
    }

    /// Run every case selected by `env`'s filter.
    pub fn run(&self, env: &VtsEnvironment) -> SuiteReport {
        let mut report = SuiteReport::default();

        for case in self.cases.iter().filter(|c| env.config().selects(c.name())) {
            if report.aborted {
                report.cases.push(CaseResult {
                    name: case.name().to_string(),
                    verdict: Verdict::Skipped,
                    failures: Vec::new(),
                    checks: 0,
                    duration_us: 0,
                });
                continue;
            }

            let span = tracing::info_span!("case", case = case.name());
            let _entered = span.enter();
            let started = Instant::now();
            let mut checks = Checks::new();
            let outcome = case.run(env, &mut checks);
            let duration_us = started.elapsed().as_micros() as u64;
            let performed = checks.performed();
            let mut failures = checks.into_failures();

            let verdict = match outcome {
                Ok(()) if failures.is_empty() => Verdict::Passed,
                Ok(()) => Verdict::Failed,
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "fatal error, aborting run");
                    failures.push(e.to_string());
                    report.aborted = true;
                    report.abort_reason = Some(e.to_string());
                    Verdict::Aborted
                }
                // The halting check already recorded its message.
                Err(e) if e.is_assertion() && !failures.is_empty() => Verdict::Failed,
                Err(e) => {
                    failures.push(e.to_string());
                    Verdict::Failed
                }
            };

            match verdict {
                Verdict::Passed => tracing::info!(duration_us, "case passed"),
                _ => tracing::warn!(%verdict, failures = failures.len(), "case did not pass"),
            }

            report.cases.push(CaseResult {
                name: case.name().to_string(),
                verdict,
                failures,
                checks: performed,
                duration_us,
            });
        }

        report
    }
}
