//! Ordered dispatch over registered [`crate::StaticValidator`]s.

use crate::{StaticValidator, ValidatorCategory};
use forge_core::DurationMs;
use std::time::Instant;

fn default_timeout() -> DurationMs {
    DurationMs::from_millis(5_000)
}

/// The outcome of one validator's run, folded into a [`PipelineReport`].
#[derive(Debug, Clone)]
pub struct ValidatorOutcome {
    /// Whether the check (after any self-applied fix) is satisfied.
    pub passed: bool,
    /// Human-readable detail: what was wrong, or what was fixed.
    pub output: String,
    /// Which contract this outcome is for.
    pub category: ValidatorCategory,
    /// Wall-clock time the check took.
    pub elapsed_ms: DurationMs,
    /// Corrected source, when the validator auto-fixed rather than
    /// merely flagging. The pipeline threads this forward to later
    /// validators and into the final report.
    pub fixed_source: Option<String>,
}

/// Aggregate counts for a pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSummary {
    /// Validators that ran (cached pass reuse counts as ran).
    pub total: usize,
    /// Validators whose outcome passed.
    pub passed: usize,
    /// Validators whose outcome failed.
    pub failed: usize,
    /// Total wall-clock time for the run.
    pub elapsed_ms: DurationMs,
}

/// Which validators this run consults.
pub enum Mode {
    /// Run every registered validator.
    Full,
    /// Reuse passing outcomes from `report`; rerun only the categories
    /// that failed last time. Used after a repair attempt.
    RetryFailed(PipelineReport),
}

/// Result of one [`ValidatorPipeline::run`] call.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Whether every validator passed.
    pub passed: bool,
    /// One outcome per registered validator, in registration order.
    pub per_validator: Vec<ValidatorOutcome>,
    /// Aggregate counts.
    pub summary: PipelineSummary,
    /// The source after every auto-fix has been threaded through.
    pub final_source: String,
}

impl PipelineReport {
    /// The cached outcome for `category`, if this report has one.
    pub fn outcome_for(&self, category: ValidatorCategory) -> Option<&ValidatorOutcome> {
        self.per_validator.iter().find(|o| o.category == category)
    }
}

/// An ordered sequence of validators, dispatched in registration order.
///
/// Each validator is bounded by `timeout` (default 5s); a validator
/// that exceeds it is recorded as a failed outcome, not propagated as
/// an error — a hung validator must not hang the repair loop.
pub struct ValidatorPipeline {
    validators: Vec<Box<dyn StaticValidator>>,
    timeout: DurationMs,
}

impl ValidatorPipeline {
    /// An empty pipeline with the default per-validator timeout.
    pub fn new() -> Self {
        Self { validators: Vec::new(), timeout: default_timeout() }
    }

    /// Append a validator to the end of the pipeline.
    pub fn add(&mut self, validator: Box<dyn StaticValidator>) {
        self.validators.push(validator);
    }

    /// Override the per-validator timeout.
    pub fn with_timeout(mut self, timeout: DurationMs) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the pipeline against `source`.
    ///
    /// In [`Mode::RetryFailed`], a validator whose category passed in
    /// the prior report is skipped and its cached outcome is reused
    /// verbatim; everything else reruns against `source` (the caller
    /// is expected to have applied a repair before calling this).
    pub async fn run(&self, source: &str, mode: Mode) -> PipelineReport {
        let started = Instant::now();
        let prior = match &mode {
            Mode::RetryFailed(report) => Some(report),
            Mode::Full => None,
        };

        let mut current_source = source.to_string();
        let mut outcomes = Vec::with_capacity(self.validators.len());

        for validator in &self.validators {
            let category = validator.category();

            if let Some(cached) = prior.and_then(|r| r.outcome_for(category)) {
                if cached.passed {
                    outcomes.push(cached.clone());
                    continue;
                }
            }

            let check_started = Instant::now();
            let mut result = match tokio::time::timeout(self.timeout.to_std(), validator.validate(&current_source)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(%category, timeout_ms = %self.timeout, "validator exceeded its bound");
                    crate::outcome(category, false, format!("validator timed out after {}", self.timeout), None)
                }
            };
            result.elapsed_ms = DurationMs::from(check_started.elapsed());

            if let Some(fixed) = &result.fixed_source {
                current_source = fixed.clone();
            }
            outcomes.push(result);
        }

        let total = outcomes.len();
        let passed_count = outcomes.iter().filter(|o| o.passed).count();
        PipelineReport {
            passed: passed_count == total,
            per_validator: outcomes,
            summary: PipelineSummary {
                total,
                passed: passed_count,
                failed: total - passed_count,
                elapsed_ms: DurationMs::from(started.elapsed()),
            },
            final_source: current_source,
        }
    }
}

impl Default for ValidatorPipeline {
    fn default() -> Self {
        Self::new()
    }
}
