//! Rolling performance records used by the Router and the Cluster
//! Optimizer to compute adaptive timeouts and routing/selection fitness.

use forge_core::{DurationMs, ToolId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Severity of a tool failure, mapped to a fixed quality-score
/// penalty.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSeverity {
    /// Minor, cosmetic, or easily recovered failure.
    Low,
    /// Failure that degraded the result but didn't block progress.
    Medium,
    /// Failure that blocked the enclosing operation.
    High,
}

impl FailureSeverity {
    /// The quality-score penalty this severity applies to the
    /// targeted artifact.
    pub fn quality_penalty(self) -> f32 {
        match self {
            Self::Low => -0.01,
            Self::Medium => -0.05,
            Self::High => -0.10,
        }
    }
}

/// A record of one failed tool invocation. Stored as a FAILURE-kind
/// artifact's structured content.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The tool that failed.
    pub tool_id: ToolId,
    /// What the caller was trying to do.
    pub scenario_text: String,
    /// The raw error message.
    pub error_message: String,
    /// How severe this failure was.
    pub severity: FailureSeverity,
}

impl FailureRecord {
    /// Construct a new failure record.
    pub fn new(
        tool_id: ToolId,
        scenario_text: impl Into<String>,
        error_message: impl Into<String>,
        severity: FailureSeverity,
    ) -> Self {
        Self {
            tool_id,
            scenario_text: scenario_text.into(),
            error_message: error_message.into(),
            severity,
        }
    }
}

/// Bounded rolling window of recent execution times for a task type
/// (a tool, a model role, or a backend), with derived latency/success
/// statistics used to compute adaptive timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTypePerformanceRecord {
    capacity: usize,
    durations: VecDeque<DurationMs>,
    successes: VecDeque<bool>,
}

impl TaskTypePerformanceRecord {
    /// A new, empty record bounded to the last `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            durations: VecDeque::with_capacity(capacity),
            successes: VecDeque::with_capacity(capacity),
        }
    }

    /// Record one execution's outcome, evicting the oldest sample if
    /// the window is full.
    pub fn record(&mut self, duration: DurationMs, success: bool) {
        if self.durations.len() == self.capacity {
            self.durations.pop_front();
            self.successes.pop_front();
        }
        self.durations.push_back(duration);
        self.successes.push_back(success);
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    /// `true` if no samples have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Arithmetic mean execution time.
    pub fn mean(&self) -> Option<DurationMs> {
        if self.durations.is_empty() {
            return None;
        }
        let total: u64 = self.durations.iter().map(DurationMs::as_millis).sum();
        Some(DurationMs::from_millis(total / self.durations.len() as u64))
    }

    /// Median execution time.
    pub fn median(&self) -> Option<DurationMs> {
        self.percentile(0.5)
    }

    /// 95th percentile execution time, the basis for adaptive
    /// timeouts.
    pub fn p95(&self) -> Option<DurationMs> {
        self.percentile(0.95)
    }

    /// Fraction of recorded executions that succeeded, in `[0, 1]`.
    pub fn success_rate(&self) -> Option<f32> {
        if self.successes.is_empty() {
            return None;
        }
        let succeeded = self.successes.iter().filter(|s| **s).count();
        Some(succeeded as f32 / self.successes.len() as f32)
    }

    /// Adaptive timeout: `p95 * safety_factor`. Falls back to `None`
    /// when no samples exist, letting the caller pick a static
    /// default.
    pub fn adaptive_timeout(&self, safety_factor: f64) -> Option<DurationMs> {
        self.p95()
            .map(|p| DurationMs::from_millis((p.as_millis() as f64 * safety_factor) as u64))
    }

    fn percentile(&self, fraction: f64) -> Option<DurationMs> {
        let mut sorted: Vec<u64> = self
            .durations
            .iter()
            .zip(self.successes.iter())
            .filter(|(_, success)| **success)
            .map(|(d, _)| d.as_millis())
            .collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64 - 1.0) * fraction).round() as usize;
        Some(DurationMs::from_millis(sorted[idx]))
    }
}
