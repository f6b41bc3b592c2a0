//! Per-variant fitness: a weighted sum of `{latency, memory, success_rate,
//! test_coverage}`, read off an artifact's free-form metadata bag.

use forge_types::{Artifact, ArtifactKind};

const LATENCY_MS_KEY: &str = "latency_ms";
const MEMORY_MB_KEY: &str = "memory_mb";
const SUCCESS_RATE_KEY: &str = "success_rate";
const TEST_COVERAGE_KEY: &str = "test_coverage";

/// A variant's raw performance measurements, normalized into `[0, 1]`
/// scores before weighting. Latency and memory are inverted (lower is
/// fitter) against a reference ceiling.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceMetrics {
    /// Observed latency in milliseconds.
    pub latency_ms: f32,
    /// Observed peak memory in megabytes.
    pub memory_mb: f32,
    /// Fraction of runs that succeeded, in `[0, 1]`.
    pub success_rate: f32,
    /// Fraction of the behavior spec/unit tests covered, in `[0, 1]`.
    pub test_coverage: f32,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self { latency_ms: 1000.0, memory_mb: 100.0, success_rate: 0.0, test_coverage: 0.0 }
    }
}

impl PerformanceMetrics {
    /// Read metrics off `artifact.metadata`, falling back to
    /// [`PerformanceMetrics::default`] for any field that was never
    /// recorded.
    pub fn from_artifact(artifact: &Artifact) -> Self {
        let get = |key: &str| artifact.metadata.get(key).and_then(serde_json::Value::as_f64).map(|v| v as f32);
        let default = Self::default();
        Self {
            latency_ms: get(LATENCY_MS_KEY).unwrap_or(default.latency_ms),
            memory_mb: get(MEMORY_MB_KEY).unwrap_or(default.memory_mb),
            success_rate: get(SUCCESS_RATE_KEY).unwrap_or(default.success_rate),
            test_coverage: get(TEST_COVERAGE_KEY).unwrap_or(default.test_coverage),
        }
    }

    /// Write these metrics into `artifact.metadata`, replacing whatever
    /// was there before.
    pub fn write_to(&self, artifact: &mut Artifact) {
        artifact.metadata.set(LATENCY_MS_KEY, serde_json::json!(self.latency_ms));
        artifact.metadata.set(MEMORY_MB_KEY, serde_json::json!(self.memory_mb));
        artifact.metadata.set(SUCCESS_RATE_KEY, serde_json::json!(self.success_rate));
        artifact.metadata.set(TEST_COVERAGE_KEY, serde_json::json!(self.test_coverage));
    }
}

/// Weighted-sum fitness weights, configurable per [`ArtifactKind`] so a
/// long-running Workflow can weight latency differently than a small
/// Function.
#[derive(Debug, Clone, Copy)]
pub struct FitnessWeights {
    /// Weight on the inverted, normalized latency score.
    pub latency: f32,
    /// Weight on the inverted, normalized memory score.
    pub memory: f32,
    /// Weight on the success rate.
    pub success_rate: f32,
    /// Weight on test coverage.
    pub test_coverage: f32,
    /// Latency, in milliseconds, that normalizes to a score of zero.
    pub latency_ceiling_ms: f32,
    /// Memory, in megabytes, that normalizes to a score of zero.
    pub memory_ceiling_mb: f32,
}

impl Default for FitnessWeights {
    /// Tuned toward correctness over raw speed: success rate and test
    /// coverage carry most of the weight, latency and memory are
    /// tie-breakers between otherwise-correct variants.
    fn default() -> Self {
        Self {
            latency: 0.15,
            memory: 0.1,
            success_rate: 0.5,
            test_coverage: 0.25,
            latency_ceiling_ms: 2000.0,
            memory_ceiling_mb: 256.0,
        }
    }
}

impl FitnessWeights {
    /// Weights for a given artifact kind. Functions default to the
    /// baseline weighting; Workflows weight latency and memory more
    /// heavily, since a multi-step workflow's resource footprint
    /// compounds across steps.
    pub fn for_kind(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Workflow => Self { latency: 0.25, memory: 0.2, success_rate: 0.4, test_coverage: 0.15, ..Self::default() },
            _ => Self::default(),
        }
    }

    /// Weighted sum of the four normalized dimensions. `success_rate`
    /// and `test_coverage` are used as-is; `latency`/`memory` are
    /// inverted against their ceiling and clamped to `[0, 1]` first.
    pub fn score(&self, metrics: &PerformanceMetrics) -> f32 {
        let latency_score = (1.0 - metrics.latency_ms / self.latency_ceiling_ms.max(1.0)).clamp(0.0, 1.0);
        let memory_score = (1.0 - metrics.memory_mb / self.memory_ceiling_mb.max(1.0)).clamp(0.0, 1.0);
        let success = metrics.success_rate.clamp(0.0, 1.0);
        let coverage = metrics.test_coverage.clamp(0.0, 1.0);
        self.latency * latency_score + self.memory * memory_score + self.success_rate * success + self.test_coverage * coverage
    }
}
