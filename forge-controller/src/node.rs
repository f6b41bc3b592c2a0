//! The node artifact set STORE produces on disk, and the optional
//! post-store quality bonus computed from running it.

use forge_core::NodeId;
use std::path::{Path, PathBuf};

/// Everything STORE writes under `node_id/`. Each field may be empty
/// when the generator didn't produce that artifact; a missing file is
/// logged, never a reason to fail the store.
#[derive(Debug, Clone, Default)]
pub struct NodeArtifacts {
    /// Entry-point source.
    pub source: String,
    /// Unit test source.
    pub unit_test: String,
    /// Feature-style behavior spec.
    pub behavior_spec: String,
    /// Load-test script.
    pub load_test_script: String,
    /// Serialized plan transcript.
    pub plan_transcript: String,
    /// Detailed specification document.
    pub specification: String,
}

/// The conventional node directory for `node_id` under `nodes_root`.
pub fn node_dir(nodes_root: &Path, node_id: &NodeId) -> PathBuf {
    nodes_root.join(node_id.as_str())
}

/// Write every file in the node artifact set plus `registry_entry` as
/// `metadata.json`. A failure writing any one file is logged and
/// skipped rather than aborting the rest — STORE must not fail just
/// because, say, the load-test script came back empty.
pub fn write_node(nodes_root: &Path, node_id: &NodeId, artifacts: &NodeArtifacts, registry_entry: &serde_json::Value) {
    let dir = node_dir(nodes_root, node_id);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(node_id = %node_id, error = %e, "failed to create node directory");
        return;
    }

    let files: [(&str, &str); 6] = [
        ("main.py", &artifacts.source),
        ("test_main.py", &artifacts.unit_test),
        ("behavior_spec.md", &artifacts.behavior_spec),
        ("load_test.py", &artifacts.load_test_script),
        ("plan.json", &artifacts.plan_transcript),
        ("specification.md", &artifacts.specification),
    ];
    for (name, content) in files {
        if content.is_empty() {
            tracing::warn!(node_id = %node_id, file = name, "node artifact missing, skipping");
            continue;
        }
        if let Err(e) = std::fs::write(dir.join(name), content) {
            tracing::warn!(node_id = %node_id, file = name, error = %e, "failed to write node artifact file");
        }
    }

    match serde_json::to_string_pretty(registry_entry) {
        Ok(json) => {
            if let Err(e) = std::fs::write(dir.join("metadata.json"), json) {
                tracing::warn!(node_id = %node_id, error = %e, "failed to write node registry entry");
            }
        }
        Err(e) => tracing::warn!(node_id = %node_id, error = %e, "failed to serialize node registry entry"),
    }
}

/// Measurements from the optional post-store behavior-spec and
/// load-test runs, feeding the quality bonus.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostStoreMeasurements {
    /// The behavior spec runner reported a pass.
    pub behavior_spec_passed: bool,
    /// Fraction of the load test's target throughput achieved, in `[0, 1]`.
    pub throughput_fraction: f32,
    /// Observed latency was under 100ms.
    pub latency_under_100ms: bool,
    /// Observed peak memory was under 10MB.
    pub peak_memory_under_10mb: bool,
}

/// Apply the post-store quality bonus to `base`: `+0.2` for a behavior
/// spec pass, up to `+0.3` scaled by throughput fraction, `+0.1` each
/// for sub-100ms latency and sub-10MB peak memory. The raw sum never
/// exceeds 1.7, and the result is re-clamped to `[0, 1]` for storage.
pub fn apply_quality_bonus(base: f32, measurements: &PostStoreMeasurements) -> f32 {
    let mut bonus = 0.0f32;
    if measurements.behavior_spec_passed {
        bonus += 0.2;
    }
    bonus += 0.3 * measurements.throughput_fraction.clamp(0.0, 1.0);
    if measurements.latency_under_100ms {
        bonus += 0.1;
    }
    if measurements.peak_memory_under_10mb {
        bonus += 0.1;
    }
    (base + bonus).min(1.7).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let node_id = NodeId::from("n1");
        let artifacts = NodeArtifacts { source: "print('hi')".into(), ..Default::default() };
        write_node(dir.path(), &node_id, &artifacts, &serde_json::json!({"node_id": "n1"}));
        let node_path = node_dir(dir.path(), &node_id);
        assert!(node_path.join("main.py").exists());
        assert!(!node_path.join("test_main.py").exists());
        assert!(node_path.join("metadata.json").exists());
    }

    #[test]
    fn full_bonus_caps_at_one() {
        let measurements = PostStoreMeasurements {
            behavior_spec_passed: true,
            throughput_fraction: 1.0,
            latency_under_100ms: true,
            peak_memory_under_10mb: true,
        };
        assert_eq!(apply_quality_bonus(1.0, &measurements), 1.0);
    }

    #[test]
    fn partial_bonus_adds_to_base() {
        let measurements = PostStoreMeasurements { behavior_spec_passed: true, ..Default::default() };
        assert!((apply_quality_bonus(0.5, &measurements) - 0.7).abs() < 1e-6);
    }
}
