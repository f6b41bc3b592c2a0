//! Per-model rolling performance windows, persisted as `Performance`
//! artifacts so adaptive timeouts survive a restart.

use chrono::Utc;
use forge_core::{ArtifactId, DurationMs};
use forge_store::{ArtifactStore, StoreOptions};
use forge_types::{Artifact, ArtifactKind, TaskTypePerformanceRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const WINDOW_CAPACITY: usize = 100;
const MIN_SAMPLE_COUNT: usize = 5;

/// Holds one [`TaskTypePerformanceRecord`] per model, optionally
/// mirroring updates into an [`ArtifactStore`] for persistence.
pub struct WindowTable {
    windows: RwLock<HashMap<String, TaskTypePerformanceRecord>>,
    store: Option<Arc<dyn ArtifactStore>>,
}

impl WindowTable {
    /// Create a table with no persistence.
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Create a table that mirrors every update into `store` as a
    /// `Performance` artifact keyed by model id.
    pub fn with_store(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            store: Some(store),
        }
    }

    /// Compute the adaptive timeout for `model_id`: `p95 *
    /// safety_factor` if the window has at least [`MIN_SAMPLE_COUNT`]
    /// samples, otherwise `base_timeout`.
    pub async fn timeout_for(
        &self,
        model_id: &str,
        base_timeout: DurationMs,
        safety_factor: f64,
    ) -> DurationMs {
        let windows = self.windows.read().await;
        match windows.get(model_id).filter(|r| r.len() >= MIN_SAMPLE_COUNT) {
            Some(record) => record
                .adaptive_timeout(safety_factor)
                .map(|t| DurationMs::from_millis(t.as_millis().max(base_timeout.as_millis())))
                .unwrap_or(base_timeout),
            None => base_timeout,
        }
    }

    /// Record a completed request and, if persistence is configured,
    /// write the updated statistics back as a `Performance` artifact.
    pub async fn record(&self, model_id: &str, elapsed: DurationMs, success: bool) {
        let snapshot = {
            let mut windows = self.windows.write().await;
            let record = windows
                .entry(model_id.to_string())
                .or_insert_with(|| TaskTypePerformanceRecord::new(WINDOW_CAPACITY));
            record.record(elapsed, success);
            (record.mean(), record.success_rate(), record.len())
        };
        if let Some(store) = &self.store {
            let (mean, success_rate, len) = snapshot;
            let content = serde_json::json!({
                "model_id": model_id,
                "mean_ms": mean.map(|m| m.as_millis()),
                "success_rate": success_rate,
                "sample_count": len,
            })
            .to_string();
            let artifact = Artifact::new(
                ArtifactId::from(format!("router-performance:{model_id}")),
                ArtifactKind::Performance,
                format!("router performance for {model_id}"),
                content.clone(),
                content,
                Utc::now(),
            );
            if let Err(e) = store
                .store(
                    artifact,
                    StoreOptions {
                        auto_embed: false,
                        overwrite: true,
                    },
                )
                .await
            {
                tracing::warn!(model_id, error = %e, "failed to persist router performance artifact");
            }
        }
    }

    /// Success rate for `model_id`, or `None` with no samples yet.
    pub async fn success_rate(&self, model_id: &str) -> Option<f64> {
        self.windows
            .read()
            .await
            .get(model_id)
            .and_then(|r| r.success_rate())
            .map(|r| r as f64)
    }

    /// Whether `model_id` has at least `n` recorded samples.
    pub async fn has_min_samples(&self, model_id: &str, n: usize) -> bool {
        self.windows
            .read()
            .await
            .get(model_id)
            .is_some_and(|r| r.len() >= n)
    }
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new()
    }
}
