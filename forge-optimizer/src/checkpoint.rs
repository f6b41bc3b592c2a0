//! The optimizer's resumable checkpoint: `{cluster_id, attempts,
//! last_improvement_at, best_score, pending_strategies}`, persisted as
//! a `Performance`-kind artifact so a crash or shutdown resumes from
//! the same point rather than restarting the cluster from scratch.

use chrono::{DateTime, Utc};
use forge_core::{ArtifactId, ClusterId, ForgeResult};
use forge_store::{ArtifactStore, StoreOptions};
use forge_types::{Artifact, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One cluster's optimization progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterCheckpoint {
    /// Which cluster this progress belongs to.
    pub cluster_id: ClusterId,
    /// Iterations run so far.
    pub attempts: u32,
    /// When the canonical last changed, if it ever has.
    pub last_improvement_at: Option<DateTime<Utc>>,
    /// The current canonical's fitness score.
    pub best_score: f32,
    /// Synthesis strategies not yet tried this run, consumed one per
    /// iteration (in queue order); once exhausted, `ClusterConfig::strategy`
    /// is used for the remaining iterations.
    pub pending_strategies: Vec<String>,
}

impl ClusterCheckpoint {
    /// A fresh checkpoint for a cluster that has never been optimized.
    pub fn fresh(cluster_id: ClusterId, pending_strategies: Vec<String>) -> Self {
        Self { cluster_id, attempts: 0, last_improvement_at: None, best_score: 0.0, pending_strategies }
    }

    fn artifact_id(cluster_id: &ClusterId) -> ArtifactId {
        ArtifactId::from(format!("optimizer-checkpoint-{}", cluster_id.as_str()))
    }

    /// Load the checkpoint for `cluster_id`, or `None` if this cluster
    /// has never been optimized before.
    pub async fn load(store: &Arc<dyn ArtifactStore>, cluster_id: &ClusterId) -> ForgeResult<Option<Self>> {
        let Some(artifact) = store.get(&Self::artifact_id(cluster_id)).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&artifact.content).ok())
    }

    /// Persist this checkpoint, overwriting any prior state for the
    /// same cluster.
    pub async fn save(&self, store: &Arc<dyn ArtifactStore>) -> ForgeResult<()> {
        let artifact = Artifact::new(
            Self::artifact_id(&self.cluster_id),
            ArtifactKind::Performance,
            format!("optimizer-checkpoint:{}", self.cluster_id),
            "cluster optimizer resumable checkpoint",
            serde_json::to_string(self).unwrap_or_default(),
            Utc::now(),
        );
        store.store(artifact, StoreOptions { auto_embed: false, overwrite: true }).await?;
        Ok(())
    }
}
