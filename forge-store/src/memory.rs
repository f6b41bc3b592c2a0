//! In-memory Artifact Store implementation.
//!
//! Uses a `HashMap` behind a `RwLock` for concurrent access, mirroring
//! the workspace's filesystem-backed store so both implementations
//! share the same similarity-search and tie-break logic. Suitable for
//! tests and the Cluster Optimizer's scratch clustering passes where
//! persistence across restarts is not required.

use crate::store::{ArtifactStore, LookupFilter, ScoredArtifact, StoreOptions, StoreStatistics};
use crate::{keyword, tie_break};
use async_trait::async_trait;
use chrono::Utc;
use forge_core::{ArtifactId, ForgeError, ForgeResult};
use forge_embed::EmbeddingService;
use forge_types::{Artifact, ArtifactKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory artifact store backed by a `HashMap` behind a `RwLock`.
pub struct InMemoryArtifactStore {
    embedder: Arc<dyn EmbeddingService>,
    artifacts: RwLock<HashMap<ArtifactId, Artifact>>,
}

impl InMemoryArtifactStore {
    /// Create a new empty store using `embedder` for auto-embedding
    /// and [`ArtifactStore::find_similar`] queries.
    pub fn new(embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            embedder,
            artifacts: RwLock::new(HashMap::new()),
        }
    }
}

fn matches_filter(artifact: &Artifact, filter: &LookupFilter) -> bool {
    if let Some(kind) = filter.kind {
        if artifact.kind != kind {
            return false;
        }
    }
    if let Some(tags) = &filter.tags {
        let has = |t: &String| artifact.tags().contains(t);
        let matched = if filter.match_all_tags {
            tags.iter().all(has)
        } else {
            tags.iter().any(has)
        };
        if !matched {
            return false;
        }
    }
    true
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn store(&self, mut artifact: Artifact, options: StoreOptions) -> ForgeResult<ArtifactId> {
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(&artifact.artifact_id) && !options.overwrite {
            return Err(ForgeError::StorageError(format!(
                "artifact {} already exists",
                artifact.artifact_id
            )));
        }
        if options.auto_embed && artifact.embedding.is_none() {
            match self.embedder.embed(&artifact.content).await {
                Ok(vector) => {
                    let dim = self.embedder.dimension();
                    if let Err(e) = artifact.set_embedding(vector, dim) {
                        tracing::warn!(error = %e, "embedding dimension mismatch, storing without embedding");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "embedding backend unavailable, storing without embedding");
                }
            }
        }
        let id = artifact.artifact_id.clone();
        artifacts.insert(id.clone(), artifact);
        Ok(id)
    }

    async fn get(&self, id: &ArtifactId) -> ForgeResult<Option<Artifact>> {
        Ok(self.artifacts.read().await.get(id).cloned())
    }

    async fn find_similar(
        &self,
        query_text: &str,
        filter: LookupFilter,
        limit: usize,
        min_similarity: f32,
    ) -> ForgeResult<Vec<ScoredArtifact>> {
        let query_embedding = match self.embedder.embed(query_text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "embedding backend unavailable, degrading to keyword search");
                return self
                    .search_by_keywords(query_text, filter.kind, limit)
                    .await;
            }
        };
        let artifacts = self.artifacts.read().await;
        let mut hits: Vec<ScoredArtifact> = artifacts
            .values()
            .filter(|a| matches_filter(a, &filter))
            .filter_map(|a| {
                let embedding = a.embedding.as_ref()?;
                let score = forge_embed::cosine(&query_embedding, embedding);
                (score >= min_similarity).then(|| ScoredArtifact {
                    artifact: a.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| tie_break::compare(a, b));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn find_by_tags(&self, filter: LookupFilter, limit: usize) -> ForgeResult<Vec<Artifact>> {
        let artifacts = self.artifacts.read().await;
        let mut hits: Vec<Artifact> = artifacts
            .values()
            .filter(|a| matches_filter(a, &filter))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.artifact_id.0.cmp(&b.artifact_id.0));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn search_by_keywords(
        &self,
        query_text: &str,
        kind: Option<ArtifactKind>,
        limit: usize,
    ) -> ForgeResult<Vec<ScoredArtifact>> {
        let tokens = keyword::tokenize_query(query_text);
        let artifacts = self.artifacts.read().await;
        let mut hits: Vec<ScoredArtifact> = artifacts
            .values()
            .filter(|a| kind.is_none_or(|k| a.kind == k))
            .map(|a| ScoredArtifact {
                artifact: a.clone(),
                score: keyword::score(a, &tokens),
            })
            .filter(|h| h.score > 0.0)
            .collect();
        hits.sort_by(|a, b| tie_break::compare(a, b));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn increment_usage(&self, id: &ArtifactId) -> ForgeResult<()> {
        let mut artifacts = self.artifacts.write().await;
        let artifact = artifacts
            .get_mut(id)
            .ok_or_else(|| ForgeError::StorageError(format!("artifact {id} not found")))?;
        artifact.record_usage(Utc::now());
        Ok(())
    }

    async fn update_quality_score(&self, id: &ArtifactId, score: f32) -> ForgeResult<()> {
        let mut artifacts = self.artifacts.write().await;
        let artifact = artifacts
            .get_mut(id)
            .ok_or_else(|| ForgeError::StorageError(format!("artifact {id} not found")))?;
        artifact.set_quality_score(score, Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &ArtifactId) -> ForgeResult<()> {
        self.artifacts.write().await.remove(id);
        Ok(())
    }

    async fn compact(&self) -> ForgeResult<()> {
        // Nothing to compact: deletion already removes the artifact and
        // its embedding from the map in one step. Row-index reassignment
        // only matters for the contiguous embedding matrix FsArtifactStore
        // maintains on disk.
        Ok(())
    }

    async fn statistics(&self) -> ForgeResult<StoreStatistics> {
        let artifacts = self.artifacts.read().await;
        let mut counts_by_kind = std::collections::BTreeMap::new();
        let mut with_embedding = 0u64;
        for a in artifacts.values() {
            *counts_by_kind.entry(format!("{:?}", a.kind)).or_insert(0u64) += 1;
            if a.embedding.is_some() {
                with_embedding += 1;
            }
        }
        let total = artifacts.len() as u64;
        let embedding_coverage = if total == 0 {
            0.0
        } else {
            with_embedding as f32 / total as f32
        };
        Ok(StoreStatistics {
            counts_by_kind,
            total,
            embedding_coverage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_embed::DeterministicHashEmbedder;
    use forge_types::ArtifactKind;

    fn store() -> InMemoryArtifactStore {
        InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32)))
    }

    fn artifact(id: &str, content: &str) -> Artifact {
        Artifact::new(
            ArtifactId::from(id),
            ArtifactKind::Function,
            id,
            "test artifact",
            content,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn duplicate_id_rejected_without_overwrite() {
        let s = store();
        s.store(artifact("a1", "fn f() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        let err = s
            .store(artifact("a1", "fn g() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage_error");
    }

    #[tokio::test]
    async fn overwrite_allows_duplicate_id() {
        let s = store();
        s.store(artifact("a1", "fn f() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        s.store(
            artifact("a1", "fn g() {}"),
            StoreOptions {
                auto_embed: true,
                overwrite: true,
            },
        )
        .await
        .unwrap();
        let got = s.get(&ArtifactId::from("a1")).await.unwrap().unwrap();
        assert_eq!(got.content, "fn g() {}");
    }

    #[tokio::test]
    async fn auto_embed_fills_missing_embedding() {
        let s = store();
        s.store(artifact("a1", "fn f() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        let got = s.get(&ArtifactId::from("a1")).await.unwrap().unwrap();
        assert!(got.embedding.is_some());
    }

    #[tokio::test]
    async fn increment_usage_and_update_quality() {
        let s = store();
        s.store(artifact("a1", "fn f() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        s.increment_usage(&ArtifactId::from("a1")).await.unwrap();
        s.update_quality_score(&ArtifactId::from("a1"), 0.9)
            .await
            .unwrap();
        let got = s.get(&ArtifactId::from("a1")).await.unwrap().unwrap();
        assert_eq!(got.usage_count, 1);
        assert_eq!(got.quality_score(), 0.9);
    }

    #[tokio::test]
    async fn delete_removes_artifact() {
        let s = store();
        s.store(artifact("a1", "fn f() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        s.delete(&ArtifactId::from("a1")).await.unwrap();
        assert!(s.get(&ArtifactId::from("a1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn statistics_reports_counts_and_coverage() {
        let s = store();
        s.store(artifact("a1", "fn f() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        s.store(artifact("a2", "fn g() {}"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        let stats = s.statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.embedding_coverage, 1.0);
    }

    #[tokio::test]
    async fn search_by_keywords_finds_matching_name() {
        let s = store();
        s.store(artifact("a1", "content"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        let hits = s.search_by_keywords("a1", None, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
