//! The Artifact Store's public contract.

use async_trait::async_trait;
use forge_core::{ArtifactId, ForgeResult};
use forge_types::{Artifact, ArtifactKind};

/// Options controlling a [`ArtifactStore::store`] call.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Fill the embedding from the configured embedding service if the
    /// artifact doesn't already carry one and the service is
    /// available.
    pub auto_embed: bool,
    /// Allow overwriting an existing artifact with the same id.
    pub overwrite: bool,
}

impl StoreOptions {
    /// The default used by most callers: auto-embed, reject
    /// duplicates.
    pub fn default_auto_embed() -> Self {
        Self {
            auto_embed: true,
            overwrite: false,
        }
    }
}

/// A single similarity search hit.
#[derive(Debug, Clone)]
pub struct ScoredArtifact {
    /// The matching artifact.
    pub artifact: Artifact,
    /// Similarity or keyword-overlap score.
    pub score: f32,
}

/// Aggregate counts reported by [`ArtifactStore::statistics`].
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStatistics {
    /// Number of artifacts per kind.
    pub counts_by_kind: std::collections::BTreeMap<String, u64>,
    /// Total number of artifacts.
    pub total: u64,
    /// Fraction of artifacts that carry an embedding, in `[0, 1]`.
    pub embedding_coverage: f32,
}

/// Filters shared by the tag- and similarity-based lookup methods.
#[derive(Debug, Clone, Default)]
pub struct LookupFilter {
    /// Restrict results to this kind, when set.
    pub kind: Option<ArtifactKind>,
    /// Restrict results to these tags, when set.
    pub tags: Option<Vec<String>>,
    /// For tag lookups, require all tags to match rather than any.
    pub match_all_tags: bool,
}

/// The Artifact Store: the exclusive owner of artifact durability.
/// Every other component holds only borrowed references keyed by
/// [`ArtifactId`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `artifact`, filling its embedding per `options` if
    /// requested and available. Rejects a duplicate id unless
    /// `options.overwrite` is set.
    async fn store(&self, artifact: Artifact, options: StoreOptions) -> ForgeResult<ArtifactId>;

    /// Look up a single artifact by id.
    async fn get(&self, id: &ArtifactId) -> ForgeResult<Option<Artifact>>;

    /// Similarity search against `query_text`. Falls back to
    /// [`ArtifactStore::search_by_keywords`] when the embedding service
    /// is unavailable — this method never fails solely because the
    /// embedding backend is down.
    async fn find_similar(
        &self,
        query_text: &str,
        filter: LookupFilter,
        limit: usize,
        min_similarity: f32,
    ) -> ForgeResult<Vec<ScoredArtifact>>;

    /// Tag-based lookup, matching any or all tags depending on
    /// `filter.match_all_tags`.
    async fn find_by_tags(&self, filter: LookupFilter, limit: usize) -> ForgeResult<Vec<Artifact>>;

    /// tf-weighted keyword search over name, description and tags.
    async fn search_by_keywords(
        &self,
        query_text: &str,
        kind: Option<ArtifactKind>,
        limit: usize,
    ) -> ForgeResult<Vec<ScoredArtifact>>;

    /// Record one reuse of an artifact.
    async fn increment_usage(&self, id: &ArtifactId) -> ForgeResult<()>;

    /// Overwrite an artifact's quality score, clamped to `[0, 1]`.
    async fn update_quality_score(&self, id: &ArtifactId, score: f32) -> ForgeResult<()>;

    /// Remove an artifact. Embeddings are tombstoned, not
    /// immediately compacted — see [`ArtifactStore::compact`].
    async fn delete(&self, id: &ArtifactId) -> ForgeResult<()>;

    /// Rewrite the embedding matrix and manifest to drop rows
    /// belonging to deleted artifacts, reassigning row indices
    /// atomically.
    async fn compact(&self) -> ForgeResult<()>;

    /// Aggregate counts over the current store contents.
    async fn statistics(&self) -> ForgeResult<StoreStatistics>;
}
