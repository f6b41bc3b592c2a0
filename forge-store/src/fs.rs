//! Filesystem-backed Artifact Store.
//!
//! Directory layout:
//! ```text
//! root/
//!   manifest.json     id -> artifact metadata + embedding row pointer
//!   embeddings.bin    contiguous f32 rows, fixed dimension, append-only
//!   tombstones.bin    one byte per row, 1 = deleted
//!   tags.json         tag -> sorted set of artifact ids
//! ```
//!
//! Manifest and tag-index writes go through a temp-file-then-rename so a
//! crash mid-write never leaves a half-written file in place; the
//! previous file stays authoritative until the rename succeeds. The
//! embedding matrix is append-only — deletions only flip a tombstone
//! bit until [`FsArtifactStore::compact`] rewrites the matrix and
//! reassigns row indices.

use crate::store::{ArtifactStore, LookupFilter, ScoredArtifact, StoreOptions, StoreStatistics};
use crate::{keyword, tie_break};
use async_trait::async_trait;
use chrono::Utc;
use forge_core::{ArtifactId, ForgeError, ForgeResult};
use forge_embed::EmbeddingService;
use forge_types::{Artifact, ArtifactKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    artifact: Artifact,
    embedding_row: Option<u64>,
}

struct FsState {
    manifest: HashMap<ArtifactId, ManifestEntry>,
    embedding_rows: Vec<Vec<f32>>,
    tombstones: Vec<bool>,
    tag_index: HashMap<String, Vec<ArtifactId>>,
}

/// Filesystem-backed artifact store rooted at a directory, persisted
/// across restarts.
pub struct FsArtifactStore {
    root: PathBuf,
    embedder: Arc<dyn EmbeddingService>,
    state: RwLock<FsState>,
}

fn manifest_path(root: &Path) -> PathBuf {
    root.join("manifest.json")
}

fn embeddings_path(root: &Path) -> PathBuf {
    root.join("embeddings.bin")
}

fn tombstones_path(root: &Path) -> PathBuf {
    root.join("tombstones.bin")
}

fn tags_path(root: &Path) -> PathBuf {
    root.join("tags.json")
}

async fn write_atomic(path: &Path, contents: &[u8]) -> ForgeResult<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| ForgeError::StorageError(format!("write {} failed: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ForgeError::StorageError(format!("rename into {} failed: {e}", path.display())))?;
    Ok(())
}

fn build_tag_index(manifest: &HashMap<ArtifactId, ManifestEntry>) -> HashMap<String, Vec<ArtifactId>> {
    let mut index: HashMap<String, Vec<ArtifactId>> = HashMap::new();
    for entry in manifest.values() {
        for tag in entry.artifact.tags() {
            index.entry(tag.clone()).or_default().push(entry.artifact.artifact_id.clone());
        }
    }
    index
}

fn rows_to_bytes(rows: &[Vec<f32>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(rows.iter().map(|r| r.len() * 4).sum());
    for row in rows {
        for value in row {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

fn bytes_to_rows(bytes: &[u8], dimension: usize) -> Vec<Vec<f32>> {
    if dimension == 0 {
        return Vec::new();
    }
    let row_bytes = dimension * 4;
    bytes
        .chunks_exact(row_bytes)
        .map(|chunk| {
            chunk
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect()
}

impl FsArtifactStore {
    /// Open (or create) a store rooted at `root`.
    pub async fn open(root: &Path, embedder: Arc<dyn EmbeddingService>) -> ForgeResult<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| ForgeError::StorageError(format!("create store root failed: {e}")))?;

        let manifest: HashMap<ArtifactId, ManifestEntry> =
            match tokio::fs::read(manifest_path(root)).await {
                Ok(bytes) => serde_json::from_slice(&bytes)
                    .map_err(|e| ForgeError::StorageError(format!("corrupt manifest: {e}")))?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
                Err(e) => return Err(ForgeError::StorageError(format!("read manifest failed: {e}"))),
            };

        let dimension = embedder.dimension();
        let embedding_rows = match tokio::fs::read(embeddings_path(root)).await {
            Ok(bytes) => bytes_to_rows(&bytes, dimension),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ForgeError::StorageError(format!("read embeddings failed: {e}"))),
        };

        let tombstones = match tokio::fs::read(tombstones_path(root)).await {
            Ok(bytes) => bytes.iter().map(|b| *b != 0).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![false; embedding_rows.len()],
            Err(e) => return Err(ForgeError::StorageError(format!("read tombstones failed: {e}"))),
        };

        let tag_index = build_tag_index(&manifest);

        Ok(Self {
            root: root.to_path_buf(),
            embedder,
            state: RwLock::new(FsState {
                manifest,
                embedding_rows,
                tombstones,
                tag_index,
            }),
        })
    }

    async fn persist_manifest(&self, state: &FsState) -> ForgeResult<()> {
        let bytes = serde_json::to_vec(&state.manifest)
            .map_err(|e| ForgeError::StorageError(format!("serialize manifest failed: {e}")))?;
        write_atomic(&manifest_path(&self.root), &bytes).await
    }

    async fn persist_tags(&self, state: &FsState) -> ForgeResult<()> {
        let bytes = serde_json::to_vec(&state.tag_index)
            .map_err(|e| ForgeError::StorageError(format!("serialize tag index failed: {e}")))?;
        write_atomic(&tags_path(&self.root), &bytes).await
    }

    async fn append_embedding_row(&self, row: &[f32]) -> ForgeResult<()> {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(embeddings_path(&self.root))
            .await
            .map_err(|e| ForgeError::StorageError(format!("open embeddings file failed: {e}")))?;
        let bytes = rows_to_bytes(std::slice::from_ref(&row.to_vec()));
        file.write_all(&bytes)
            .await
            .map_err(|e| ForgeError::StorageError(format!("append embedding failed: {e}")))?;
        Ok(())
    }

    async fn persist_tombstones(&self, state: &FsState) -> ForgeResult<()> {
        let bytes: Vec<u8> = state.tombstones.iter().map(|t| *t as u8).collect();
        write_atomic(&tombstones_path(&self.root), &bytes).await
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
impl ArtifactStore for FsArtifactStore {
    async fn store(&self, mut artifact: Artifact, options: StoreOptions) -> ForgeResult<ArtifactId> {
        let mut state = self.state.write().await;
        if state.manifest.contains_key(&artifact.artifact_id) && !options.overwrite {
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

        let embedding_row = if let Some(vector) = artifact.embedding.clone() {
            self.append_embedding_row(&vector).await?;
            state.embedding_rows.push(vector);
            state.tombstones.push(false);
            Some((state.embedding_rows.len() - 1) as u64)
        } else {
            None
        };

        let id = artifact.artifact_id.clone();
        for tag in artifact.tags() {
            let bucket = state.tag_index.entry(tag.clone()).or_default();
            if !bucket.contains(&id) {
                bucket.push(id.clone());
            }
        }
        state.manifest.insert(
            id.clone(),
            ManifestEntry {
                artifact,
                embedding_row,
            },
        );

        self.persist_manifest(&state).await?;
        self.persist_tags(&state).await?;
        if embedding_row.is_some() {
            self.persist_tombstones(&state).await?;
        }
        Ok(id)
    }

    async fn get(&self, id: &ArtifactId) -> ForgeResult<Option<Artifact>> {
        Ok(self
            .state
            .read()
            .await
            .manifest
            .get(id)
            .map(|e| e.artifact.clone()))
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
        let state = self.state.read().await;
        let mut hits: Vec<ScoredArtifact> = state
            .manifest
            .values()
            .filter(|e| matches_filter(&e.artifact, &filter))
            .filter_map(|e| {
                let row = e.embedding_row? as usize;
                if *state.tombstones.get(row)? {
                    return None;
                }
                let embedding = state.embedding_rows.get(row)?;
                let score = forge_embed::cosine(&query_embedding, embedding);
                (score >= min_similarity).then(|| ScoredArtifact {
                    artifact: e.artifact.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| tie_break::compare(a, b));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn find_by_tags(&self, filter: LookupFilter, limit: usize) -> ForgeResult<Vec<Artifact>> {
        let state = self.state.read().await;
        let mut hits: Vec<Artifact> = state
            .manifest
            .values()
            .map(|e| &e.artifact)
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
        let state = self.state.read().await;
        let mut hits: Vec<ScoredArtifact> = state
            .manifest
            .values()
            .map(|e| &e.artifact)
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
        let mut state = self.state.write().await;
        let entry = state
            .manifest
            .get_mut(id)
            .ok_or_else(|| ForgeError::StorageError(format!("artifact {id} not found")))?;
        entry.artifact.record_usage(Utc::now());
        self.persist_manifest(&state).await
    }

    async fn update_quality_score(&self, id: &ArtifactId, score: f32) -> ForgeResult<()> {
        let mut state = self.state.write().await;
        let entry = state
            .manifest
            .get_mut(id)
            .ok_or_else(|| ForgeError::StorageError(format!("artifact {id} not found")))?;
        entry.artifact.set_quality_score(score, Utc::now());
        self.persist_manifest(&state).await
    }

    async fn delete(&self, id: &ArtifactId) -> ForgeResult<()> {
        let mut state = self.state.write().await;
        let Some(entry) = state.manifest.remove(id) else {
            return Ok(());
        };
        for tag in entry.artifact.tags() {
            if let Some(bucket) = state.tag_index.get_mut(tag) {
                bucket.retain(|existing| existing != id);
            }
        }
        if let Some(row) = entry.embedding_row {
            if let Some(tombstone) = state.tombstones.get_mut(row as usize) {
                *tombstone = true;
            }
        }
        self.persist_manifest(&state).await?;
        self.persist_tags(&state).await?;
        self.persist_tombstones(&state).await?;
        Ok(())
    }

    async fn compact(&self) -> ForgeResult<()> {
        let mut state = self.state.write().await;

        let mut new_rows = Vec::new();
        let mut remap: HashMap<usize, usize> = HashMap::new();
        for (old_row, (vector, tombstoned)) in state
            .embedding_rows
            .iter()
            .zip(state.tombstones.iter())
            .enumerate()
        {
            if *tombstoned {
                continue;
            }
            remap.insert(old_row, new_rows.len());
            new_rows.push(vector.clone());
        }

        for entry in state.manifest.values_mut() {
            entry.embedding_row = entry
                .embedding_row
                .and_then(|row| remap.get(&(row as usize)).map(|r| *r as u64));
        }

        let new_tombstones = vec![false; new_rows.len()];
        let bytes = rows_to_bytes(&new_rows);
        write_atomic(&embeddings_path(&self.root), &bytes).await?;
        state.embedding_rows = new_rows;
        state.tombstones = new_tombstones;

        self.persist_manifest(&state).await?;
        self.persist_tombstones(&state).await?;
        Ok(())
    }

    async fn statistics(&self) -> ForgeResult<StoreStatistics> {
        let state = self.state.read().await;
        let mut counts_by_kind = std::collections::BTreeMap::new();
        let mut with_embedding = 0u64;
        for entry in state.manifest.values() {
            *counts_by_kind
                .entry(format!("{:?}", entry.artifact.kind))
                .or_insert(0u64) += 1;
            if entry.embedding_row.is_some() {
                with_embedding += 1;
            }
        }
        let total = state.manifest.len() as u64;
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
    use tempfile::tempdir;

    async fn store() -> (tempfile::TempDir, FsArtifactStore) {
        let dir = tempdir().unwrap();
        let s = FsArtifactStore::open(dir.path(), Arc::new(DeterministicHashEmbedder::new(16)))
            .await
            .unwrap();
        (dir, s)
    }

    fn artifact(id: &str) -> Artifact {
        Artifact::new(
            ArtifactId::from(id),
            ArtifactKind::Function,
            id,
            "d",
            "fn f() {}",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn store_and_get_round_trips() {
        let (_dir, s) = store().await;
        s.store(artifact("a1"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        let got = s.get(&ArtifactId::from("a1")).await.unwrap().unwrap();
        assert_eq!(got.artifact_id.0, "a1");
        assert!(got.embedding.is_some());
    }

    #[tokio::test]
    async fn reopen_reloads_manifest_and_embeddings() {
        let dir = tempdir().unwrap();
        let embedder: Arc<dyn EmbeddingService> = Arc::new(DeterministicHashEmbedder::new(16));
        {
            let s = FsArtifactStore::open(dir.path(), embedder.clone()).await.unwrap();
            s.store(artifact("a1"), StoreOptions::default_auto_embed())
                .await
                .unwrap();
        }
        let reopened = FsArtifactStore::open(dir.path(), embedder).await.unwrap();
        let got = reopened.get(&ArtifactId::from("a1")).await.unwrap().unwrap();
        assert!(got.embedding.is_some());
    }

    #[tokio::test]
    async fn compact_removes_tombstoned_rows() {
        let (_dir, s) = store().await;
        s.store(artifact("a1"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        s.store(artifact("a2"), StoreOptions::default_auto_embed())
            .await
            .unwrap();
        s.delete(&ArtifactId::from("a1")).await.unwrap();
        s.compact().await.unwrap();
        let state = s.state.read().await;
        assert_eq!(state.embedding_rows.len(), 1);
        assert_eq!(state.tombstones.len(), 1);
        assert!(!state.tombstones[0]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, s) = store().await;
        s.delete(&ArtifactId::from("missing")).await.unwrap();
    }
}
