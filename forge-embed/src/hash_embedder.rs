//! Offline, dependency-free default embedder.

use crate::error::EmbedError;
use crate::service::EmbeddingService;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hashes character trigrams of the input into buckets of a
/// fixed-size float vector and L2-normalizes the result. Deterministic,
/// offline, and always available, so [`EmbeddingService::embed`] never
/// returns [`EmbedError::Unavailable`] for this backend — it's the
/// fallback other backends degrade to, not one that degrades itself.
///
/// This is not a semantic embedding: it captures lexical overlap, not
/// meaning. It is the default and test backend; a [`crate::RemoteEmbedder`]
/// should be configured wherever semantic similarity matters.
pub struct DeterministicHashEmbedder {
    dimension: usize,
}

impl DeterministicHashEmbedder {
    /// Create a hash embedder producing vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn trigrams(text: &str) -> Vec<String> {
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        if chars.len() < 3 {
            return vec![chars.iter().collect()];
        }
        chars.windows(3).map(|w| w.iter().collect()).collect()
    }
}

impl Default for DeterministicHashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingService for DeterministicHashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dimension];
        for gram in Self::trigrams(text) {
            let mut hasher = DefaultHasher::new();
            gram.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
