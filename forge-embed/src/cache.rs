//! Bounded recent-input cache wrapping any [`EmbeddingService`].

use crate::error::EmbedError;
use crate::service::EmbeddingService;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use tokio::sync::RwLock;

struct CacheEntry {
    key: u64,
    vector: Vec<f32>,
}

/// Wraps an [`EmbeddingService`] with an LRU-ish cache keyed by a hash
/// of the input text, bounded to `capacity` entries. Eviction is
/// oldest-first, not a true LRU — recent-input caching only needs to
/// absorb repeated calls within a short window, not long-term reuse.
pub struct CachedEmbedder<E> {
    inner: E,
    capacity: usize,
    entries: RwLock<VecDeque<CacheEntry>>,
}

impl<E: EmbeddingService> CachedEmbedder<E> {
    /// Wrap `inner`, caching up to `capacity` recent text hashes.
    pub fn new(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn hash_text(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl<E: EmbeddingService> EmbeddingService for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let key = Self::hash_text(text);
        {
            let entries = self.entries.read().await;
            if let Some(hit) = entries.iter().find(|e| e.key == key) {
                return Ok(hit.vector.clone());
            }
        }
        let vector = self.inner.embed(text).await?;
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(CacheEntry {
            key,
            vector: vector.clone(),
        });
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingService for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn repeated_text_hits_cache() {
        let embedder = CachedEmbedder::new(
            CountingEmbedder {
                calls: AtomicUsize::new(0),
            },
            4,
        );
        embedder.embed("hello").await.unwrap();
        embedder.embed("hello").await.unwrap();
        embedder.embed("world").await.unwrap();
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_evicts_oldest_beyond_capacity() {
        let embedder = CachedEmbedder::new(
            CountingEmbedder {
                calls: AtomicUsize::new(0),
            },
            2,
        );
        embedder.embed("a").await.unwrap();
        embedder.embed("b").await.unwrap();
        embedder.embed("c").await.unwrap();
        embedder.embed("a").await.unwrap();
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 4);
    }
}
