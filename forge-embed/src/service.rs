//! The embedding service boundary every backend implements.

use crate::error::EmbedError;
use async_trait::async_trait;

/// Computes a fixed-dimensional embedding vector for a piece of text.
///
/// Implementations must be deterministic for a given backend: the same
/// input text always produces the same vector. Callers that need
/// similarity search treat an [`EmbedError::Unavailable`] as a signal
/// to degrade to keyword/tag retrieval rather than fail the request.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Compute the embedding for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// The fixed dimension this backend's vectors always have.
    fn dimension(&self) -> usize;
}
