//! Embedding service errors.

use thiserror::Error;

/// Errors from an [`crate::EmbeddingService`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The backend could not be reached. Callers must treat this as
    /// "unavailable" and degrade to keyword/tag retrieval rather than
    /// propagate a hard failure.
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    /// The backend responded but the response could not be parsed
    /// into an embedding vector.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}
