//! HTTP embedding backend.

use crate::error::EmbedError;
use crate::service::EmbeddingService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Calls a remote embedding endpoint over HTTP. Any network failure,
/// non-success status, or malformed response is mapped to
/// [`EmbedError::Unavailable`] or [`EmbedError::InvalidResponse`] — the
/// caller must degrade to keyword/tag retrieval rather than propagate
/// a hard failure, per the Embedding & Similarity Service's "never
/// block" contract.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    dimension: usize,
}

impl RemoteEmbedder {
    /// Construct a remote embedder calling `endpoint` and expecting
    /// vectors of `dimension` floats back.
    pub fn new(endpoint: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingService for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { input: text })
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbedError::Unavailable(format!(
                "embedding backend returned status {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::InvalidResponse(e.to_string()))?;

        if parsed.embedding.len() != self.dimension {
            return Err(EmbedError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                parsed.embedding.len()
            )));
        }

        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
