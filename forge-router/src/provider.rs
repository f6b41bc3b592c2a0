//! Provider trait for LLM backends.
//!
//! The teacher's `Provider` trait uses RPITIT and is deliberately not
//! object-safe, because its generic orchestrator (`NeuronTurn<P:
//! Provider>`) is parameterized over a single concrete provider chosen
//! at compile time. The Router instead holds a heterogeneous,
//! runtime-selected set of backends (`Arc<dyn Provider>` per backend
//! name), so this trait is built with `#[async_trait]` to stay object
//! safe.

use crate::types::{ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from LLM providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// Could not parse the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::RequestFailed(_)
        )
    }
}

/// LLM provider interface. Each backend (Anthropic, OpenAI, Ollama)
/// implements this trait; the Router holds one `Arc<dyn Provider>` per
/// configured backend name.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a completion request to the provider.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        assert_eq!(
            ProviderError::RequestFailed("timeout".into()).to_string(),
            "request failed: timeout"
        );
        assert_eq!(ProviderError::RateLimited.to_string(), "rate limited");
    }

    #[test]
    fn provider_error_retryable() {
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::RequestFailed("timeout".into()).is_retryable());
        assert!(!ProviderError::AuthFailed("bad key".into()).is_retryable());
    }

    fn _assert_object_safe(_: &dyn Provider) {}
}
