//! Request/response shapes exchanged between the Router and a
//! [`crate::provider::Provider`] backend.
//!
//! Trimmed from a full chat-message transcript down to the single
//! prompt-in, text-out shape the Router actually needs: multi-turn
//! tool-calling loops live in `forge-controller`, not here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single completion request sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model identifier to use.
    pub model: String,
    /// Optional system prompt.
    pub system: Option<String>,
    /// The rendered prompt text.
    pub prompt: String,
    /// Maximum output tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Provider-specific config passthrough.
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Model produced a final response.
    EndTurn,
    /// Hit the max_tokens limit.
    MaxTokens,
    /// Content was filtered by safety.
    ContentFilter,
}

/// Token usage from a single provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}

/// Response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text.
    pub text: String,
    /// Why the provider stopped.
    pub stop_reason: StopReason,
    /// Token usage.
    pub usage: TokenUsage,
    /// Actual model used (may differ from the requested alias).
    pub model: String,
    /// Cost calculated by the provider, if known.
    pub cost: Option<Decimal>,
}
