//! Anthropic Messages API client.

use async_trait::async_trait;
use forge_router::{Provider, ProviderError, ProviderRequest, ProviderResponse, StopReason, TokenUsage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{map_http_status, map_reqwest_error};

const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";


#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: [AnthropicMessage; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContentBlock>,
    stop_reason: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Client for the Anthropic Messages API.
///
/// Implements [`Provider`] for use anywhere the Router accepts a backend.
pub struct Anthropic {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl Anthropic {
    /// Create a client with the given API key and default model/base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the default model used when a request doesn't name one.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (for proxies or testing).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: &ProviderRequest) -> AnthropicRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };
        AnthropicRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(4096),
            messages: [AnthropicMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            system: request.system.clone(),
            temperature: request.temperature,
        }
    }

    fn parse_response(&self, response: AnthropicResponse) -> ProviderResponse {
        let text = response
            .content
            .into_iter()
            .find_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .unwrap_or_default();

        let stop_reason = match response.stop_reason.as_str() {
            "max_tokens" => StopReason::MaxTokens,
            "content_filter" => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        };

        let usage = TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        };

        // Anthropic's list price for the default model, in dollars per token.
        let input_cost_per_token = Decimal::new(25, 8);
        let output_cost_per_token = Decimal::new(125, 8);
        let cost =
            Decimal::from(usage.input_tokens) * input_cost_per_token
                + Decimal::from(usage.output_tokens) * output_cost_per_token;

        ProviderResponse {
            text,
            stop_reason,
            usage,
            model: response.model,
            cost: Some(cost),
        }
    }
}

#[async_trait]
impl Provider for Anthropic {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = self.build_request(&request);

        let http_response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body));
        }

        let api_response: AnthropicResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(self.parse_response(api_response))
    }
}
