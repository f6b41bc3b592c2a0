//! OpenAI Chat Completions API client.

use async_trait::async_trait;
use forge_router::{Provider, ProviderError, ProviderRequest, ProviderResponse, StopReason, TokenUsage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{map_http_status, map_reqwest_error};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Client for the OpenAI Chat Completions API.
///
/// Implements [`Provider`] for use anywhere the Router accepts a backend.
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAi {
    /// Create a client with the given API key and default model/base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            org_id: None,
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

    /// Set the `OpenAI-Organization` header for multi-org accounts.
    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: &ProviderRequest) -> OpenAIRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        OpenAIRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn parse_response(&self, response: OpenAIResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;

        let stop_reason = match choice.finish_reason.as_str() {
            "length" => StopReason::MaxTokens,
            "content_filter" => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        };

        let usage = TokenUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        };

        // gpt-4o-mini list price: $0.15/MTok input, $0.60/MTok output.
        let input_cost_per_token = Decimal::new(15, 8);
        let output_cost_per_token = Decimal::new(60, 8);
        let cost = Decimal::from(usage.input_tokens) * input_cost_per_token
            + Decimal::from(usage.output_tokens) * output_cost_per_token;

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            stop_reason,
            usage,
            model: response.model,
            cost: Some(cost),
        })
    }
}

#[async_trait]
impl Provider for OpenAi {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = self.build_request(&request);
        let mut http_request = self
            .client
            .post(self.chat_completions_url())
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");
        if let Some(org_id) = &self.org_id {
            http_request = http_request.header("openai-organization", org_id);
        }

        let http_response = http_request
            .json(&api_request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body));
        }

        let api_response: OpenAIResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        self.parse_response(api_response)
    }
}
