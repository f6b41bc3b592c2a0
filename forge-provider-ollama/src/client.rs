//! Ollama `/api/chat` client.
//!
//! Ollama runs models locally: there are no auth headers, and cost is
//! always zero.

use async_trait::async_trait;
use forge_router::{Provider, ProviderError, ProviderRequest, ProviderResponse, StopReason, TokenUsage};
use serde::{Deserialize, Serialize};

use crate::error::{map_http_status, map_reqwest_error};

const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    message: OllamaResponseMessage,
    done_reason: Option<String>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

/// Client for a locally running Ollama instance.
///
/// Implements [`Provider`] for use anywhere the Router accepts a backend.
pub struct Ollama {
    model: String,
    base_url: String,
    keep_alive: Option<String>,
    client: reqwest::Client,
}

impl Ollama {
    /// Create a client pointed at the default local endpoint
    /// (`http://localhost:11434`) with the default model.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            keep_alive: None,
            client: reqwest::Client::new(),
        }
    }

    /// Override the default model used when a request doesn't name one.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (for remote Ollama instances or custom ports).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set how long Ollama keeps the model loaded after this request
    /// (`"5m"`, `"0"` to unload immediately, `"-1"` to keep forever).
    pub fn keep_alive(mut self, duration: impl Into<String>) -> Self {
        self.keep_alive = Some(duration.into());
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, request: &ProviderRequest) -> OllamaRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(OllamaMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaRequest {
            model,
            messages,
            stream: false,
            options,
            keep_alive: self.keep_alive.clone(),
        }
    }

    fn parse_response(&self, response: OllamaResponse) -> ProviderResponse {
        let stop_reason = match response.done_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        let usage = TokenUsage {
            input_tokens: response.prompt_eval_count.unwrap_or(0),
            output_tokens: response.eval_count.unwrap_or(0),
        };

        ProviderResponse {
            text: response.message.content,
            stop_reason,
            usage,
            model: response.model,
            // Local inference has no metered cost.
            cost: None,
        }
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = self.build_request(&request);

        let http_response = self
            .client
            .post(self.chat_url())
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

        let api_response: OllamaResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(self.parse_response(api_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_url_joins_base_and_path() {
        let client = Ollama::new().base_url("http://remote-host:11434/");
        assert_eq!(client.chat_url(), "http://remote-host:11434/api/chat");
    }

    #[test]
    fn build_request_falls_back_to_default_model() {
        let client = Ollama::new();
        let request = ProviderRequest {
            model: String::new(),
            system: None,
            prompt: "hi".into(),
            max_tokens: None,
            temperature: None,
            extra: json!(null),
        };
        let api_request = client.build_request(&request);
        assert_eq!(api_request.model, DEFAULT_MODEL);
        assert!(!api_request.stream);
        assert!(api_request.options.is_none());
    }

    #[test]
    fn build_request_sets_options_when_sampling_params_present() {
        let client = Ollama::new();
        let request = ProviderRequest {
            model: "llama3.2".into(),
            system: Some("be concise".into()),
            prompt: "hi".into(),
            max_tokens: Some(128),
            temperature: Some(0.3),
            extra: json!(null),
        };
        let api_request = client.build_request(&request);
        assert_eq!(api_request.messages.len(), 2);
        let options = api_request.options.unwrap();
        assert_eq!(options.num_predict, Some(128));
        assert_eq!(options.temperature, Some(0.3));
    }

    #[test]
    fn parse_response_has_no_cost() {
        let client = Ollama::new();
        let api_response = OllamaResponse {
            model: "llama3.2".into(),
            message: OllamaResponseMessage {
                content: "hello!".into(),
            },
            done_reason: Some("stop".into()),
            prompt_eval_count: Some(8),
            eval_count: Some(4),
        };
        let response = client.parse_response(api_response);
        assert_eq!(response.text, "hello!");
        assert_eq!(response.cost, None);
        assert_eq!(response.usage.input_tokens, 8);
    }

    #[test]
    fn parse_response_maps_length_done_reason() {
        let client = Ollama::new();
        let api_response = OllamaResponse {
            model: "llama3.2".into(),
            message: OllamaResponseMessage {
                content: "trunca".into(),
            },
            done_reason: Some("length".into()),
            prompt_eval_count: Some(8),
            eval_count: Some(128),
        };
        let response = client.parse_response(api_response);
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
    }
}
