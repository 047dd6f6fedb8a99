// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Provider abstraction for different LM backends
//!
//! Three HTTP backends are supported: Azure OpenAI deployments, the public
//! OpenAI API and a local Ollama server. Azure and OpenAI share the
//! chat-completions wire format and differ only in URL layout and auth.

use crate::lm::LMConfig;
use crate::request::{LMRequest, Message, ResponseFormat};
use crate::response::{LMResponse, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Type of LM provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    /// Azure OpenAI deployment
    AzureOpenAI,
    /// OpenAI
    OpenAI,
    /// Local Ollama server
    Ollama,
}

/// Failure talking to a provider, classified for retry decisions.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network or TLS failure before a response arrived
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether retrying the same request can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Decode(_) => false,
        }
    }
}

/// Provider trait for LM backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Complete a request
    async fn complete(
        &self,
        request: &LMRequest<'_>,
        config: &LMConfig,
    ) -> anyhow::Result<LMResponse>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

const MAX_ERROR_BODY: usize = 512;

async fn send_json<T: Serialize + ?Sized>(
    builder: reqwest::RequestBuilder,
    body: &T,
) -> Result<serde_json::Value, ProviderError> {
    let response = builder.json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<serde_json::Value>().await?)
}

// Chat-completions wire format shared by OpenAI and Azure OpenAI.

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [Message<'a>],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

fn chat_response_format(format: &ResponseFormat) -> serde_json::Value {
    match format {
        ResponseFormat::JsonObject => serde_json::json!({ "type": "json_object" }),
        ResponseFormat::JsonSchema { name, schema } => serde_json::json!({
            "type": "json_schema",
            "json_schema": { "name": name, "schema": schema, "strict": true },
        }),
    }
}

fn chat_request<'a>(
    model: Option<&'a str>,
    request: &'a LMRequest<'a>,
    config: &LMConfig,
) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: &request.messages,
        temperature: request.temperature.unwrap_or(config.temperature),
        max_tokens: request.max_tokens.unwrap_or(config.max_tokens),
        response_format: request.response_format.as_ref().map(chat_response_format),
    }
}

fn chat_response(raw: serde_json::Value, config: &LMConfig) -> Result<LMResponse, ProviderError> {
    let response: ChatCompletionResponse =
        serde_json::from_value(raw).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Decode("no choices in response".to_string()))?;

    let model = response.model.unwrap_or_else(|| config.model.clone());
    let mut lm_response = LMResponse::new(choice.message.content.unwrap_or_default(), model);

    if let Some(usage) = response.usage {
        lm_response =
            lm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }

    if let Some(reason) = choice.finish_reason {
        lm_response = lm_response.with_finish_reason(reason);
    }

    Ok(lm_response)
}

/// OpenAI provider implementation
pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create with custom base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(
        &self,
        request: &LMRequest<'_>,
        config: &LMConfig,
    ) -> anyhow::Result<LMResponse> {
        let body = chat_request(Some(config.model.as_str()), request, config);
        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);

        let raw = send_json(builder, &body).await?;
        Ok(chat_response(raw, config)?)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }
}

/// Azure OpenAI provider.
///
/// The configured model name is the deployment name.
pub struct AzureOpenAIProvider {
    api_key: String,
    endpoint: String,
    api_version: String,
    client: reqwest::Client,
}

impl AzureOpenAIProvider {
    /// Create a new Azure OpenAI provider
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, deployment, self.api_version
        )
    }
}

#[async_trait]
impl Provider for AzureOpenAIProvider {
    async fn complete(
        &self,
        request: &LMRequest<'_>,
        config: &LMConfig,
    ) -> anyhow::Result<LMResponse> {
        let body = chat_request(None, request, config);
        let builder = self
            .client
            .post(self.url(&config.model))
            .header("api-key", &self.api_key);

        let raw = send_json(builder, &body).await?;
        Ok(chat_response(raw, config)?)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AzureOpenAI
    }
}

/// Default address of a local Ollama server
pub const OLLAMA_DEFAULT_BASE: &str = "http://localhost:11434";

/// Ollama provider using the native `/api/chat` endpoint
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(OLLAMA_DEFAULT_BASE)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        request: &LMRequest<'_>,
        config: &LMConfig,
    ) -> anyhow::Result<LMResponse> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            messages: &'a [Message<'a>],
            stream: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            format: Option<serde_json::Value>,
            options: OllamaOptions,
        }

        #[derive(Serialize)]
        struct OllamaOptions {
            temperature: f32,
            num_predict: u32,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            model: Option<String>,
            message: OllamaMessage,
            done_reason: Option<String>,
            prompt_eval_count: Option<u32>,
            eval_count: Option<u32>,
        }

        #[derive(Deserialize)]
        struct OllamaMessage {
            content: String,
        }

        let format = request.response_format.as_ref().map(|f| match f {
            ResponseFormat::JsonObject => serde_json::Value::String("json".to_string()),
            ResponseFormat::JsonSchema { schema, .. } => schema.clone(),
        });

        let body = OllamaRequest {
            model: &config.model,
            messages: &request.messages,
            stream: false,
            format,
            options: OllamaOptions {
                temperature: request.temperature.unwrap_or(config.temperature),
                num_predict: request.max_tokens.unwrap_or(config.max_tokens),
            },
        };

        let builder = self.client.post(format!("{}/api/chat", self.base_url));
        let raw = send_json(builder, &body).await?;
        let response: OllamaResponse =
            serde_json::from_value(raw).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let model = response.model.unwrap_or_else(|| config.model.clone());
        let mut lm_response = LMResponse::new(response.message.content, model);
        if let (Some(prompt), Some(completion)) = (response.prompt_eval_count, response.eval_count)
        {
            lm_response = lm_response.with_usage(Usage::new(prompt, completion));
        }
        if let Some(reason) = response.done_reason {
            lm_response = lm_response.with_finish_reason(reason);
        }
        Ok(lm_response)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type() {
        assert_eq!(
            OpenAIProvider::new("test-key").provider_type(),
            ProviderType::OpenAI
        );
        assert_eq!(
            OllamaProvider::default().provider_type(),
            ProviderType::Ollama
        );
    }

    #[test]
    fn test_azure_url_layout() {
        let provider = AzureOpenAIProvider::new("https://acme.openai.azure.com/", "k", "2024-06-01");
        assert_eq!(
            provider.url("gpt-4o"),
            "https://acme.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_retryable_status() {
        let throttled = ProviderError::Status {
            status: 429,
            body: String::new(),
        };
        let bad_request = ProviderError::Status {
            status: 400,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!ProviderError::Decode("x".into()).is_retryable());
    }

    #[test]
    fn test_chat_response_uses_config_model_when_missing() {
        let raw = serde_json::json!({
            "choices": [{ "message": { "content": "hi" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4 }
        });
        let config = LMConfig {
            model: "deploy".into(),
            ..Default::default()
        };
        let resp = chat_response(raw, &config).unwrap();
        assert_eq!(resp.text, "hi");
        assert_eq!(resp.model, "deploy");
        assert_eq!(resp.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn test_schema_format_is_strict() {
        let format = ResponseFormat::json_schema("Out", serde_json::json!({"type": "object"}));
        let value = chat_response_format(&format);
        assert_eq!(value["type"], "json_schema");
        assert_eq!(value["json_schema"]["strict"], true);
    }
}
