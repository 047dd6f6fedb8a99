// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Language model client abstraction

use crate::env::AzureSettings;
use crate::pool::LMPool;
use crate::provider::{
    AzureOpenAIProvider, OllamaProvider, OpenAIProvider, Provider, ProviderError,
    OLLAMA_DEFAULT_BASE,
};
use crate::request::LMRequest;
use crate::response::LMResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for LM client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LMConfig {
    /// Model name (deployment name for Azure)
    pub model: String,

    /// Temperature
    pub temperature: f32,

    /// Max tokens
    pub max_tokens: u32,

    /// Whether to cache responses
    pub cache: bool,

    /// Number of retries
    pub num_retries: u32,

    /// Maximum requests in flight
    pub max_concurrent: usize,

    /// Delay before the first retry, doubled on each attempt
    pub retry_backoff_ms: u64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: 4000,
            cache: true,
            num_retries: 3,
            max_concurrent: 10,
            retry_backoff_ms: 500,
        }
    }
}

impl LMConfig {
    /// Config for `model` with defaults elsewhere
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable response caching
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set retry count
    pub fn with_num_retries(mut self, num_retries: u32) -> Self {
        self.num_retries = num_retries;
        self
    }

    /// Set concurrency limit
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }
}

/// Language model client trait
#[async_trait]
pub trait LM: Send + Sync {
    /// Generate a completion
    async fn generate(&self, request: &LMRequest<'_>) -> anyhow::Result<LMResponse>;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get configuration
    fn config(&self) -> &LMConfig;
}

#[async_trait]
impl<L: LM + ?Sized> LM for Arc<L> {
    async fn generate(&self, request: &LMRequest<'_>) -> anyhow::Result<LMResponse> {
        (**self).generate(request).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn config(&self) -> &LMConfig {
        (**self).config()
    }
}

/// Concrete LM implementation over an HTTP provider
pub struct LMClient {
    config: LMConfig,
    provider: Box<dyn Provider>,
    pool: LMPool,
}

impl LMClient {
    /// Create a new LM client
    pub fn new(config: LMConfig, provider: Box<dyn Provider>) -> Self {
        let pool = LMPool::new(config.max_concurrent);
        Self {
            config,
            provider,
            pool,
        }
    }

    /// Create with default config
    pub fn with_provider(provider: Box<dyn Provider>) -> Self {
        Self::new(LMConfig::default(), provider)
    }

    /// Build a client from a `provider/model` string.
    ///
    /// Recognised prefixes are `azure/`, `openai/`, `ollama/` and
    /// `ollama_chat/`. Credentials come from `options`; Azure falls back to
    /// the `AZURE_OPENAI_*` environment variables.
    pub fn from_model_string(model: &str, options: ClientOptions) -> anyhow::Result<Self> {
        let (prefix, name) = model
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("model string {model:?} has no provider prefix"))?;
        if name.is_empty() {
            anyhow::bail!("model string {model:?} has no model name");
        }

        let config = LMConfig {
            model: name.to_string(),
            ..options.config.clone()
        };

        let provider: Box<dyn Provider> = match prefix {
            "azure" => {
                let settings = match (options.api_base, options.api_key, options.api_version) {
                    (Some(endpoint), Some(api_key), Some(api_version)) => AzureSettings {
                        api_key,
                        endpoint,
                        api_version,
                        deployment: name.to_string(),
                    },
                    _ => AzureSettings::from_env()?,
                };
                Box::new(AzureOpenAIProvider::new(
                    settings.endpoint,
                    settings.api_key,
                    settings.api_version,
                ))
            }
            "openai" => {
                let api_key = match options.api_key {
                    Some(key) => key,
                    None => crate::env::require_env("OPENAI_API_KEY")?,
                };
                let mut provider = OpenAIProvider::new(api_key);
                if let Some(base) = options.api_base {
                    provider = provider.with_base_url(base);
                }
                Box::new(provider)
            }
            "ollama" | "ollama_chat" => Box::new(OllamaProvider::new(
                options
                    .api_base
                    .unwrap_or_else(|| OLLAMA_DEFAULT_BASE.to_string()),
            )),
            other => anyhow::bail!("unknown provider prefix {other:?} in {model:?}"),
        };

        tracing::debug!(provider = prefix, model = name, "configured LM client");
        Ok(Self::new(config, provider))
    }

    /// Azure OpenAI client configured entirely from the environment
    pub fn azure_from_env(config: LMConfig) -> anyhow::Result<Self> {
        let settings = AzureSettings::from_env()?;
        let config = LMConfig {
            model: settings.deployment,
            ..config
        };
        let provider =
            AzureOpenAIProvider::new(settings.endpoint, settings.api_key, settings.api_version);
        Ok(Self::new(config, Box::new(provider)))
    }

    /// Provider backing this client
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(6);
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Optional connection settings for [`LMClient::from_model_string`]
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Base URL or endpoint
    pub api_base: Option<String>,
    /// API key
    pub api_key: Option<String>,
    /// API version (Azure)
    pub api_version: Option<String>,
    /// Generation defaults; `model` is replaced by the parsed name
    pub config: LMConfig,
}

impl ClientOptions {
    /// Set the base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Set generation defaults
    pub fn with_config(mut self, config: LMConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl LM for LMClient {
    async fn generate(&self, request: &LMRequest<'_>) -> anyhow::Result<LMResponse> {
        let _permit = self.pool.acquire().await?;

        let mut attempt = 0;
        loop {
            match self.provider.complete(request, &self.config).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let retryable = err
                        .downcast_ref::<ProviderError>()
                        .is_some_and(ProviderError::is_retryable);
                    if !retryable || attempt >= self.config.num_retries {
                        return Err(err.context(format!("LM call to {} failed", self.config.model)));
                    }
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        model = %self.config.model,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying LM call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &LMConfig {
        &self.config
    }
}
