// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! LM selection shared by the demo binaries
//!
//! Without `--model` the Azure deployment named by the `AZURE_OPENAI_*`
//! variables is used. Responses go through an in-memory LRU cache, or a
//! directory cache with `--cache-dir`.

use clap::Args;
use sigil::Settings;
use sigil_cache::{DiskCache, MemoryCache};
use sigil_client::{CachedLM, ClientOptions, LMClient, LMConfig, LM};
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable consulted for Ollama models without `--api-base`
pub const OLLAMA_BASE_ENV: &str = "OLLAMA_BASE_URL";

/// Entries kept by the in-memory response cache
pub const MEMORY_CACHE_CAPACITY: usize = 10_000;

/// Command-line options selecting and tuning the LM.
#[derive(Debug, Clone, Args)]
pub struct LmArgs {
    /// Model as `provider/name` (azure/..., openai/..., ollama_chat/...)
    #[arg(long)]
    pub model: Option<String>,

    /// Provider base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f32,

    /// Completion token limit
    #[arg(long, default_value_t = 4000)]
    pub max_tokens: u32,

    /// Maximum LM requests in flight
    #[arg(long, default_value_t = 10)]
    pub max_concurrent: usize,

    /// Disable response caching
    #[arg(long)]
    pub no_cache: bool,

    /// Keep cached responses as files under this directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for LmArgs {
    fn default() -> Self {
        Self {
            model: None,
            api_base: None,
            temperature: 0.0,
            max_tokens: 4000,
            max_concurrent: 10,
            no_cache: false,
            cache_dir: None,
        }
    }
}

impl LmArgs {
    /// Fill in a model and base URL when none was given on the command line.
    pub fn or_model(mut self, model: &str, api_base: Option<&str>) -> Self {
        if self.model.is_none() {
            self.model = Some(model.to_string());
            if self.api_base.is_none() {
                self.api_base = api_base.map(str::to_string);
            }
        }
        self
    }

    /// Generation defaults for the client
    pub fn config(&self) -> LMConfig {
        LMConfig::default()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_max_concurrent(self.max_concurrent)
            .with_cache(!self.no_cache)
    }

    /// Connection options for [`LMClient::from_model_string`]
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default().with_config(self.config());
        let api_base = self.api_base.clone().or_else(|| {
            self.model
                .as_deref()
                .filter(|m| m.starts_with("ollama"))
                .and_then(|_| std::env::var(OLLAMA_BASE_ENV).ok())
        });
        if let Some(base) = api_base {
            options = options.with_api_base(base);
        }
        options
    }

    /// Build the HTTP client these options describe.
    pub fn client(&self) -> anyhow::Result<LMClient> {
        match &self.model {
            Some(model) => LMClient::from_model_string(model, self.client_options()),
            None => LMClient::azure_from_env(self.config()),
        }
    }
}

/// The LM handed to a demo, plus the in-memory cache when one is in use.
pub struct DemoLM {
    lm: Arc<dyn LM>,
    memory: Option<Arc<MemoryCache>>,
}

impl DemoLM {
    /// Build the client and its cache from command-line options.
    pub async fn from_args(args: &LmArgs) -> anyhow::Result<Self> {
        let client = args.client()?;
        tracing::info!(model = %client.model(), cache = !args.no_cache, "using LM");
        Self::wrap(client, args).await
    }

    /// Put `inner` behind the cache `args` asks for.
    pub async fn wrap<L: LM + 'static>(inner: L, args: &LmArgs) -> anyhow::Result<Self> {
        if let Some(dir) = &args.cache_dir {
            let cache = DiskCache::new(dir.clone()).await?;
            return Ok(Self {
                lm: Arc::new(CachedLM::new(inner, cache)),
                memory: None,
            });
        }
        let memory = Arc::new(MemoryCache::new(MEMORY_CACHE_CAPACITY)?);
        Ok(Self {
            lm: Arc::new(CachedLM::new(inner, memory.clone())),
            memory: Some(memory),
        })
    }

    /// Shared LM handle
    pub fn lm(&self) -> Arc<dyn LM> {
        self.lm.clone()
    }

    /// The in-memory cache, absent when responses are cached on disk
    pub fn memory_cache(&self) -> Option<&MemoryCache> {
        self.memory.as_deref()
    }

    /// Call context with the chat adapter
    pub fn settings(&self) -> Settings {
        Settings::from_arc(self.lm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_client::{LMRequest, Message, MockLM};

    #[test]
    fn test_or_model_keeps_explicit_choice() {
        let args = LmArgs {
            model: Some("openai/gpt-4o-mini".into()),
            ..LmArgs::default()
        }
        .or_model("ollama_chat/llama3.2:1b", Some("http://ollama:11434"));
        assert_eq!(args.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(args.api_base, None);

        let args = LmArgs::default().or_model("ollama_chat/llama3.2:1b", Some("http://ollama:11434"));
        assert_eq!(args.model.as_deref(), Some("ollama_chat/llama3.2:1b"));
        assert_eq!(args.api_base.as_deref(), Some("http://ollama:11434"));
    }

    #[test]
    fn test_config_reflects_flags() {
        let args = LmArgs {
            temperature: 0.3,
            no_cache: true,
            ..LmArgs::default()
        };
        let config = args.config();
        assert!(!config.cache);
        assert!((config.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let args = LmArgs {
            model: Some("nowhere/model".into()),
            ..LmArgs::default()
        };
        assert!(args.client().is_err());
    }

    #[tokio::test]
    async fn test_wrap_uses_memory_cache() {
        let mock = Arc::new(MockLM::constant("hello"));
        let demo = DemoLM::wrap(mock.clone(), &LmArgs::default()).await.unwrap();
        let request = LMRequest::from_messages(vec![Message::user("hi")]);

        demo.lm().generate(&request).await.unwrap();
        let second = demo.lm().generate(&request).await.unwrap();

        assert!(second.cached);
        assert_eq!(mock.calls(), 1);
        assert_eq!(demo.memory_cache().unwrap().len().await, 1);
    }

    #[tokio::test]
    async fn test_wrap_with_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let args = LmArgs {
            cache_dir: Some(dir.path().join("lm")),
            ..LmArgs::default()
        };
        let demo = DemoLM::wrap(MockLM::constant("x"), &args).await.unwrap();
        assert!(demo.memory_cache().is_none());
        assert!(dir.path().join("lm").is_dir());
    }
}
