// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! # Sigil Client
//!
//! LM client abstraction: providers for Azure OpenAI, OpenAI and Ollama,
//! retries with backoff, concurrency limits and response caching.

#![warn(missing_docs)]

pub mod cached;
pub mod env;
pub mod lm;
pub mod mock;
pub mod pool;
pub mod provider;
pub mod request;
pub mod response;
pub mod structured;

pub use cached::CachedLM;
pub use env::AzureSettings;
pub use lm::{ClientOptions, LMClient, LMConfig, LM};
pub use mock::MockLM;
pub use pool::LMPool;
pub use provider::{
    AzureOpenAIProvider, OllamaProvider, OpenAIProvider, Provider, ProviderError, ProviderType,
};
pub use request::{LMRequest, Message, ResponseFormat};
pub use response::{LMResponse, Usage};
pub use structured::{generate_structured, parse_structured};
