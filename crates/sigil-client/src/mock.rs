// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Scripted LM for tests and offline runs

use crate::lm::{LMConfig, LM};
use crate::request::LMRequest;
use crate::response::{LMResponse, Usage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

type Responder = dyn Fn(&LMRequest<'_>) -> String + Send + Sync;

/// LM whose replies are computed by a closure over the request.
pub struct MockLM {
    responder: Box<Responder>,
    config: LMConfig,
    calls: AtomicUsize,
}

impl MockLM {
    /// Create a mock that answers with `responder(request)`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LMRequest<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            config: LMConfig::for_model("mock"),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that always returns `text`
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| text.clone())
    }

    /// Replace the reported config
    pub fn with_config(mut self, config: LMConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LM for MockLM {
    async fn generate(&self, request: &LMRequest<'_>) -> anyhow::Result<LMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = (self.responder)(request);
        let prompt_chars: usize = request.messages.iter().map(|m| m.content.len()).sum();
        let usage = Usage::new((prompt_chars / 4) as u32, (text.len() / 4) as u32);
        Ok(LMResponse::new(text, self.config.model.clone())
            .with_usage(usage)
            .with_finish_reason("stop"))
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &LMConfig {
        &self.config
    }
}
