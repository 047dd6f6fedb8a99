// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! LM response types

use serde::{Deserialize, Serialize};

/// Response from language model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LMResponse {
    /// Generated text
    pub text: String,

    /// Token usage
    pub usage: Option<Usage>,

    /// Model that generated the response
    pub model: String,

    /// Finish reason
    pub finish_reason: Option<String>,

    /// Whether the response was served from a cache
    #[serde(default)]
    pub cached: bool,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u32,

    /// Completion tokens
    pub completion_tokens: u32,

    /// Total tokens
    pub total_tokens: u32,
}

impl Usage {
    /// Create new usage stats
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage::new(
            self.prompt_tokens + rhs.prompt_tokens,
            self.completion_tokens + rhs.completion_tokens,
        )
    }
}

impl LMResponse {
    /// Create a new response
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            model: model.into(),
            finish_reason: None,
            cached: false,
        }
    }

    /// Add usage stats
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set finish reason
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    /// Whether generation stopped at the token limit
    pub fn truncated(&self) -> bool {
        matches!(self.finish_reason.as_deref(), Some("length"))
    }
}
