// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! LM request types

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message<'a> {
    /// Role (system, user, assistant)
    #[serde(borrow)]
    pub role: Cow<'a, str>,

    /// Content
    #[serde(borrow)]
    pub content: Cow<'a, str>,
}

impl<'a> Message<'a> {
    /// Create a system message
    pub fn system(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            role: Cow::Borrowed("system"),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            role: Cow::Borrowed("user"),
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<Cow<'a, str>>) -> Self {
        Self {
            role: Cow::Borrowed("assistant"),
            content: content.into(),
        }
    }

    /// Convert to owned version
    pub fn into_owned(self) -> Message<'static> {
        Message {
            role: Cow::Owned(self.role.into_owned()),
            content: Cow::Owned(self.content.into_owned()),
        }
    }
}

/// Structured output request sent to providers that support it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Any valid JSON object
    JsonObject,
    /// JSON validated against a schema
    JsonSchema {
        /// Schema name reported to the provider
        name: String,
        /// JSON schema document
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    /// Create a schema-constrained format.
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self::JsonSchema {
            name: name.into(),
            schema,
        }
    }
}

/// Request to language model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LMRequest<'a> {
    /// Messages in the conversation
    #[serde(borrow)]
    pub messages: Vec<Message<'a>>,

    /// Override temperature
    pub temperature: Option<f32>,

    /// Override max tokens
    pub max_tokens: Option<u32>,

    /// Requested output format
    pub response_format: Option<ResponseFormat>,

    /// Distinguishes sampled requests that are otherwise identical,
    /// so each gets its own cache entry.
    pub rollout_id: Option<u32>,
}

impl<'a> LMRequest<'a> {
    /// Create a new request
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            response_format: None,
            rollout_id: None,
        }
    }

    /// Create from a list of messages
    pub fn from_messages(messages: Vec<Message<'a>>) -> Self {
        Self {
            messages,
            ..Self::new()
        }
    }

    /// Add a message
    pub fn add_message(mut self, message: Message<'a>) -> Self {
        self.messages.push(message);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the response format
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    /// Set the rollout id
    pub fn with_rollout_id(mut self, rollout_id: u32) -> Self {
        self.rollout_id = Some(rollout_id);
        self
    }
}

impl<'a> Default for LMRequest<'a> {
    fn default() -> Self {
        Self::new()
    }
}
