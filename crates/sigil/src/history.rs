// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Bounded log of LM interactions

use parking_lot::Mutex;
use sigil_client::{Message, Usage};
use std::collections::VecDeque;
use std::fmt::Write;

/// Default number of interactions kept
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// One prompt/response exchange
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Model that answered
    pub model: String,
    /// Messages sent
    pub messages: Vec<Message<'static>>,
    /// Raw completion text
    pub response: String,
    /// Token usage
    pub usage: Option<Usage>,
    /// Whether the response came from a cache
    pub cached: bool,
}

impl HistoryEntry {
    /// Human-readable rendering
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model: {}{}", self.model, if self.cached { " (cached)" } else { "" });
        out.push('\n');
        for message in &self.messages {
            let label = match message.role.as_ref() {
                "system" => "System message:",
                "assistant" => "Assistant message:",
                _ => "User message:",
            };
            let _ = write!(out, "{label}\n\n{}\n\n", message.content);
        }
        let _ = write!(out, "Response:\n\n{}\n", self.response);
        if let Some(usage) = self.usage {
            let _ = writeln!(
                out,
                "\n(tokens: {} prompt, {} completion)",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        out
    }
}

/// Thread-safe ring of recent interactions
#[derive(Debug)]
pub struct History {
    entries: Mutex<VecDeque<HistoryEntry>>,
    limit: usize,
}

impl History {
    /// Create with a retention limit (at least one entry)
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
        }
    }

    /// Append, dropping the oldest entry when full
    pub fn push(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == self.limit {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent `n` entries, oldest first
    pub fn last(&self, n: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Total usage over the stored entries
    pub fn total_usage(&self) -> Usage {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.usage)
            .fold(Usage::default(), |acc, u| acc + u)
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
