// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Call context
//!
//! Every module call receives a [`Settings`] value holding the LM, the
//! adapter and the shared history. Cloning is cheap; overrides such as a
//! raised temperature or an active trace apply to the clone only.

use crate::adapter::{Adapter, ChatAdapter};
use crate::history::History;
use crate::trace::Trace;
use sigil_client::LM;
use std::sync::Arc;

/// Context for module calls
#[derive(Clone)]
pub struct Settings {
    lm: Arc<dyn LM>,
    adapter: Arc<dyn Adapter>,
    history: Arc<History>,
    trace: Option<Trace>,
    temperature: Option<f32>,
    rollout_id: Option<u32>,
}

impl Settings {
    /// Settings around `lm` with the chat adapter and a fresh history
    pub fn new(lm: impl LM + 'static) -> Self {
        Self::from_arc(Arc::new(lm))
    }

    /// Settings around a shared LM handle
    pub fn from_arc(lm: Arc<dyn LM>) -> Self {
        Self {
            lm,
            adapter: Arc::new(ChatAdapter::default()),
            history: Arc::new(History::default()),
            trace: None,
            temperature: None,
            rollout_id: None,
        }
    }

    /// Use a different adapter
    pub fn with_adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Arc::new(adapter);
        self
    }

    /// Use a different LM, keeping history and adapter
    pub fn with_lm(mut self, lm: Arc<dyn LM>) -> Self {
        self.lm = lm;
        self
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Tag requests so sampled calls miss the cache
    pub fn with_rollout_id(mut self, rollout_id: u32) -> Self {
        self.rollout_id = Some(rollout_id);
        self
    }

    /// Record predictor calls into `trace`
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// LM handle
    pub fn lm(&self) -> &Arc<dyn LM> {
        &self.lm
    }

    /// Adapter
    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// Shared history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Active trace, if any
    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Temperature override
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Rollout id override
    pub fn rollout_id(&self) -> Option<u32> {
        self.rollout_id
    }

    /// The last `n` LM interactions rendered as text, oldest first.
    pub fn inspect_history(&self, n: usize) -> String {
        self.history
            .last(n)
            .iter()
            .map(|entry| entry.render())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("model", &self.lm.model())
            .field("adapter", &self.adapter.name())
            .field("tracing", &self.trace.is_some())
            .field("temperature", &self.temperature)
            .field("rollout_id", &self.rollout_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::JSONAdapter;
    use sigil_client::MockLM;

    #[test]
    fn test_overrides_apply_to_clone_only() {
        let base = Settings::new(MockLM::constant("x"));
        let hot = base.clone().with_temperature(0.7).with_rollout_id(2);

        assert_eq!(base.temperature(), None);
        assert_eq!(hot.temperature(), Some(0.7));
        assert_eq!(hot.rollout_id(), Some(2));
        assert_eq!(base.adapter().name(), "chat");
        assert_eq!(base.with_adapter(JSONAdapter::default()).adapter().name(), "json");
    }

    #[test]
    fn test_inspect_history_empty() {
        let settings = Settings::new(MockLM::constant("x"));
        assert_eq!(settings.inspect_history(3), "");
    }
}
