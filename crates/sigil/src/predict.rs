// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Predict: the basic LM-backed module
//!
//! A [`Predict`] owns a signature and a list of demos. Each call formats the
//! prompt with the context's adapter, sends it to the context's LM and parses
//! the completion back into the signature's outputs.

use crate::error::{Error, Result};
use crate::example::Example;
use crate::history::HistoryEntry;
use crate::prediction::Prediction;
use crate::settings::Settings;
use crate::signature::Signature;
use crate::types::Inputs;
use serde::{Deserialize, Serialize};
use sigil_client::LMRequest;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PREDICTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Learnable state of a predictor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictState {
    /// Signature in `inputs -> outputs` form, for reference
    #[serde(default)]
    pub signature: String,
    /// Instructions
    pub instructions: String,
    /// Few-shot demos
    pub demos: Vec<Example>,
}

/// LM-backed predictor for one signature.
///
/// Clones keep the id of the original so traces recorded on a copy can be
/// mapped back to the predictor they came from.
#[derive(Debug, Clone)]
pub struct Predict {
    id: u64,
    signature: Signature,
    demos: Vec<Example>,
}

impl Predict {
    /// Create a predictor for `signature`
    pub fn new(signature: Signature) -> Self {
        Self {
            id: NEXT_PREDICTOR_ID.fetch_add(1, Ordering::Relaxed),
            signature,
            demos: Vec::new(),
        }
    }

    /// Parse `spec` (`"question -> answer"`) and create a predictor
    pub fn from_spec(spec: &str) -> Result<Self> {
        Ok(Self::new(Signature::parse(spec)?))
    }

    /// Set demos
    pub fn with_demos(mut self, demos: Vec<Example>) -> Self {
        self.demos = demos;
        self
    }

    /// Predictor id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Replace the signature
    pub fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    /// Replace the instructions, keeping the fields
    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.signature.instructions = instructions.into();
    }

    /// Demos
    pub fn demos(&self) -> &[Example] {
        &self.demos
    }

    /// Replace demos
    pub fn set_demos(&mut self, demos: Vec<Example>) {
        self.demos = demos;
    }

    /// Snapshot of the learnable state
    pub fn dump_state(&self) -> PredictState {
        PredictState {
            signature: self.signature.to_string_format(),
            instructions: self.signature.instructions.clone(),
            demos: self.demos.clone(),
        }
    }

    /// Restore learnable state
    pub fn load_state(&mut self, state: PredictState) {
        self.signature.instructions = state.instructions;
        self.demos = state.demos;
    }

    fn check_inputs(&self, inputs: &Inputs) -> Result<()> {
        let missing: Vec<&str> = self
            .signature
            .input_names()
            .filter(|name| !inputs.contains(name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::field(format!(
            "missing input field(s) {} for {}",
            missing.join(", "),
            self.signature.name
        )))
    }

    /// Run the predictor once.
    pub async fn call(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        self.check_inputs(inputs)?;

        let adapter = ctx.adapter();
        let messages = adapter.format(&self.signature, &self.demos, inputs);

        let mut request = LMRequest::from_messages(messages);
        request.temperature = ctx.temperature();
        request.rollout_id = ctx.rollout_id();
        request.response_format = adapter.response_format(&self.signature);

        let lm = ctx.lm();
        let response = lm.generate(&request).await.map_err(Error::lm)?;

        tracing::debug!(
            signature = %self.signature.name,
            model = %response.model,
            cached = response.cached,
            demos = self.demos.len(),
            "predict call"
        );
        if response.truncated() {
            tracing::warn!(signature = %self.signature.name, "completion hit the token limit");
        }

        ctx.history().push(HistoryEntry {
            model: response.model.clone(),
            messages: request.messages,
            response: response.text.clone(),
            usage: response.usage,
            cached: response.cached,
        });

        let prediction = adapter
            .parse(&self.signature, &response.text)?
            .with_metadata(response.usage, response.model);

        if let Some(trace) = ctx.trace() {
            trace.record(self.id, inputs.clone(), prediction.clone());
        }

        Ok(prediction)
    }
}
