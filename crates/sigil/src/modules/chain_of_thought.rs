// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Chain of Thought module
//!
//! Implements the Chain of Thought (CoT) reasoning strategy where the LM
//! is prompted to show its reasoning steps before providing an answer.

use crate::error::Result;
use crate::field::OutputField;
use crate::module::Module;
use crate::predict::Predict;
use crate::prediction::Prediction;
use crate::settings::Settings;
use crate::signature::Signature;
use crate::types::Inputs;
use async_trait::async_trait;

/// Name of the prepended output field
pub const REASONING_FIELD: &str = "reasoning";

/// Chain of Thought module.
///
/// Wraps a Predict module and adds a "reasoning" field to the signature,
/// prompting the LM to show its work before answering.
///
/// ## Example
///
/// ```ignore
/// let cot = ChainOfThought::from_spec("question -> answer")?;
/// // Signature becomes: question -> reasoning, answer
/// ```
#[derive(Debug, Clone)]
pub struct ChainOfThought {
    predict: Predict,
}

impl ChainOfThought {
    /// Create a new ChainOfThought module.
    ///
    /// A `reasoning` output already declared by the signature is kept, with
    /// its description, and moved to the front.
    pub fn new(mut signature: Signature) -> Result<Self> {
        let declared = signature
            .output_fields
            .iter()
            .position(|f| f.name == REASONING_FIELD);
        let signature = match declared {
            Some(idx) => {
                let field = signature.output_fields.remove(idx);
                signature.output_fields.insert(0, field);
                signature
            }
            None => signature.prepend_output(OutputField::create(
                REASONING_FIELD,
                "Let's think step by step in order to produce the remaining outputs.",
            ))?,
        };
        Ok(Self {
            predict: Predict::new(signature),
        })
    }

    /// Parse `spec` and wrap it.
    pub fn from_spec(spec: &str) -> Result<Self> {
        Self::new(Signature::parse(spec)?)
    }

    /// The underlying predictor
    pub fn predict(&self) -> &Predict {
        &self.predict
    }

    /// Mutable access to the underlying predictor
    pub fn predict_mut(&mut self) -> &mut Predict {
        &mut self.predict
    }
}

#[async_trait]
impl Module for ChainOfThought {
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        self.predict.call(ctx, inputs).await
    }

    fn named_predictors(&self) -> Vec<(String, &Predict)> {
        vec![("predict".to_string(), &self.predict)]
    }

    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
        vec![("predict".to_string(), &mut self.predict)]
    }

    fn name(&self) -> &str {
        &self.predict.signature().name
    }
}
