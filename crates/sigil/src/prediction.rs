// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Prediction results from module execution

use crate::error::{Error, Result};
use crate::types::{value_to_text, FieldMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigil_client::Usage;

/// Result of a module prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Output fields
    outputs: FieldMap,

    /// Token usage of the LM call(s) behind this prediction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Model used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Prediction {
    /// Create a new prediction
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with outputs
    pub fn with_outputs(outputs: FieldMap) -> Self {
        Self {
            outputs,
            ..Self::default()
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an output field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.outputs.insert(key.into(), value.into());
    }

    /// Output fields
    pub fn outputs(&self) -> &FieldMap {
        &self.outputs
    }

    /// Get an output field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }

    /// Get an output field rendered as text
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.outputs.get(key).map(value_to_text)
    }

    /// Get an integer output
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.outputs.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get a list output as strings
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        match self.outputs.get(key)? {
            Value::Array(items) => Some(items.iter().map(value_to_text).collect()),
            _ => None,
        }
    }

    /// A prediction stored under `key` by a multi-stage program
    pub fn nested(&self, key: &str) -> Result<Prediction> {
        match self.outputs.get(key) {
            Some(Value::Object(map)) => Ok(Prediction::with_outputs(map.clone())),
            Some(other) => Err(Error::prediction(format!(
                "field {key:?} is not a nested prediction: {other}"
            ))),
            None => Err(Error::prediction(format!("no field {key:?} in prediction"))),
        }
    }

    /// Outputs as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.outputs.clone())
    }

    /// Attach usage and model metadata
    pub fn with_metadata(mut self, usage: Option<Usage>, model: impl Into<String>) -> Self {
        self.usage = usage;
        self.model = Some(model.into());
        self
    }

    /// Accumulate usage from another call
    pub fn add_usage(&mut self, usage: Option<Usage>) {
        self.usage = match (self.usage, usage) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Prediction(")?;
        for (k, v) in &self.outputs {
            writeln!(f, "    {k}={},", value_to_text(v))?;
        }
        write!(f, ")")
    }
}
