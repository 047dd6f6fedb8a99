// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Training and evaluation examples

use crate::error::{Error, Result};
use crate::prediction::Prediction;
use crate::types::{FieldMap, Inputs};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::path::Path;

/// An example for training or evaluation.
///
/// Holds every field of a record plus the subset of keys that act as
/// inputs; the remaining keys are labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    data: FieldMap,
    input_keys: SmallVec<[String; 4]>,
}

impl Example {
    /// Create an empty example
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self {
                data,
                input_keys: SmallVec::new(),
            }),
            other => Err(Error::field(format!(
                "example must be a JSON object, got {other}"
            ))),
        }
    }

    /// Merge call inputs and a prediction into one example, inputs marked.
    pub fn from_call(inputs: &Inputs, prediction: &Prediction) -> Self {
        let mut data = inputs.fields().clone();
        for (k, v) in prediction.outputs() {
            data.insert(k.clone(), v.clone());
        }
        Self {
            data,
            input_keys: inputs.fields().keys().cloned().collect(),
        }
    }

    /// Builder-style field insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Copy of this example with `keys` designated as inputs
    pub fn with_inputs<I, S>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: self.data.clone(),
            input_keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Keys designated as inputs
    pub fn input_keys(&self) -> &[String] {
        &self.input_keys
    }

    /// Input fields only
    pub fn inputs(&self) -> Inputs {
        self.input_keys
            .iter()
            .filter_map(|k| self.data.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Non-input fields
    pub fn labels(&self) -> FieldMap {
        self.data
            .iter()
            .filter(|(k, _)| !self.input_keys.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// All fields
    pub fn data(&self) -> &FieldMap {
        &self.data
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the example has no fields
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Load line-delimited JSON, one example per non-blank line.
    pub fn load_jsonl<I, S>(path: impl AsRef<Path>, input_keys: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.as_ref();
        let keys: SmallVec<[String; 4]> = input_keys.into_iter().map(Into::into).collect();
        let content = std::fs::read_to_string(path)?;

        let mut examples = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| {
                Error::parse(format!("{}:{}: {e}", path.display(), idx + 1))
            })?;
            let mut example = Self::from_value(value)
                .map_err(|e| Error::parse(format!("{}:{}: {e}", path.display(), idx + 1)))?;
            example.input_keys = keys.clone();
            examples.push(example);
        }

        tracing::debug!(path = %path.display(), count = examples.len(), "loaded examples");
        Ok(examples)
    }
}
