// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Core type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name to value map shared by inputs, examples and predictions
pub type FieldMap = serde_json::Map<String, Value>;

/// Render a field value for a prompt: strings verbatim, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Represents the inputs of one module call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inputs {
    fields: FieldMap,
}

impl Inputs {
    /// Create new inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Get all fields
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Take the underlying map
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

impl From<FieldMap> for Inputs {
    fn from(fields: FieldMap) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Inputs {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_insert_and_get() {
        let inputs = Inputs::new().with("key1", "value1").with("n", 3);

        assert_eq!(inputs.get_str("key1"), Some("value1"));
        assert_eq!(inputs.get("n"), Some(&Value::from(3)));
        assert_eq!(inputs.get("key3"), None);
    }

    #[test]
    fn test_inputs_from_iter() {
        let inputs: Inputs = vec![("a", Value::from("1")), ("b", Value::from("2"))]
            .into_iter()
            .collect();
        assert_eq!(inputs.get_str("a"), Some("1"));
        assert_eq!(inputs.fields().len(), 2);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&Value::from("plain")), "plain");
        assert_eq!(value_to_text(&serde_json::json!(["a", "b"])), r#"["a","b"]"#);
        assert_eq!(value_to_text(&Value::Null), "");
    }
}
