// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Field definitions for signatures
//!
//! Every field carries a [`FieldKind`] describing the value an LM is expected
//! to produce. The kind renders itself for prompts and turns raw LM text into
//! a typed [`serde_json::Value`].

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("valid regex"));

/// Type of field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Input field
    Input,
    /// Output field
    Output,
}

/// Value type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FieldKind {
    /// Free text
    #[default]
    Str,
    /// Integer with optional inclusive bounds
    Int {
        /// Lower bound
        ge: Option<i64>,
        /// Upper bound
        le: Option<i64>,
    },
    /// Floating point number
    Float,
    /// Boolean
    Bool,
    /// Homogeneous list
    List(Box<FieldKind>),
    /// One of a fixed set of strings
    Literal(Vec<String>),
    /// Arbitrary JSON value
    Json,
}

impl FieldKind {
    /// Unbounded integer
    pub fn int() -> Self {
        Self::Int { ge: None, le: None }
    }

    /// Integer within `ge..=le`
    pub fn int_range(ge: i64, le: i64) -> Self {
        Self::Int {
            ge: Some(ge),
            le: Some(le),
        }
    }

    /// List of `item`
    pub fn list(item: FieldKind) -> Self {
        Self::List(Box::new(item))
    }

    /// Literal over `options`
    pub fn literal<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Literal(options.into_iter().map(Into::into).collect())
    }

    /// Type name shown in prompts
    pub fn type_name(&self) -> String {
        match self {
            Self::Str => "str".to_string(),
            Self::Int { .. } => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Bool => "bool".to_string(),
            Self::List(item) => format!("list[{}]", item.type_name()),
            Self::Literal(options) => {
                let quoted: Vec<String> = options.iter().map(|o| format!("'{o}'")).collect();
                format!("Literal[{}]", quoted.join(", "))
            }
            Self::Json => "dict".to_string(),
        }
    }

    /// Formatting constraint appended to output field descriptions.
    pub fn constraint(&self) -> Option<String> {
        match self {
            Self::Str => None,
            Self::Int { ge, le } => Some(match (ge, le) {
                (Some(lo), Some(hi)) => format!("a single integer between {lo} and {hi}"),
                (Some(lo), None) => format!("a single integer >= {lo}"),
                (None, Some(hi)) => format!("a single integer <= {hi}"),
                (None, None) => "a single integer".to_string(),
            }),
            Self::Float => Some("a single number".to_string()),
            Self::Bool => Some("true or false".to_string()),
            Self::List(item) => Some(match item.constraint() {
                Some(inner) => format!("a JSON array where each item is {inner}"),
                None => "a JSON array of strings".to_string(),
            }),
            Self::Literal(options) => Some(format!("exactly one of: {}", options.join("; "))),
            Self::Json => Some("a single JSON object".to_string()),
        }
    }

    /// JSON schema describing values of this kind
    pub fn json_schema(&self) -> Value {
        match self {
            Self::Str => serde_json::json!({ "type": "string" }),
            Self::Int { ge, le } => {
                let mut schema = serde_json::json!({ "type": "integer" });
                if let Some(lo) = ge {
                    schema["minimum"] = Value::from(*lo);
                }
                if let Some(hi) = le {
                    schema["maximum"] = Value::from(*hi);
                }
                schema
            }
            Self::Float => serde_json::json!({ "type": "number" }),
            Self::Bool => serde_json::json!({ "type": "boolean" }),
            Self::List(item) => serde_json::json!({ "type": "array", "items": item.json_schema() }),
            Self::Literal(options) => serde_json::json!({ "type": "string", "enum": options }),
            Self::Json => serde_json::json!({ "type": "object" }),
        }
    }

    /// Parse raw LM text into a value of this kind.
    pub fn coerce(&self, raw: &str) -> Result<Value> {
        let text = raw.trim();
        match self {
            Self::Str => Ok(Value::String(text.to_string())),
            Self::Int { ge, le } => {
                let n = parse_int(text)?;
                check_bounds(n, *ge, *le)?;
                Ok(Value::from(n))
            }
            Self::Float => {
                let n = parse_float(text)?;
                Ok(Value::from(n))
            }
            Self::Bool => parse_bool(text).map(Value::Bool),
            Self::List(item) => {
                let items = split_list(text)?;
                items
                    .iter()
                    .map(|element| match element {
                        Value::String(s) => item.coerce(s),
                        other => item.coerce_value(other),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            Self::Literal(options) => match_literal(options, text).map(Value::String),
            Self::Json => serde_json::from_str(strip_fence(text))
                .map_err(|e| Error::parse(format!("expected JSON, got {text:?}: {e}"))),
        }
    }

    /// Validate an already-structured value, coercing strings where needed.
    pub fn coerce_value(&self, value: &Value) -> Result<Value> {
        match (self, value) {
            (Self::Str, Value::String(s)) => Ok(Value::String(s.trim().to_string())),
            (Self::Str, other) => Ok(Value::String(other.to_string())),
            (Self::Json, other) => Ok(other.clone()),
            (_, Value::String(s)) => self.coerce(s),
            (Self::Int { ge, le }, Value::Number(n)) => {
                let n = n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(whole_to_i64))
                    .ok_or_else(|| Error::parse(format!("expected integer, got {n}")))?;
                check_bounds(n, *ge, *le)?;
                Ok(Value::from(n))
            }
            (Self::Float, Value::Number(_)) | (Self::Bool, Value::Bool(_)) => Ok(value.clone()),
            (Self::List(item), Value::Array(items)) => items
                .iter()
                .map(|v| item.coerce_value(v))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            (Self::List(item), other) => Ok(Value::Array(vec![item.coerce_value(other)?])),
            (Self::Literal(options), other) => {
                match_literal(options, &other.to_string()).map(Value::String)
            }
            (kind, other) => Err(Error::parse(format!(
                "expected {}, got {other}",
                kind.type_name()
            ))),
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.find('\n').map_or(rest, |idx| &rest[idx + 1..]);
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn parse_int(text: &str) -> Result<i64> {
    let invalid = || Error::parse(format!("expected integer, got {text:?}"));
    if let Ok(n) = text.parse::<i64>() {
        return Ok(n);
    }
    let token = NUMBER.find(text).ok_or_else(invalid)?.as_str();
    if !token.contains('.') {
        return token.parse::<i64>().map_err(|_| {
            Error::parse(format!("integer {token} out of range in {text:?}"))
        });
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(whole_to_i64)
        .ok_or_else(invalid)
}

/// `f` as an integer, if it is whole and fits in `i64`.
fn whole_to_i64(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

fn parse_float(text: &str) -> Result<f64> {
    if let Ok(n) = text.parse::<f64>() {
        return Ok(n);
    }
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| Error::parse(format!("expected number, got {text:?}")))
}

fn parse_bool(text: &str) -> Result<bool> {
    match text
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase()
        .as_str()
    {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(Error::parse(format!("expected true or false, got {text:?}"))),
    }
}

fn check_bounds(n: i64, ge: Option<i64>, le: Option<i64>) -> Result<()> {
    if ge.is_some_and(|lo| n < lo) || le.is_some_and(|hi| n > hi) {
        return Err(Error::parse(format!(
            "{n} outside allowed range {}..={}",
            ge.map_or("-inf".to_string(), |v| v.to_string()),
            le.map_or("inf".to_string(), |v| v.to_string()),
        )));
    }
    Ok(())
}

fn match_literal(options: &[String], text: &str) -> Result<String> {
    let cleaned = text
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '[' | ']' | '.' | ','))
        .trim();
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(cleaned))
        .cloned()
        .ok_or_else(|| {
            Error::parse(format!(
                "{cleaned:?} is not one of [{}]",
                options.join(", ")
            ))
        })
}

fn split_list(text: &str) -> Result<Vec<Value>> {
    let body = strip_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    if body.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) {
            return Ok(items);
        }
    }

    let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
    let parts: Vec<String> = if lines.len() > 1 || lines.iter().any(|l| BULLET.is_match(l)) {
        lines
            .iter()
            .map(|l| BULLET.replace(l, "").trim().to_string())
            .collect()
    } else {
        body.trim_matches(|c: char| c == '[' || c == ']')
            .split(',')
            .map(|p| p.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
            .collect()
    };

    Ok(parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(Value::String)
        .collect())
}

/// A field in a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,

    /// Field description
    pub desc: String,

    /// Field prefix for formatting
    pub prefix: String,

    /// Field type (input or output)
    pub field_type: FieldType,

    /// Value kind
    #[serde(default)]
    pub kind: FieldKind,
}

impl Field {
    /// Create a new field
    pub fn new(name: impl Into<String>, desc: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let prefix = Self::infer_prefix(&name);

        Self {
            name,
            desc: desc.into(),
            prefix,
            field_type,
            kind: FieldKind::Str,
        }
    }

    /// Set the prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the value kind
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this is an input field
    pub fn is_input(&self) -> bool {
        self.field_type == FieldType::Input
    }

    /// Infer prefix from field name (snake_case or camelCase -> Title Case)
    fn infer_prefix(name: &str) -> String {
        let mut result = String::with_capacity(name.len() + 5);
        let mut prev_lower = false;
        let mut start_word = true;

        for ch in name.chars() {
            if ch == '_' {
                if !result.is_empty() {
                    result.push(' ');
                }
                start_word = true;
                prev_lower = false;
                continue;
            }
            if ch.is_uppercase() && prev_lower {
                result.push(' ');
                start_word = true;
            }

            if start_word {
                result.extend(ch.to_uppercase());
            } else {
                result.push(ch);
            }

            start_word = false;
            prev_lower = ch.is_lowercase();
        }

        result
    }
}

/// Helper to create an input field
pub struct InputField;

impl InputField {
    /// Create an input field.
    pub fn create(name: impl Into<String>, desc: impl Into<String>) -> Field {
        Field::new(name, desc, FieldType::Input)
    }
}

/// Helper to create an output field
pub struct OutputField;

impl OutputField {
    /// Create an output field.
    pub fn create(name: impl Into<String>, desc: impl Into<String>) -> Field {
        Field::new(name, desc, FieldType::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_prefix() {
        assert_eq!(Field::infer_prefix("question"), "Question");
        assert_eq!(Field::infer_prefix("answerText"), "Answer Text");
        assert_eq!(Field::infer_prefix("ticket_text"), "Ticket Text");
        assert_eq!(Field::infer_prefix("next_best_action"), "Next Best Action");
    }

    #[test]
    fn test_field_creation() {
        let field = InputField::create("query", "User query");
        assert_eq!(field.name, "query");
        assert_eq!(field.prefix, "Query");
        assert_eq!(field.field_type, FieldType::Input);
        assert_eq!(field.kind, FieldKind::Str);
    }

    #[test]
    fn test_int_bounds() {
        let kind = FieldKind::int_range(0, 10);
        assert_eq!(kind.coerce("7").unwrap(), Value::from(7));
        assert_eq!(kind.coerce("Score: 8/10").unwrap(), Value::from(8));
        assert!(kind.coerce("11").is_err());
        assert!(kind.coerce("-1").is_err());
        assert!(kind.coerce("positive").is_err());
    }

    #[test]
    fn test_int_overflow_is_rejected() {
        let kind = FieldKind::Int { ge: None, le: None };
        assert!(kind.coerce("99999999999999999999").is_err());
        assert!(kind.coerce("about 99999999999999999999 users").is_err());
        assert_eq!(kind.coerce("-12.0").unwrap(), Value::from(-12));
        assert!(kind
            .coerce_value(&serde_json::json!(18446744073709551615u64))
            .is_err());
        assert!(kind.coerce_value(&serde_json::json!(1.0e300)).is_err());
    }

    #[test]
    fn test_literal_is_case_insensitive_and_canonical() {
        let kind = FieldKind::literal(["Billing", "Technical", "Urgent"]);
        assert_eq!(kind.coerce(" urgent. ").unwrap(), Value::from("Urgent"));
        assert!(kind.coerce("Sales").is_err());
    }

    #[test]
    fn test_list_forms() {
        let kind = FieldKind::list(FieldKind::Str);
        let expected = serde_json::json!(["a", "b"]);
        assert_eq!(kind.coerce(r#"["a", "b"]"#).unwrap(), expected);
        assert_eq!(kind.coerce("- a\n- b").unwrap(), expected);
        assert_eq!(kind.coerce("1. a\n2. b").unwrap(), expected);
        assert_eq!(kind.coerce("a, b").unwrap(), expected);
        assert_eq!(kind.coerce("").unwrap(), serde_json::json!([]));
    }

    #[test]
    fn test_list_of_literals() {
        let kind = FieldKind::list(FieldKind::literal(["Product Quality", "Pricing"]));
        assert_eq!(
            kind.coerce(r#"["pricing", "product quality"]"#).unwrap(),
            serde_json::json!(["Pricing", "Product Quality"])
        );
        assert!(kind.coerce(r#"["Shipping"]"#).is_err());
    }

    #[test]
    fn test_coerce_value_numbers() {
        let kind = FieldKind::int_range(0, 10);
        assert_eq!(kind.coerce_value(&Value::from(3)).unwrap(), Value::from(3));
        assert_eq!(kind.coerce_value(&Value::from(4.0)).unwrap(), Value::from(4));
        assert!(kind.coerce_value(&Value::from(4.5)).is_err());
        assert!(FieldKind::Bool.coerce_value(&Value::from(1)).is_err());
    }

    #[test]
    fn test_bool_and_json() {
        assert_eq!(FieldKind::Bool.coerce("Yes").unwrap(), Value::Bool(true));
        assert_eq!(
            FieldKind::Json.coerce("```json\n{\"a\": 1}\n```").unwrap(),
            serde_json::json!({"a": 1})
        );
    }

    #[test]
    fn test_json_schema() {
        assert_eq!(
            FieldKind::int_range(0, 10).json_schema(),
            serde_json::json!({"type": "integer", "minimum": 0, "maximum": 10})
        );
        assert_eq!(
            FieldKind::list(FieldKind::literal(["A"])).json_schema(),
            serde_json::json!({"type": "array", "items": {"type": "string", "enum": ["A"]}})
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(FieldKind::int().type_name(), "int");
        assert_eq!(
            FieldKind::list(FieldKind::literal(["A", "B"])).type_name(),
            "list[Literal['A', 'B']]"
        );
    }
}
