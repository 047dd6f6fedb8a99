// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Metric trait and implementations

use regex::Regex;
use serde_json::Value;
use sigil::types::value_to_text;
use sigil::{Example, Prediction, TraceEntry};
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

/// Result of a metric evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    /// Score in 0.0..=1.0
    pub score: f64,

    /// Whether the prediction passed
    pub passed: bool,

    /// Optional details
    pub details: Option<String>,
}

impl MetricResult {
    /// Create a new metric result
    pub fn new(score: f64) -> Self {
        Self {
            score,
            passed: score > 0.0,
            details: None,
        }
    }

    /// Create a passed result
    pub fn pass() -> Self {
        Self::new(1.0)
    }

    /// Create a failed result
    pub fn fail() -> Self {
        Self::new(0.0)
    }

    /// Add details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<bool> for MetricResult {
    fn from(passed: bool) -> Self {
        if passed {
            Self::pass()
        } else {
            Self::fail()
        }
    }
}

impl From<f64> for MetricResult {
    fn from(score: f64) -> Self {
        Self::new(score)
    }
}

/// Metric trait for evaluating predictions.
///
/// `trace` is set while an optimizer is bootstrapping demos and holds the
/// predictor calls made for this example.
pub trait Metric: Send + Sync {
    /// Evaluate a prediction against an example
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        trace: Option<&[TraceEntry]>,
    ) -> MetricResult;

    /// Get metric name
    fn name(&self) -> &str;
}

impl<M: Metric + ?Sized> Metric for Arc<M> {
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        (**self).evaluate(example, prediction, trace)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Exact match on one field
#[derive(Debug, Clone)]
pub struct ExactMatch {
    field: String,
    ignore_case: bool,
}

impl ExactMatch {
    /// Compare `field` verbatim (after trimming)
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ignore_case: false,
        }
    }

    /// Compare case-insensitively
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

impl Metric for ExactMatch {
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        _trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        let Some(expected) = example.get(&self.field).map(value_to_text) else {
            return MetricResult::fail()
                .with_details(format!("example has no `{}` field", self.field));
        };
        let Some(actual) = prediction.get_str(&self.field) else {
            return MetricResult::fail()
                .with_details(format!("prediction has no `{}` field", self.field));
        };
        let (expected, actual) = (expected.trim(), actual.trim());
        let matched = if self.ignore_case {
            expected.to_lowercase() == actual.to_lowercase()
        } else {
            expected == actual
        };
        matched.into()
    }

    fn name(&self) -> &str {
        "exact_match"
    }
}

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static ARTICLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(a|an|the)\b").expect("valid regex"));

/// Lowercase, drop punctuation and articles, collapse whitespace.
pub fn normalize_answer(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_punct = PUNCTUATION.replace_all(&lower, "");
    let no_articles = ARTICLES.replace_all(&no_punct, " ");
    no_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized answer match; the gold field may hold several acceptable answers.
#[derive(Debug, Clone)]
pub struct AnswerExactMatch {
    field: String,
}

impl Default for AnswerExactMatch {
    fn default() -> Self {
        Self::new("answer")
    }
}

impl AnswerExactMatch {
    /// Match on `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Metric for AnswerExactMatch {
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        _trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        let golds: Vec<String> = match example.get(&self.field) {
            Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
            Some(value) => vec![value_to_text(value)],
            None => {
                return MetricResult::fail()
                    .with_details(format!("example has no `{}` field", self.field))
            }
        };
        let Some(answer) = prediction.get_str(&self.field) else {
            return MetricResult::fail()
                .with_details(format!("prediction has no `{}` field", self.field));
        };
        let answer = normalize_answer(&answer);
        golds
            .iter()
            .any(|gold| normalize_answer(gold) == answer)
            .into()
    }

    fn name(&self) -> &str {
        "answer_exact_match"
    }
}

/// Order-independent equality of list fields.
///
/// Values that are not both lists are compared directly. Missing fields are
/// logged and score as a failure.
#[derive(Debug, Clone)]
pub struct ListExactMatch {
    field: String,
}

impl ListExactMatch {
    /// Compare `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

fn as_set(items: &[Value]) -> BTreeSet<String> {
    items.iter().map(value_to_text).collect()
}

impl Metric for ListExactMatch {
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        _trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        let (Some(gold), Some(predicted)) = (example.get(&self.field), prediction.get(&self.field))
        else {
            tracing::warn!(field = %self.field, "list metric: field missing from example or prediction");
            return MetricResult::fail().with_details(format!("`{}` missing", self.field));
        };
        match (gold, predicted) {
            (Value::Array(gold), Value::Array(predicted)) => {
                (as_set(gold) == as_set(predicted)).into()
            }
            (gold, predicted) => (gold == predicted).into(),
        }
    }

    fn name(&self) -> &str {
        "list_exact_match"
    }
}

/// Metric backed by a closure.
pub struct FnMetric<F> {
    name: String,
    f: F,
}

impl<F> FnMetric<F>
where
    F: Fn(&Example, &Prediction, Option<&[TraceEntry]>) -> MetricResult + Send + Sync,
{
    /// Wrap `f` under `name`
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Metric for FnMetric<F>
where
    F: Fn(&Example, &Prediction, Option<&[TraceEntry]>) -> MetricResult + Send + Sync,
{
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        (self.f)(example, prediction, trace)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example(field: &str, value: Value) -> Example {
        Example::new().with(field, value)
    }

    #[test]
    fn test_exact_match() {
        let metric = ExactMatch::new("team");
        let ex = example("team", json!("Billing"));
        assert!(metric.evaluate(&ex, &Prediction::new().with("team", " Billing "), None).passed);
        assert!(!metric.evaluate(&ex, &Prediction::new().with("team", "billing"), None).passed);
        assert!(
            ExactMatch::new("team")
                .ignore_case()
                .evaluate(&ex, &Prediction::new().with("team", "BILLING"), None)
                .passed
        );
    }

    #[test]
    fn test_exact_match_missing_prediction_field() {
        let result = ExactMatch::new("team").evaluate(
            &example("team", json!("Sales")),
            &Prediction::new(),
            None,
        );
        assert_eq!(result.score, 0.0);
        assert!(result.details.unwrap().contains("prediction"));
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("The  Eiffel Tower!"), "eiffel tower");
        assert_eq!(normalize_answer("an apple, a day"), "apple day");
    }

    #[test]
    fn test_answer_exact_match_gold_list() {
        let metric = AnswerExactMatch::default();
        let ex = example("answer", json!(["NYC", "New York City"]));
        assert!(metric.evaluate(&ex, &Prediction::new().with("answer", "new york city."), None).passed);
        assert!(!metric.evaluate(&ex, &Prediction::new().with("answer", "Boston"), None).passed);
    }

    #[test]
    fn test_list_exact_match_ignores_order() {
        let metric = ListExactMatch::new("topics");
        let ex = example("topics", json!(["Pricing", "Support"]));
        let same = Prediction::new().with("topics", json!(["Support", "Pricing"]));
        let subset = Prediction::new().with("topics", json!(["Support"]));
        assert!(metric.evaluate(&ex, &same, None).passed);
        assert!(!metric.evaluate(&ex, &subset, None).passed);
    }

    #[test]
    fn test_list_exact_match_type_mismatch_and_missing() {
        let metric = ListExactMatch::new("topics");
        let ex = example("topics", json!(["Pricing"]));
        let scalar = Prediction::new().with("topics", "Pricing");
        assert!(!metric.evaluate(&ex, &scalar, None).passed);

        let result = metric.evaluate(&Example::new(), &scalar, None);
        assert!(!result.passed);
        assert!(result.details.is_some());
    }

    #[test]
    fn test_fn_metric() {
        let metric = FnMetric::new("always", |_: &Example, _: &Prediction, _: Option<&[TraceEntry]>| {
            MetricResult::from(0.5)
        });
        assert_eq!(metric.name(), "always");
        assert_eq!(metric.evaluate(&Example::new(), &Prediction::new(), None).score, 0.5);
    }
}
