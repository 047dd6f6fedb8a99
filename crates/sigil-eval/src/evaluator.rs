// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Evaluator for running a program over a devset
//!
//! Forward passes run concurrently with at most `num_threads` in flight;
//! scoring happens afterwards on a [`ParallelEvaluator`].

use crate::metric::{Metric, MetricResult};
use crate::parallel::ParallelEvaluator;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use sigil::types::value_to_text;
use sigil::{Error, Example, Module, Prediction, Result, Settings};
use std::fmt::Write;
use std::sync::Arc;
use tracing::Instrument;

/// Outcome for one example
#[derive(Debug, Clone)]
pub struct ExampleResult {
    /// The evaluated example
    pub example: Example,
    /// The program output, `None` when the forward pass failed
    pub prediction: Option<Prediction>,
    /// Metric outcome
    pub result: MetricResult,
}

/// Evaluation results
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Mean score across all examples, in 0.0..=1.0
    pub score: f64,

    /// Individual results, in devset order
    pub results: Vec<ExampleResult>,

    /// Number of passed examples
    pub passed: usize,

    /// Total examples
    pub total: usize,
}

impl EvaluationResult {
    /// Aggregate per-example results
    pub fn from_results(results: Vec<ExampleResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.result.passed).count();
        let score = if total == 0 {
            0.0
        } else {
            results.iter().map(|r| r.result.score).sum::<f64>() / total as f64
        };
        Self {
            score,
            results,
            passed,
            total,
        }
    }

    /// Score as a percentage rounded to two decimals
    pub fn percentage(&self) -> f64 {
        (self.score * 10_000.0).round() / 100.0
    }

    /// Calculate accuracy (passed / total)
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }

    /// Plain-text table of the first `rows` results.
    pub fn render_table(&self, rows: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<4} | {:<40} | {:<24} | {:<24} | {:>5}",
            "#", "inputs", "expected", "predicted", "score"
        );
        let _ = writeln!(out, "{}", "-".repeat(109));
        for (i, row) in self.results.iter().take(rows).enumerate() {
            let inputs = row
                .example
                .inputs()
                .fields()
                .values()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join(" / ");
            let expected = row
                .example
                .labels()
                .values()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join(" / ");
            let predicted = match &row.prediction {
                Some(p) => row
                    .example
                    .labels()
                    .keys()
                    .filter_map(|k| p.get_str(k))
                    .collect::<Vec<_>>()
                    .join(" / "),
                None => "<error>".to_string(),
            };
            let _ = writeln!(
                out,
                "{:<4} | {:<40} | {:<24} | {:<24} | {:>5.2}",
                i + 1,
                clip(&inputs, 40),
                clip(&expected, 24),
                clip(&predicted, 24),
                row.result.score
            );
        }
        if self.results.len() > rows {
            let _ = writeln!(out, "... {} more rows not displayed", self.results.len() - rows);
        }
        out
    }
}

fn clip(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        flat
    } else {
        let mut cut: String = flat.chars().take(width.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

/// Runs a program over a devset and scores it.
///
/// ## Example
///
/// ```ignore
/// let evaluate = Evaluate::new(devset, ExactMatch::new("team"))
///     .with_num_threads(4)
///     .with_display_table(5);
/// let result = evaluate.run(&ctx, &program).await?;
/// println!("{:.2}%", result.percentage());
/// ```
pub struct Evaluate {
    devset: Vec<Example>,
    metric: Arc<dyn Metric>,
    num_threads: usize,
    display_progress: bool,
    display_table: usize,
    max_errors: usize,
    failure_score: f64,
}

impl Evaluate {
    /// Evaluate on `devset` with `metric`
    pub fn new(devset: Vec<Example>, metric: impl Metric + 'static) -> Self {
        Self::from_arc(devset, Arc::new(metric))
    }

    /// Evaluate with a shared metric
    pub fn from_arc(devset: Vec<Example>, metric: Arc<dyn Metric>) -> Self {
        Self {
            devset,
            metric,
            num_threads: 1,
            display_progress: false,
            display_table: 0,
            max_errors: 10,
            failure_score: 0.0,
        }
    }

    /// Maximum forward passes in flight
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    /// Log progress as examples complete
    pub fn with_display_progress(mut self, display: bool) -> Self {
        self.display_progress = display;
        self
    }

    /// Print a table of the first `rows` results
    pub fn with_display_table(mut self, rows: usize) -> Self {
        self.display_table = rows;
        self
    }

    /// Abort once more than this many forward passes fail
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Score assigned to a failed forward pass
    pub fn with_failure_score(mut self, score: f64) -> Self {
        self.failure_score = score;
        self
    }

    /// The devset
    pub fn devset(&self) -> &[Example] {
        &self.devset
    }

    /// Run `program` on every example and score the results.
    pub async fn run<M: Module + ?Sized>(
        &self,
        ctx: &Settings,
        program: &M,
    ) -> Result<EvaluationResult> {
        let span = tracing::info_span!(
            "evaluate",
            metric = self.metric.name(),
            total = self.devset.len()
        );
        self.run_inner(ctx, program).instrument(span).await
    }

    async fn run_inner<M: Module + ?Sized>(
        &self,
        ctx: &Settings,
        program: &M,
    ) -> Result<EvaluationResult> {
        let total = self.devset.len();
        // Collected first so every future owns its inputs.
        let forwards: Vec<BoxFuture<'_, Result<Prediction>>> = self
            .devset
            .iter()
            .map(|example| {
                let inputs = example.inputs();
                async move { program.forward(ctx, &inputs).await }.boxed()
            })
            .collect();
        let mut outputs = stream::iter(forwards).buffered(self.num_threads);

        let mut predictions: Vec<Option<Prediction>> = Vec::with_capacity(total);
        let mut errors = 0usize;
        while let Some(output) = outputs.next().await {
            match output {
                Ok(prediction) => predictions.push(Some(prediction)),
                Err(e) => {
                    errors += 1;
                    tracing::warn!(
                        example = predictions.len(),
                        category = e.category(),
                        error = %e,
                        "forward pass failed"
                    );
                    if errors > self.max_errors {
                        return Err(Error::Other(format!(
                            "evaluation aborted after {errors} failed examples: {e}"
                        )));
                    }
                    predictions.push(None);
                }
            }
            if self.display_progress {
                let done = predictions.len();
                if done == total || done % 10 == 0 {
                    tracing::info!(done, total, errors, "evaluation progress");
                }
            }
        }

        let pairs: Vec<(&Example, &Prediction)> = self
            .devset
            .iter()
            .zip(&predictions)
            .filter_map(|(example, prediction)| prediction.as_ref().map(|p| (example, p)))
            .collect();
        let mut scores = ParallelEvaluator::new(self.metric.clone())
            .with_threads(self.num_threads)
            .score(&pairs)?
            .into_iter();

        let results = self
            .devset
            .iter()
            .zip(predictions)
            .map(|(example, prediction)| {
                let result = match &prediction {
                    Some(_) => scores.next().unwrap_or_else(MetricResult::fail),
                    None => MetricResult::new(self.failure_score)
                        .with_details("forward pass failed"),
                };
                ExampleResult {
                    example: example.clone(),
                    prediction,
                    result,
                }
            })
            .collect();

        let result = EvaluationResult::from_results(results);
        tracing::info!(
            passed = result.passed,
            total = result.total,
            errors,
            "Average Metric: {:.2}%",
            result.percentage()
        );
        if self.display_table > 0 {
            println!("{}", result.render_table(self.display_table));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(score: f64) -> ExampleResult {
        ExampleResult {
            example: Example::new().with("q", "x").with("a", "y").with_inputs(["q"]),
            prediction: Some(Prediction::new().with("a", "y")),
            result: MetricResult::new(score),
        }
    }

    #[test]
    fn test_percentage_rounding() {
        let result = EvaluationResult::from_results(vec![row(1.0), row(0.0), row(0.0)]);
        assert_eq!(result.percentage(), 33.33);
        assert_eq!(result.passed, 1);
    }

    #[test]
    fn test_empty_result() {
        let result = EvaluationResult::from_results(Vec::new());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.accuracy(), 0.0);
    }

    #[test]
    fn test_render_table_limits_rows() {
        let result = EvaluationResult::from_results(vec![row(1.0), row(1.0), row(0.0)]);
        let table = result.render_table(2);
        assert!(table.contains("1.00"));
        assert!(table.contains("1 more rows not displayed"));
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("abcdef", 5), "ab...");
        assert_eq!(clip("ab\ncd", 10), "ab cd");
    }
}
