// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Evaluation framework for sigil
//!
//! Programs are forwarded concurrently on the async runtime; metrics are
//! scored afterwards on a Rayon pool.

#![warn(missing_docs)]

pub mod evaluator;
pub mod metric;
pub mod parallel;

pub use evaluator::{Evaluate, EvaluationResult, ExampleResult};
pub use metric::{
    normalize_answer, AnswerExactMatch, ExactMatch, FnMetric, ListExactMatch, Metric,
    MetricResult,
};
pub use parallel::ParallelEvaluator;
