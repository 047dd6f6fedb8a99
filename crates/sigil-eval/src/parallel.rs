// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Parallel evaluation using Rayon

use crate::evaluator::{EvaluationResult, ExampleResult};
use crate::metric::{Metric, MetricResult};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use sigil::{Error, Example, Prediction, Result};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Scoring pools by thread count, built once per process.
static POOLS: LazyLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = LazyLock::new(Default::default);

fn shared_pool(num_threads: usize) -> Result<Arc<ThreadPool>> {
    let mut pools = POOLS.lock();
    if let Some(pool) = pools.get(&num_threads) {
        return Ok(pool.clone());
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("sigil-score-{i}"))
        .build()
        .map_err(|e| Error::Other(format!("failed to build scoring pool: {e}")))?;
    let pool = Arc::new(pool);
    pools.insert(num_threads, pool.clone());
    tracing::debug!(num_threads, "scoring pool created");
    Ok(pool)
}

/// Parallel evaluator using Rayon for CPU-bound scoring
pub struct ParallelEvaluator {
    metric: Arc<dyn Metric>,
    num_threads: Option<usize>,
}

impl ParallelEvaluator {
    /// Create a new parallel evaluator
    pub fn new(metric: Arc<dyn Metric>) -> Self {
        Self {
            metric,
            num_threads: None,
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads.max(1));
        self
    }

    /// Score each pair, preserving order.
    pub fn score(&self, pairs: &[(&Example, &Prediction)]) -> Result<Vec<MetricResult>> {
        let run = || -> Vec<MetricResult> {
            pairs
                .par_iter()
                .map(|(example, prediction)| self.metric.evaluate(example, prediction, None))
                .collect()
        };
        match self.num_threads {
            Some(threads) => Ok(shared_pool(threads)?.install(run)),
            None => Ok(run()),
        }
    }

    /// Evaluate predictions in parallel (predictions already computed)
    pub fn evaluate_predictions(
        &self,
        examples: &[Example],
        predictions: &[Prediction],
    ) -> Result<EvaluationResult> {
        if examples.len() != predictions.len() {
            return Err(Error::Other(format!(
                "{} examples but {} predictions",
                examples.len(),
                predictions.len()
            )));
        }

        let pairs: Vec<(&Example, &Prediction)> = examples.iter().zip(predictions).collect();
        let scores = self.score(&pairs)?;
        let results = examples
            .iter()
            .zip(predictions)
            .zip(scores)
            .map(|((example, prediction), result)| ExampleResult {
                example: example.clone(),
                prediction: Some(prediction.clone()),
                result,
            })
            .collect();
        Ok(EvaluationResult::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::ExactMatch;

    #[test]
    fn test_parallel_evaluation() {
        let examples: Vec<Example> = (0..10)
            .map(|i| Example::new().with("answer", i.to_string()))
            .collect();

        let predictions: Vec<Prediction> = (0..10)
            .map(|i| Prediction::new().with("answer", if i < 7 { i.to_string() } else { "x".into() }))
            .collect();

        let evaluator = ParallelEvaluator::new(Arc::new(ExactMatch::new("answer"))).with_threads(4);
        let result = evaluator
            .evaluate_predictions(&examples, &predictions)
            .unwrap();

        assert_eq!(result.passed, 7);
        assert_eq!(result.total, 10);
        assert!((result.score - 0.7).abs() < 1e-9);
        assert!(result.results[9].result.score == 0.0);
    }

    #[test]
    fn test_pool_reused_across_evaluators() {
        let first = shared_pool(3).unwrap();
        let second = shared_pool(3).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.current_num_threads(), 3);
        assert!(!Arc::ptr_eq(&first, &shared_pool(2).unwrap()));
    }

    #[test]
    fn test_length_mismatch() {
        let evaluator = ParallelEvaluator::new(Arc::new(ExactMatch::new("answer")));
        assert!(evaluator
            .evaluate_predictions(&[Example::new()], &[])
            .is_err());
    }
}
