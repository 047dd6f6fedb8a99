// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! BootstrapFewShot optimizer implementation
//!
//! Runs a teacher copy of the program on training examples under a trace.
//! When the metric accepts the final prediction, every traced predictor call
//! becomes a demo of the corresponding predictor in the student.

use crate::optimizer::{Optimizer, Rng};
use async_trait::async_trait;
use sigil::{Error, Example, Module, Result, Settings, Trace};
use sigil_eval::Metric;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// BootstrapFewShot optimizer.
///
/// Bootstraps demonstrations by running the module on training examples
/// and selecting successful traces as demonstrations. Examples that were
/// not bootstrapped fill the remaining slots as labeled demos.
#[derive(Clone)]
pub struct BootstrapFewShot {
    metric: Arc<dyn Metric>,
    metric_threshold: Option<f64>,
    max_bootstrapped_demos: usize,
    max_labeled_demos: usize,
    max_rounds: usize,
    max_errors: usize,
    seed: u64,
    teacher_settings: Option<Settings>,
}

impl BootstrapFewShot {
    /// Create a new BootstrapFewShot optimizer.
    pub fn new(metric: impl Metric + 'static) -> Self {
        Self::from_arc(Arc::new(metric))
    }

    /// Create with a shared metric.
    pub fn from_arc(metric: Arc<dyn Metric>) -> Self {
        Self {
            metric,
            metric_threshold: None,
            max_bootstrapped_demos: 4,
            max_labeled_demos: 16,
            max_rounds: 1,
            max_errors: 10,
            seed: 0,
            teacher_settings: None,
        }
    }

    /// Accept a trace only when the metric score reaches `threshold`.
    pub fn with_metric_threshold(mut self, threshold: f64) -> Self {
        self.metric_threshold = Some(threshold);
        self
    }

    /// Set maximum number of bootstrapped demonstrations.
    pub fn with_max_bootstrapped_demos(mut self, n: usize) -> Self {
        self.max_bootstrapped_demos = n;
        self
    }

    /// Set maximum number of demonstrations including labeled ones.
    pub fn with_max_labeled_demos(mut self, n: usize) -> Self {
        self.max_labeled_demos = n;
        self
    }

    /// Attempts per training example.
    pub fn with_max_rounds(mut self, n: usize) -> Self {
        self.max_rounds = n.max(1);
        self
    }

    /// Abort once more than `n` teacher runs fail.
    pub fn with_max_errors(mut self, n: usize) -> Self {
        self.max_errors = n;
        self
    }

    /// Seed for sampling labeled demos.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run the teacher with different settings, e.g. a stronger LM.
    pub fn with_teacher_settings(mut self, settings: Settings) -> Self {
        self.teacher_settings = Some(settings);
        self
    }

    fn accepts(&self, score: f64, passed: bool) -> bool {
        match self.metric_threshold {
            Some(threshold) => score >= threshold,
            None => passed,
        }
    }

    async fn bootstrap<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
    ) -> Result<M>
    where
        M: Module + Clone + 'static,
    {
        let names_by_id: HashMap<u64, String> = student
            .named_predictors()
            .into_iter()
            .map(|(name, p)| (p.id(), name))
            .collect();

        let mut teacher = student.clone();
        let mut rng = Rng::new(self.seed);
        if self.max_labeled_demos > 0 {
            for (_, predictor) in teacher.named_predictors_mut() {
                if predictor.demos().is_empty() {
                    predictor.set_demos(rng.sample(trainset, self.max_labeled_demos));
                }
            }
        }
        let teacher_ctx = self.teacher_settings.clone().unwrap_or_else(|| ctx.clone());

        let mut demos: HashMap<String, Vec<Example>> = HashMap::new();
        let mut bootstrapped: Vec<usize> = Vec::new();
        let mut errors = 0usize;

        for (idx, example) in trainset.iter().enumerate() {
            if bootstrapped.len() >= self.max_bootstrapped_demos {
                break;
            }

            // The teacher must not see the example it is being run on.
            let mut runner = teacher.clone();
            for (_, predictor) in runner.named_predictors_mut() {
                let kept: Vec<Example> = predictor
                    .demos()
                    .iter()
                    .filter(|d| *d != example)
                    .cloned()
                    .collect();
                predictor.set_demos(kept);
            }

            for round in 0..self.max_rounds {
                let trace = Trace::new();
                let mut round_ctx = teacher_ctx.clone().with_trace(trace.clone());
                if round > 0 {
                    round_ctx = round_ctx
                        .with_temperature(0.7 + 0.001 * round as f32)
                        .with_rollout_id(round as u32);
                }

                let prediction = match runner.forward(&round_ctx, &example.inputs()).await {
                    Ok(p) => p,
                    Err(e) => {
                        errors += 1;
                        tracing::warn!(example = idx, round, error = %e, "teacher run failed");
                        if errors > self.max_errors {
                            return Err(Error::optimization(format!(
                                "bootstrapping aborted after {errors} failed runs: {e}"
                            )));
                        }
                        continue;
                    }
                };

                let entries = trace.entries();
                let result = self.metric.evaluate(example, &prediction, Some(&entries));
                if !self.accepts(result.score, result.passed) {
                    tracing::debug!(example = idx, round, score = result.score, "trace rejected");
                    continue;
                }

                for entry in &entries {
                    if let Some(name) = names_by_id.get(&entry.predictor_id) {
                        demos
                            .entry(name.clone())
                            .or_default()
                            .push(Example::from_call(&entry.inputs, &entry.prediction));
                    }
                }
                bootstrapped.push(idx);
                tracing::debug!(example = idx, round, calls = entries.len(), "trace accepted");
                break;
            }
        }

        let unused: Vec<Example> = trainset
            .iter()
            .enumerate()
            .filter(|(idx, _)| !bootstrapped.contains(idx))
            .map(|(_, ex)| ex.clone())
            .collect();

        let mut program = student.clone();
        for (name, predictor) in program.named_predictors_mut() {
            let mut selected = demos.remove(&name).unwrap_or_default();
            selected.truncate(self.max_bootstrapped_demos);
            let labeled = self.max_labeled_demos.saturating_sub(selected.len());
            selected.extend(rng.sample(&unused, labeled));
            predictor.set_demos(selected);
        }

        tracing::info!(
            bootstrapped = bootstrapped.len(),
            examples = trainset.len(),
            errors,
            "bootstrapped full traces"
        );
        Ok(program)
    }
}

#[async_trait]
impl Optimizer for BootstrapFewShot {
    async fn compile<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
        _valset: Option<&[Example]>,
    ) -> Result<M>
    where
        M: Module + Clone + 'static,
    {
        let span = tracing::info_span!("bootstrap_few_shot", trainset = trainset.len());
        self.bootstrap(ctx, student, trainset).instrument(span).await
    }

    fn name(&self) -> &'static str {
        "BootstrapFewShot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil::Predict;
    use sigil_client::MockLM;
    use sigil_eval::ExactMatch;

    fn trainset() -> Vec<Example> {
        [("refund", "Billing"), ("crash", "Technical"), ("quote", "Sales")]
            .iter()
            .map(|(t, team)| {
                Example::new()
                    .with("ticket", *t)
                    .with("team", *team)
                    .with_inputs(["ticket"])
            })
            .collect()
    }

    fn billing_lm() -> MockLM {
        MockLM::constant("[[ ## team ## ]]\nBilling\n\n[[ ## completed ## ]]")
    }

    #[tokio::test]
    async fn test_successful_trace_becomes_demo() {
        let ctx = Settings::new(billing_lm());
        let student = Predict::from_spec("ticket -> team").unwrap();
        let optimizer = BootstrapFewShot::new(ExactMatch::new("team"))
            .with_max_bootstrapped_demos(2)
            .with_max_labeled_demos(0);

        let compiled = optimizer.compile(&ctx, &student, &trainset(), None).await.unwrap();

        assert!(student.demos().is_empty());
        assert_eq!(compiled.demos().len(), 1);
        assert_eq!(compiled.demos()[0].get_str("ticket"), Some("refund"));
        assert_eq!(compiled.demos()[0].input_keys(), ["ticket".to_string()]);
    }

    #[tokio::test]
    async fn test_labeled_demos_fill_remaining_slots() {
        let ctx = Settings::new(billing_lm());
        let student = Predict::from_spec("ticket -> team").unwrap();
        let optimizer = BootstrapFewShot::new(ExactMatch::new("team"))
            .with_max_bootstrapped_demos(1)
            .with_max_labeled_demos(3);

        let compiled = optimizer.compile(&ctx, &student, &trainset(), None).await.unwrap();

        assert_eq!(compiled.demos().len(), 3);
        let labeled_tickets: Vec<&str> = compiled.demos()[1..]
            .iter()
            .filter_map(|d| d.get_str("ticket"))
            .collect();
        assert!(!labeled_tickets.contains(&"refund"));
    }

    #[tokio::test]
    async fn test_later_rounds_raise_temperature() {
        let lm = MockLM::new(|req| {
            let team = if req.temperature.is_some() { "Technical" } else { "Billing" };
            format!("[[ ## team ## ]]\n{team}")
        });
        let ctx = Settings::new(lm);
        let student = Predict::from_spec("ticket -> team").unwrap();
        let crash_only = vec![trainset()[1].clone()];

        let one_round = BootstrapFewShot::new(ExactMatch::new("team"))
            .with_max_labeled_demos(0)
            .compile(&ctx, &student, &crash_only, None)
            .await
            .unwrap();
        assert!(one_round.demos().is_empty());

        let two_rounds = BootstrapFewShot::new(ExactMatch::new("team"))
            .with_max_labeled_demos(0)
            .with_max_rounds(2)
            .compile(&ctx, &student, &crash_only, None)
            .await
            .unwrap();
        assert_eq!(two_rounds.demos().len(), 1);
    }
}
