// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! MIPROv2 - Multi-Instruction Prompt Optimization
//!
//! Jointly optimizes both instructions and demonstrations using
//! a TPE-style Bayesian search.
//!
//! ## Algorithm
//!
//! 1. Build candidate demo sets per predictor (zero-shot, labeled-only,
//!    bootstrapped, bootstrapped on shuffled data)
//! 2. Propose instruction candidates per predictor with the LM
//! 3. Use TPE to sample promising (instruction, demo set) combinations
//! 4. Score on minibatches, periodically re-score the best on the full valset
//! 5. Return the best fully evaluated configuration

use crate::bootstrap::BootstrapFewShot;
use crate::optimizer::{evaluate_program, Optimizer, Rng};
use async_trait::async_trait;
use serde::Serialize;
use sigil::types::value_to_text;
use sigil::{Error, Example, Inputs, Module, Predict, Result, Settings, Signature};
use sigil_eval::Metric;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Instrument;

/// Prompting tips mixed into instruction proposals.
const TIPS: &[&str] = &[
    "",
    "Don't be afraid to be creative when creating the new instruction!",
    "Keep the instruction clear and concise.",
    "Make sure your instruction is very informative and descriptive.",
    "The instruction should include a high stakes scenario in which the LM must solve the task!",
    "Include a persona that is relevant to the task in the instruction (ie. \"You are a ...\")",
];

/// Number of training examples shown to the instruction proposer.
const PROPOSER_DEMOS: usize = 3;

/// Search budget preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AutoMode {
    /// 6 candidates, up to 100 validation examples
    Light,
    /// 12 candidates, up to 300 validation examples
    Medium,
    /// 18 candidates, up to 1000 validation examples
    Heavy,
}

impl AutoMode {
    /// Instruction and demo-set candidates per predictor.
    pub const fn num_candidates(self) -> usize {
        match self {
            Self::Light => 6,
            Self::Medium => 12,
            Self::Heavy => 18,
        }
    }

    /// Upper bound on the validation set size.
    pub const fn max_valset(self) -> usize {
        match self {
            Self::Light => 100,
            Self::Medium => 300,
            Self::Heavy => 1000,
        }
    }
}

impl FromStr for AutoMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "heavy" => Ok(Self::Heavy),
            other => Err(Error::optimization(format!(
                "unknown auto mode {other:?}, expected light, medium or heavy"
            ))),
        }
    }
}

/// One evaluated configuration.
#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    /// Trial number, 0 for the unoptimized program
    pub trial: usize,
    /// Instruction and demo-set index per predictor, interleaved
    pub choices: SmallVec<[usize; 8]>,
    /// Score on the evaluated set
    pub score: f64,
    /// Whether the score is on the full validation set
    pub full_eval: bool,
}

/// What a MIPROv2 run tried.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MIPROReport {
    /// Every evaluation, in order
    pub trials: Vec<TrialRecord>,
    /// Best full validation score
    pub best_score: f64,
    /// Instruction candidates per predictor, original first
    pub instruction_candidates: Vec<Vec<String>>,
    /// Number of demo sets per predictor
    pub demo_candidate_sets: usize,
}

/// TPE (Tree-structured Parzen Estimator) sampler over categorical parameters.
///
/// After `n_startup` random trials, history is split into the top `gamma`
/// fraction and the rest; each parameter is sampled proportionally to the
/// ratio of its smoothed frequency in the good and bad groups.
#[derive(Debug, Clone)]
pub struct TPESampler {
    history: Vec<(SmallVec<[usize; 8]>, f64)>,
    gamma: f64,
    n_startup: usize,
    rng: Rng,
}

impl TPESampler {
    /// Create new TPE sampler.
    pub fn new(gamma: f64, n_startup: usize, seed: u64) -> Self {
        Self {
            history: Vec::new(),
            gamma,
            n_startup,
            rng: Rng::new(seed),
        }
    }

    /// Record a trial.
    pub fn record(&mut self, choices: SmallVec<[usize; 8]>, score: f64) {
        self.history.push((choices, score));
    }

    /// Number of recorded trials.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Suggest one value per parameter; `cardinalities[i]` is the number of
    /// choices of parameter `i`.
    pub fn suggest(&mut self, cardinalities: &[usize]) -> SmallVec<[usize; 8]> {
        if self.history.len() < self.n_startup {
            return cardinalities
                .iter()
                .map(|&n| self.rng.next_usize(n.max(1)))
                .collect();
        }

        let mut order: Vec<usize> = (0..self.history.len()).collect();
        order.sort_by(|&a, &b| self.history[b].1.total_cmp(&self.history[a].1));
        let n_good = ((order.len() as f64 * self.gamma).ceil() as usize).clamp(1, order.len());
        let (good, bad) = order.split_at(n_good);

        let mut suggestion = SmallVec::new();
        for (param, &n) in cardinalities.iter().enumerate() {
            let n = n.max(1);
            let weights: Vec<f64> = (0..n)
                .map(|choice| {
                    let count = |group: &[usize]| {
                        group
                            .iter()
                            .filter(|&&t| self.history[t].0.get(param) == Some(&choice))
                            .count() as f64
                    };
                    let l = (count(good) + 1.0) / (good.len() + n) as f64;
                    let g = (count(bad) + 1.0) / (bad.len() + n) as f64;
                    l / g
                })
                .collect();
            suggestion.push(self.sample_weighted(&weights));
        }
        suggestion
    }

    fn sample_weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut threshold = self.rng.next_f64() * total;
        for (idx, &w) in weights.iter().enumerate() {
            if threshold < w {
                return idx;
            }
            threshold -= w;
        }
        weights.len().saturating_sub(1)
    }
}

/// MIPROv2 optimizer.
#[derive(Clone)]
pub struct MIPROv2 {
    metric: Arc<dyn Metric>,
    auto: Option<AutoMode>,
    num_candidates: usize,
    num_trials: Option<usize>,
    minibatch: bool,
    minibatch_size: usize,
    minibatch_full_eval_steps: usize,
    max_bootstrapped_demos: usize,
    max_labeled_demos: usize,
    metric_threshold: Option<f64>,
    seed: u64,
    num_threads: usize,
    init_temperature: f32,
    prompt_settings: Option<Settings>,
}

impl MIPROv2 {
    /// Create with the `light` preset.
    pub fn new(metric: impl Metric + 'static) -> Self {
        Self::from_arc(Arc::new(metric))
    }

    /// Create with a shared metric.
    pub fn from_arc(metric: Arc<dyn Metric>) -> Self {
        Self {
            metric,
            auto: Some(AutoMode::Light),
            num_candidates: AutoMode::Light.num_candidates(),
            num_trials: None,
            minibatch: true,
            minibatch_size: 35,
            minibatch_full_eval_steps: 5,
            max_bootstrapped_demos: 4,
            max_labeled_demos: 4,
            metric_threshold: None,
            seed: 9,
            num_threads: 1,
            init_temperature: 0.5,
            prompt_settings: None,
        }
    }

    /// Use a budget preset.
    pub fn with_auto(mut self, auto: AutoMode) -> Self {
        self.auto = Some(auto);
        self.num_candidates = auto.num_candidates();
        self
    }

    /// Set the candidate count explicitly, disabling the preset.
    pub fn with_num_candidates(mut self, n: usize) -> Self {
        self.auto = None;
        self.num_candidates = n.max(1);
        self
    }

    /// Override the number of search trials.
    pub fn with_num_trials(mut self, n: usize) -> Self {
        self.num_trials = Some(n);
        self
    }

    /// Toggle minibatch scoring.
    pub fn with_minibatch(mut self, minibatch: bool) -> Self {
        self.minibatch = minibatch;
        self
    }

    /// Examples per minibatch.
    pub fn with_minibatch_size(mut self, n: usize) -> Self {
        self.minibatch_size = n.max(1);
        self
    }

    /// Trials between full evaluations.
    pub fn with_minibatch_full_eval_steps(mut self, n: usize) -> Self {
        self.minibatch_full_eval_steps = n.max(1);
        self
    }

    /// Bootstrapped demos per candidate set.
    pub fn with_max_bootstrapped_demos(mut self, n: usize) -> Self {
        self.max_bootstrapped_demos = n;
        self
    }

    /// Labeled demos per candidate set.
    pub fn with_max_labeled_demos(mut self, n: usize) -> Self {
        self.max_labeled_demos = n;
        self
    }

    /// Score a bootstrapped trace must reach.
    pub fn with_metric_threshold(mut self, threshold: f64) -> Self {
        self.metric_threshold = Some(threshold);
        self
    }

    /// Random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Maximum concurrent forward passes during evaluation.
    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = n.max(1);
        self
    }

    /// Sampling temperature for instruction proposals.
    pub fn with_init_temperature(mut self, temperature: f32) -> Self {
        self.init_temperature = temperature;
        self
    }

    /// Propose instructions with different settings, e.g. another LM.
    pub fn with_prompt_settings(mut self, settings: Settings) -> Self {
        self.prompt_settings = Some(settings);
        self
    }

    fn zero_shot(&self) -> bool {
        self.max_bootstrapped_demos == 0 && self.max_labeled_demos == 0
    }

    /// Default trial budget for `num_predictors` predictors.
    pub fn default_num_trials(num_predictors: usize, num_candidates: usize, zero_shot: bool) -> usize {
        let num_vars = if zero_shot {
            num_predictors
        } else {
            num_predictors * 2
        } as f64;
        let n = num_candidates.max(1) as f64;
        (2.0 * num_vars * n.log2()).max(1.5 * n) as usize
    }

    async fn demo_candidates<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
        num_candidates: usize,
        rng: &mut Rng,
    ) -> Result<Vec<Vec<Vec<Example>>>>
    where
        M: Module + Clone + 'static,
    {
        let num_predictors = student.named_predictors().len();
        let mut sets: Vec<Vec<Vec<Example>>> = vec![Vec::new(); num_predictors];
        if self.zero_shot() {
            for per_predictor in &mut sets {
                per_predictor.push(Vec::new());
            }
            return Ok(sets);
        }

        for i in 0..num_candidates {
            let program_demos: Vec<Vec<Example>> = match i {
                0 => vec![Vec::new(); num_predictors],
                1 => vec![rng.sample(trainset, self.max_labeled_demos); num_predictors],
                _ => {
                    let mut data = trainset.to_vec();
                    let size = if i == 2 {
                        self.max_bootstrapped_demos
                    } else {
                        rng.shuffle(&mut data);
                        rng.range_inclusive(1, self.max_bootstrapped_demos.max(1))
                    };
                    let mut bootstrap = BootstrapFewShot::from_arc(self.metric.clone())
                        .with_max_bootstrapped_demos(size)
                        .with_max_labeled_demos(self.max_labeled_demos)
                        .with_max_errors(usize::MAX)
                        .with_seed(self.seed + i as u64);
                    if let Some(threshold) = self.metric_threshold {
                        bootstrap = bootstrap.with_metric_threshold(threshold);
                    }
                    let compiled = bootstrap.compile(ctx, student, &data, None).await?;
                    compiled
                        .named_predictors()
                        .into_iter()
                        .map(|(_, p)| p.demos().to_vec())
                        .collect()
                }
            };
            for (slot, demos) in program_demos.into_iter().enumerate() {
                sets[slot].push(demos);
            }
            tracing::debug!(set = i, "demo candidate set ready");
        }
        Ok(sets)
    }

    fn proposer() -> Result<Predict> {
        let signature = Signature::parse(
            "task_demos, program_description, current_instruction, tip -> proposed_instruction",
        )?
        .with_name("GenerateSingleModuleInstruction")
        .with_instructions(
            "Use the information below to learn about a task that we are trying to solve using calls to an LM, then generate a new instruction that will be used to prompt a Language Model to better solve the task.",
        );
        Ok(Predict::new(signature))
    }

    async fn instruction_candidates<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
        num_candidates: usize,
        rng: &mut Rng,
    ) -> Result<Vec<Vec<String>>>
    where
        M: Module + Clone + 'static,
    {
        let proposer = Self::proposer()?;
        let prompt_ctx = self
            .prompt_settings
            .clone()
            .unwrap_or_else(|| ctx.clone())
            .with_temperature(self.init_temperature);

        let mut candidates = Vec::new();
        for (slot, (name, predictor)) in student.named_predictors().into_iter().enumerate() {
            let original = predictor.signature().instructions.clone();
            let description = format!(
                "Predictor `{name}` maps `{}`.",
                predictor.signature().to_string_format()
            );
            let mut proposals = vec![original.clone()];

            for k in 1..num_candidates {
                let tip = TIPS[rng.next_usize(TIPS.len())];
                let demos = render_task_demos(&rng.sample(trainset, PROPOSER_DEMOS));
                let inputs = Inputs::new()
                    .with("task_demos", demos)
                    .with("program_description", description.clone())
                    .with("current_instruction", original.clone())
                    .with("tip", tip);
                let call_ctx = prompt_ctx
                    .clone()
                    .with_rollout_id((slot * 1000 + k) as u32);
                match proposer.call(&call_ctx, &inputs).await {
                    Ok(p) => {
                        let text = p.get_str("proposed_instruction").unwrap_or_default();
                        let text = text.trim();
                        if !text.is_empty() && !proposals.iter().any(|x| x == text) {
                            proposals.push(text.to_string());
                        }
                    }
                    Err(e) => tracing::warn!(predictor = %name, error = %e, "instruction proposal failed"),
                }
            }
            tracing::info!(predictor = %name, proposals = proposals.len(), "instruction candidates ready");
            candidates.push(proposals);
        }
        Ok(candidates)
    }

    /// Optimize and return the program together with what was tried.
    pub async fn compile_with_report<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
        valset: Option<&[Example]>,
    ) -> Result<(M, MIPROReport)>
    where
        M: Module + Clone + 'static,
    {
        let num_predictors = student.named_predictors().len();
        if num_predictors == 0 {
            return Err(Error::optimization("program has no predictors"));
        }
        let mut rng = Rng::new(self.seed);

        let (trainset, mut valset): (Vec<Example>, Vec<Example>) = match valset {
            Some(v) => (trainset.to_vec(), v.to_vec()),
            None => {
                if trainset.len() < 2 {
                    return Err(Error::optimization(
                        "need at least two training examples when no valset is given",
                    ));
                }
                let val_size = (trainset.len() * 4 / 5).clamp(1, 1000);
                let cutoff = trainset.len() - val_size;
                (trainset[..cutoff].to_vec(), trainset[cutoff..].to_vec())
            }
        };
        if trainset.is_empty() || valset.is_empty() {
            return Err(Error::optimization("trainset and valset must not be empty"));
        }
        if let Some(auto) = self.auto {
            if valset.len() > auto.max_valset() {
                valset = rng.sample(&valset, auto.max_valset());
            }
        }

        let num_candidates = self.num_candidates.max(1);
        let num_trials = self.num_trials.unwrap_or_else(|| {
            Self::default_num_trials(num_predictors, num_candidates, self.zero_shot())
        });
        tracing::info!(
            predictors = num_predictors,
            candidates = num_candidates,
            trials = num_trials,
            train = trainset.len(),
            val = valset.len(),
            "MIPROv2 starting"
        );

        let demos = self
            .demo_candidates(ctx, student, &trainset, num_candidates, &mut rng)
            .await?;
        let instructions = self
            .instruction_candidates(ctx, student, &trainset, num_candidates, &mut rng)
            .await?;

        let cardinalities: Vec<usize> = (0..num_predictors)
            .flat_map(|p| [instructions[p].len(), demos[p].len()])
            .collect();

        let mut report = MIPROReport {
            instruction_candidates: instructions.clone(),
            demo_candidate_sets: demos.first().map_or(0, Vec::len),
            ..Default::default()
        };

        let default_choices: SmallVec<[usize; 8]> = SmallVec::from_elem(0, cardinalities.len());
        let default_program = build_program(student, &default_choices, &instructions, &demos);
        let mut best_score =
            evaluate_program(ctx, &default_program, &valset, &self.metric, self.num_threads).await?;
        let mut best_choices = default_choices.clone();
        tracing::info!(score = best_score, "default program scored on full valset");
        report.trials.push(TrialRecord {
            trial: 0,
            choices: default_choices.clone(),
            score: best_score,
            full_eval: true,
        });

        let mut sampler = TPESampler::new(0.25, 10, self.seed);
        sampler.record(default_choices.clone(), best_score);

        let use_minibatch = self.minibatch && valset.len() > self.minibatch_size;
        let mut fully_evaluated: HashSet<SmallVec<[usize; 8]>> = HashSet::new();
        fully_evaluated.insert(default_choices);
        let mut minibatch_scores: HashMap<SmallVec<[usize; 8]>, Vec<f64>> = HashMap::new();

        for trial in 1..=num_trials {
            let choices = sampler.suggest(&cardinalities);
            let program = build_program(student, &choices, &instructions, &demos);

            if !use_minibatch {
                let score =
                    evaluate_program(ctx, &program, &valset, &self.metric, self.num_threads).await?;
                sampler.record(choices.clone(), score);
                tracing::debug!(trial, score, "trial scored");
                if score > best_score {
                    tracing::info!(trial, score, "new best program");
                    best_score = score;
                    best_choices = choices.clone();
                }
                report.trials.push(TrialRecord {
                    trial,
                    choices,
                    score,
                    full_eval: true,
                });
                continue;
            }

            let batch = rng.sample(&valset, self.minibatch_size);
            let score =
                evaluate_program(ctx, &program, &batch, &self.metric, self.num_threads).await?;
            sampler.record(choices.clone(), score);
            minibatch_scores.entry(choices.clone()).or_default().push(score);
            tracing::debug!(trial, score, "minibatch trial scored");
            report.trials.push(TrialRecord {
                trial,
                choices,
                score,
                full_eval: false,
            });

            if trial % self.minibatch_full_eval_steps == 0 || trial == num_trials {
                let Some(candidate) = best_unevaluated(&minibatch_scores, &fully_evaluated) else {
                    continue;
                };
                let program = build_program(student, &candidate, &instructions, &demos);
                let full =
                    evaluate_program(ctx, &program, &valset, &self.metric, self.num_threads).await?;
                fully_evaluated.insert(candidate.clone());
                tracing::info!(trial, score = full, "full evaluation");
                if full > best_score {
                    best_score = full;
                    best_choices = candidate.clone();
                }
                report.trials.push(TrialRecord {
                    trial,
                    choices: candidate,
                    score: full,
                    full_eval: true,
                });
            }
        }

        report.best_score = best_score;
        tracing::info!(best_score, "MIPROv2 finished");
        Ok((
            build_program(student, &best_choices, &instructions, &demos),
            report,
        ))
    }
}

/// Combination with the best mean minibatch score that has no full score yet.
fn best_unevaluated(
    minibatch_scores: &HashMap<SmallVec<[usize; 8]>, Vec<f64>>,
    fully_evaluated: &HashSet<SmallVec<[usize; 8]>>,
) -> Option<SmallVec<[usize; 8]>> {
    minibatch_scores
        .iter()
        .filter(|(choices, _)| !fully_evaluated.contains(*choices))
        .map(|(choices, scores)| {
            let mean = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
            (choices, mean)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(choices, _)| choices.clone())
}

fn build_program<M: Module + Clone>(
    student: &M,
    choices: &[usize],
    instructions: &[Vec<String>],
    demos: &[Vec<Vec<Example>>],
) -> M {
    let mut program = student.clone();
    for (slot, (_, predictor)) in program.named_predictors_mut().into_iter().enumerate() {
        let (ic, dc) = (choices[2 * slot], choices[2 * slot + 1]);
        if let Some(text) = instructions.get(slot).and_then(|c| c.get(ic)) {
            predictor.set_instructions(text.clone());
        }
        if let Some(set) = demos.get(slot).and_then(|c| c.get(dc)) {
            predictor.set_demos(set.clone());
        }
    }
    program
}

fn render_task_demos(examples: &[Example]) -> String {
    let mut out = String::new();
    for (i, ex) in examples.iter().enumerate() {
        let _ = writeln!(out, "Example {}:", i + 1);
        for (key, value) in ex.data() {
            let _ = writeln!(out, "{key}: {}", value_to_text(value));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[async_trait]
impl Optimizer for MIPROv2 {
    async fn compile<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
        valset: Option<&[Example]>,
    ) -> Result<M>
    where
        M: Module + Clone + 'static,
    {
        let span = tracing::info_span!("miprov2", auto = ?self.auto, seed = self.seed);
        let (program, _) = self
            .compile_with_report(ctx, student, trainset, valset)
            .instrument(span)
            .await?;
        Ok(program)
    }

    fn name(&self) -> &'static str {
        "MIPROv2"
    }
}
