// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! COPRO - Coordinate Prompt Optimization
//!
//! Generates instruction variations using an LM and evaluates them
//! to find the best performing instruction for each predictor.
//!
//! ## Algorithm
//!
//! 1. Start with base instruction from signature
//! 2. Use LM to generate `breadth - 1` instruction variations
//! 3. Evaluate each variation on training set
//! 4. Show the LM the scored attempts and ask for better ones
//! 5. Repeat for `depth - 1` rounds, keep the best

use crate::optimizer::{evaluate_program, parse_numbered, Optimizer};
use async_trait::async_trait;
use serde::Serialize;
use sigil::{Error, Example, Inputs, Module, Predict, Result, Settings, Signature};
use sigil_eval::Metric;
use std::fmt::Write;
use std::sync::Arc;
use tracing::Instrument;

/// Score spread of the candidates evaluated at one depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CandidateStats {
    /// Best score
    pub max: f64,
    /// Worst score
    pub min: f64,
    /// Mean score
    pub avg: f64,
    /// Standard deviation
    pub std: f64,
}

impl CandidateStats {
    fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let n = scores.len() as f64;
        let avg = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;
        Self {
            max: scores.iter().copied().fold(f64::MIN, f64::max),
            min: scores.iter().copied().fold(f64::MAX, f64::min),
            avg,
            std: var.sqrt(),
        }
    }
}

/// Statistics recorded when `track_stats` is on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct COPROStats {
    /// Per predictor, stats of each depth's candidates
    pub results_all: Vec<(String, Vec<CandidateStats>)>,
    /// Per predictor, the best score after each depth
    pub results_best: Vec<(String, Vec<f64>)>,
    /// Number of program evaluations performed
    pub total_calls: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    instruction: String,
    score: f64,
}

/// COPRO - Coordinate Prompt Optimization.
///
/// Optimizes the instruction portion of every predictor's signature,
/// one predictor at a time, keeping the best instruction found for each.
#[derive(Clone)]
pub struct COPRO {
    metric: Arc<dyn Metric>,
    breadth: usize,
    depth: usize,
    init_temperature: f32,
    track_stats: bool,
    num_threads: usize,
    prompt_settings: Option<Settings>,
}

impl COPRO {
    /// Create a new COPRO optimizer.
    pub fn new(metric: impl Metric + 'static) -> Self {
        Self::from_arc(Arc::new(metric))
    }

    /// Create with a shared metric.
    pub fn from_arc(metric: Arc<dyn Metric>) -> Self {
        Self {
            metric,
            breadth: 10,
            depth: 3,
            init_temperature: 1.4,
            track_stats: false,
            num_threads: 1,
            prompt_settings: None,
        }
    }

    /// Candidates per round, including the original instruction.
    pub fn with_breadth(mut self, n: usize) -> Self {
        self.breadth = n;
        self
    }

    /// Number of proposal rounds.
    pub fn with_depth(mut self, n: usize) -> Self {
        self.depth = n.max(1);
        self
    }

    /// Sampling temperature for proposals.
    pub fn with_init_temperature(mut self, temperature: f32) -> Self {
        self.init_temperature = temperature;
        self
    }

    /// Record per-depth score statistics.
    pub fn with_track_stats(mut self, track: bool) -> Self {
        self.track_stats = track;
        self
    }

    /// Maximum concurrent forward passes during evaluation.
    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = n.max(1);
        self
    }

    /// Propose instructions with different settings, e.g. another LM.
    pub fn with_prompt_settings(mut self, settings: Settings) -> Self {
        self.prompt_settings = Some(settings);
        self
    }

    fn basic_proposer() -> Result<Predict> {
        let signature = Signature::parse(
            "basic_instruction, count: int -> proposed_instructions",
        )?
        .with_name("BasicGenerateInstruction")
        .with_instructions(
            "You are an instruction optimizer for large language models. I will give you a signature of fields (inputs and outputs) in English. Your task is to propose `count` alternative instructions that will lead a good language model to perform the task well. Don't be afraid to be creative. Write each instruction on its own line, numbered 1., 2., ...",
        );
        Ok(Predict::new(signature))
    }

    fn attempts_proposer() -> Result<Predict> {
        let signature = Signature::parse(
            "attempted_instructions, count: int -> proposed_instructions",
        )?
        .with_name("GenerateInstructionGivenAttempts")
        .with_instructions(
            "You are an instruction optimizer for large language models. I will give some task instructions I've tried, along with their corresponding validation scores. The instructions are arranged in increasing order based on their scores, where higher scores indicate better quality. Your task is to propose `count` new instructions that will lead a good language model to perform the task even better. Don't be afraid to be creative. Write each instruction on its own line, numbered 1., 2., ...",
        );
        Ok(Predict::new(signature))
    }

    async fn propose(
        &self,
        ctx: &Settings,
        proposer: &Predict,
        inputs: Inputs,
        rollout: u32,
    ) -> Vec<String> {
        let count = self.breadth.saturating_sub(1);
        let prompt_ctx = self
            .prompt_settings
            .clone()
            .unwrap_or_else(|| ctx.clone())
            .with_temperature(self.init_temperature)
            .with_rollout_id(rollout);
        let inputs = inputs.with("count", count as i64);
        match proposer.call(&prompt_ctx, &inputs).await {
            Ok(p) => parse_numbered(
                &p.get_str("proposed_instructions").unwrap_or_default(),
                count,
            ),
            Err(e) => {
                tracing::warn!(error = %e, "instruction proposal failed");
                Vec::new()
            }
        }
    }

    async fn score_candidates<M>(
        &self,
        ctx: &Settings,
        program: &mut M,
        slot: usize,
        instructions: Vec<String>,
        evaluated: &mut Vec<Candidate>,
        trainset: &[Example],
        calls: &mut usize,
    ) -> Result<Vec<f64>>
    where
        M: Module + Clone + 'static,
    {
        let mut scores = Vec::new();
        for instruction in instructions {
            if evaluated.iter().any(|c| c.instruction == instruction) {
                continue;
            }
            set_instruction(program, slot, &instruction);
            let score =
                evaluate_program(ctx, &*program, trainset, &self.metric, self.num_threads).await?;
            *calls += 1;
            tracing::debug!(slot, score, instruction = %instruction, "candidate scored");
            scores.push(score);
            evaluated.push(Candidate { instruction, score });
        }
        Ok(scores)
    }

    /// Optimize and return the program together with the statistics.
    pub async fn compile_with_stats<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
    ) -> Result<(M, COPROStats)>
    where
        M: Module + Clone + 'static,
    {
        if self.breadth <= 1 {
            return Err(Error::optimization("breadth must be greater than 1"));
        }

        let mut program = student.clone();
        let mut stats = COPROStats::default();
        let basic = Self::basic_proposer()?;
        let attempts = Self::attempts_proposer()?;

        let slots: Vec<(String, String)> = program
            .named_predictors()
            .into_iter()
            .map(|(name, p)| (name, p.signature().instructions.clone()))
            .collect();

        for (slot, (name, original)) in slots.into_iter().enumerate() {
            let mut evaluated: Vec<Candidate> = Vec::new();
            let mut depth_stats = Vec::new();
            let mut best_per_depth = Vec::new();

            let mut instructions = vec![original.clone()];
            instructions.extend(
                self.propose(
                    ctx,
                    &basic,
                    Inputs::new().with("basic_instruction", original.clone()),
                    slot as u32 * 1000,
                )
                .await,
            );

            for depth in 0..self.depth {
                let scores = self
                    .score_candidates(
                        ctx,
                        &mut program,
                        slot,
                        instructions,
                        &mut evaluated,
                        trainset,
                        &mut stats.total_calls,
                    )
                    .await?;
                depth_stats.push(CandidateStats::from_scores(&scores));
                let best = best_candidate(&evaluated).map(|c| c.score).unwrap_or(0.0);
                best_per_depth.push(best);
                tracing::info!(predictor = %name, depth, best, evaluated = evaluated.len(), "COPRO depth finished");

                if depth + 1 == self.depth {
                    break;
                }
                let history = render_attempts(&evaluated, self.breadth);
                instructions = self
                    .propose(
                        ctx,
                        &attempts,
                        Inputs::new().with("attempted_instructions", history),
                        slot as u32 * 1000 + depth as u32 + 1,
                    )
                    .await;
            }

            let best = best_candidate(&evaluated)
                .map(|c| c.instruction.clone())
                .unwrap_or(original);
            set_instruction(&mut program, slot, &best);

            if self.track_stats {
                stats.results_all.push((name.clone(), depth_stats));
                stats.results_best.push((name, best_per_depth));
            }
        }

        Ok((program, stats))
    }
}

/// Highest score wins; the earliest candidate wins ties.
fn best_candidate(evaluated: &[Candidate]) -> Option<&Candidate> {
    evaluated
        .iter()
        .fold(None, |best: Option<&Candidate>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })
}

fn render_attempts(evaluated: &[Candidate], limit: usize) -> String {
    let mut sorted: Vec<&Candidate> = evaluated.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted.truncate(limit);
    sorted.reverse();

    let mut out = String::new();
    for (i, c) in sorted.iter().enumerate() {
        let _ = writeln!(out, "Instruction #{}: {}", i + 1, c.instruction);
        let _ = writeln!(out, "Resulting Score #{}: {:.2}", i + 1, c.score * 100.0);
    }
    out
}

fn set_instruction<M: Module>(program: &mut M, slot: usize, instruction: &str) {
    if let Some((_, predictor)) = program.named_predictors_mut().into_iter().nth(slot) {
        predictor.set_instructions(instruction);
    }
}

#[async_trait]
impl Optimizer for COPRO {
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
        let span = tracing::info_span!(
            "copro",
            breadth = self.breadth,
            depth = self.depth,
            trainset = trainset.len()
        );
        let (program, stats) = self
            .compile_with_stats(ctx, student, trainset)
            .instrument(span)
            .await?;
        tracing::info!(total_calls = stats.total_calls, "COPRO finished");
        Ok(program)
    }

    fn name(&self) -> &'static str {
        "COPRO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(instruction: &str, score: f64) -> Candidate {
        Candidate {
            instruction: instruction.to_string(),
            score,
        }
    }

    #[test]
    fn test_best_candidate_prefers_first_on_tie() {
        let evaluated = vec![candidate("a", 0.5), candidate("b", 0.9), candidate("c", 0.9)];
        assert_eq!(best_candidate(&evaluated).unwrap().instruction, "b");
        assert!(best_candidate(&[]).is_none());
    }

    #[test]
    fn test_render_attempts_ascending() {
        let evaluated = vec![candidate("low", 0.1), candidate("high", 0.8), candidate("mid", 0.5)];
        let text = render_attempts(&evaluated, 2);
        assert!(text.starts_with("Instruction #1: mid"));
        assert!(text.contains("Resulting Score #2: 80.00"));
        assert!(!text.contains("low"));
    }

    #[test]
    fn test_candidate_stats() {
        let stats = CandidateStats::from_scores(&[0.0, 1.0]);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.avg, 0.5);
        assert_eq!(stats.std, 0.5);
    }
}
