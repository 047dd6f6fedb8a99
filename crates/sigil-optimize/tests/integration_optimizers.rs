// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Optimizer runs against a scripted LM

use sigil::{ChainOfThought, Example, Module, Predict, Settings};
use sigil_client::{LMRequest, MockLM};
use sigil_eval::{ExactMatch, FnMetric, MetricResult};
use sigil_optimize::*;

fn tickets() -> Vec<Example> {
    [
        ("refund for order", "Billing"),
        ("app crashes on login", "Technical"),
        ("invoice is wrong", "Billing"),
        ("cannot reset password", "Technical"),
    ]
    .iter()
    .map(|(text, team)| {
        Example::new()
            .with("ticket", *text)
            .with("team", *team)
            .with_inputs(["ticket"])
    })
    .collect()
}

fn route(req: &LMRequest<'_>) -> &'static str {
    let user = req.messages.last().map(|m| m.content.to_string()).unwrap_or_default();
    if user.contains("refund") || user.contains("invoice") {
        "Billing"
    } else {
        "Technical"
    }
}

/// Answers correctly only when the system prompt carries `magic`.
fn scripted(magic: &'static str, proposal: &'static str) -> MockLM {
    MockLM::new(move |req| {
        let system = req.messages[0].content.to_string();
        if system.contains("`proposed_instructions`") {
            return format!("[[ ## proposed_instructions ## ]]\n1. Be vague.\n2. {proposal}");
        }
        if system.contains("`proposed_instruction`") {
            return format!("[[ ## proposed_instruction ## ]]\n{proposal}");
        }
        let team = if system.contains(magic) { route(req) } else { "General" };
        if system.contains("`reasoning`") {
            format!("[[ ## reasoning ## ]]\nRouting.\n\n[[ ## team ## ]]\n{team}")
        } else {
            format!("[[ ## team ## ]]\n{team}")
        }
    })
}

#[tokio::test]
async fn test_copro_picks_best_instruction() {
    let ctx = Settings::new(scripted("Route by keyword", "Route by keyword."));
    let student = Predict::from_spec("ticket -> team").unwrap();

    let copro = COPRO::new(ExactMatch::new("team"))
        .with_breadth(3)
        .with_depth(2)
        .with_track_stats(true);
    let (compiled, stats) = copro
        .compile_with_stats(&ctx, &student, &tickets())
        .await
        .unwrap();

    assert_eq!(compiled.signature().instructions, "Route by keyword.");
    assert_ne!(student.signature().instructions, "Route by keyword.");
    assert_eq!(stats.results_best.len(), 1);
    assert_eq!(stats.results_best[0].1.last().copied(), Some(1.0));
    // original + two proposals at depth 0; depth 1 only repeats them
    assert_eq!(stats.total_calls, 3);
}

#[tokio::test]
async fn test_copro_constant_metric_keeps_original() {
    let ctx = Settings::new(scripted("never", "Something new."));
    let student = ChainOfThought::from_spec("ticket -> team").unwrap();
    let original = student.predict().signature().instructions.clone();

    let constant = FnMetric::new("constant", |_: &Example, _: &sigil::Prediction, _: Option<&[sigil::TraceEntry]>| {
        MetricResult::pass()
    });
    let compiled = COPRO::new(constant)
        .with_breadth(3)
        .with_depth(2)
        .compile(&ctx, &student, &tickets(), None)
        .await
        .unwrap();

    assert_eq!(compiled.predict().signature().instructions, original);
}

#[tokio::test]
async fn test_copro_rejects_breadth_one() {
    let ctx = Settings::new(scripted("x", "y"));
    let student = Predict::from_spec("ticket -> team").unwrap();
    let err = COPRO::new(ExactMatch::new("team"))
        .with_breadth(1)
        .compile(&ctx, &student, &tickets(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, sigil::Error::Optimization(_)));
}

#[tokio::test]
async fn test_mipro_finds_instruction() {
    let ctx = Settings::new(scripted("uppercase", "Answer in uppercase."));
    let student = Predict::from_spec("ticket -> team").unwrap();
    let data = tickets();

    let mipro = MIPROv2::new(ExactMatch::new("team"))
        .with_num_candidates(3)
        .with_num_trials(12)
        .with_max_bootstrapped_demos(1)
        .with_max_labeled_demos(1)
        .with_minibatch(false);
    let (compiled, report) = mipro
        .compile_with_report(&ctx, &student, &data[..2], Some(&data))
        .await
        .unwrap();

    assert_eq!(report.instruction_candidates[0].len(), 2);
    assert_eq!(report.demo_candidate_sets, 3);
    assert_eq!(report.trials[0].score, 0.0);
    assert_eq!(report.best_score, 1.0);
    assert_eq!(compiled.signature().instructions, "Answer in uppercase.");
    assert!(compiled.demos().len() <= 2);
}

#[tokio::test]
async fn test_mipro_splits_trainset_without_valset() {
    let ctx = Settings::new(scripted("uppercase", "Answer in uppercase."));
    let student = ChainOfThought::from_spec("ticket -> team").unwrap();

    let (_, report) = MIPROv2::new(ExactMatch::new("team"))
        .with_num_candidates(2)
        .with_num_trials(2)
        .with_max_bootstrapped_demos(0)
        .with_max_labeled_demos(0)
        .compile_with_report(&ctx, &student, &tickets(), None)
        .await
        .unwrap();

    assert_eq!(report.demo_candidate_sets, 1);
    assert_eq!(report.trials.len(), 3);
    assert!(report.trials.iter().all(|t| t.full_eval));
    assert_eq!(student.named_predictors().len(), 1);
}

/// Drives any optimizer through the trait on a spawned task, so the
/// compile future has to be `Send`.
async fn compile_on_task<O, M>(
    optimizer: O,
    ctx: Settings,
    student: M,
    trainset: Vec<Example>,
    valset: Option<Vec<Example>>,
) -> sigil::Result<M>
where
    O: Optimizer + 'static,
    M: Module + Clone + 'static,
{
    tokio::spawn(async move {
        optimizer
            .compile(&ctx, &student, &trainset, valset.as_deref())
            .await
    })
    .await
    .expect("compile task panicked")
}

#[tokio::test]
async fn test_optimizers_compile_through_trait_on_spawned_task() {
    let ctx = Settings::new(scripted("Route by keyword", "Route by keyword."));
    let student = Predict::from_spec("ticket -> team").unwrap();

    let copro = COPRO::new(ExactMatch::new("team")).with_breadth(3).with_depth(1);
    assert_eq!(copro.name(), "COPRO");
    let compiled = compile_on_task(copro, ctx.clone(), student.clone(), tickets(), None)
        .await
        .unwrap();
    assert_eq!(compiled.signature().instructions, "Route by keyword.");

    let mipro = MIPROv2::new(ExactMatch::new("team"))
        .with_num_candidates(2)
        .with_num_trials(16)
        .with_max_bootstrapped_demos(0)
        .with_max_labeled_demos(0);
    let compiled = compile_on_task(mipro, ctx, student, tickets(), Some(tickets()))
        .await
        .unwrap();
    assert_eq!(compiled.signature().instructions, "Route by keyword.");
}

fn many_tickets(n: usize) -> Vec<Example> {
    (0..n)
        .map(|i| {
            let (text, team) = if i % 2 == 0 {
                (format!("refund for order {i}"), "Billing")
            } else {
                (format!("app crashes on screen {i}"), "Technical")
            };
            Example::new()
                .with("ticket", text)
                .with("team", team)
                .with_inputs(["ticket"])
        })
        .collect()
}

#[tokio::test]
async fn test_mipro_minibatch_promotes_candidates_to_full_eval() {
    let proposals = std::sync::atomic::AtomicUsize::new(0);
    let lm = MockLM::new(move |req| {
        let system = req.messages[0].content.to_string();
        if system.contains("`proposed_instruction`") {
            let n = proposals.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            return format!("[[ ## proposed_instruction ## ]]\nAnswer in uppercase, variant {n}.");
        }
        let team = if system.contains("uppercase") { route(req) } else { "General" };
        format!("[[ ## team ## ]]\n{team}")
    });
    let ctx = Settings::new(lm);
    let student = Predict::from_spec("ticket -> team").unwrap();
    let valset = many_tickets(10);

    let (compiled, report) = MIPROv2::new(ExactMatch::new("team"))
        .with_num_candidates(4)
        .with_num_trials(12)
        .with_max_bootstrapped_demos(0)
        .with_max_labeled_demos(0)
        .with_minibatch_size(3)
        .with_minibatch_full_eval_steps(2)
        .compile_with_report(&ctx, &student, &tickets(), Some(valset.as_slice()))
        .await
        .unwrap();

    assert_eq!(report.instruction_candidates[0].len(), 4);
    assert!(report.trials[0].full_eval);
    assert_eq!(report.trials[0].score, 0.0);

    let minibatch: Vec<_> = report.trials.iter().filter(|t| !t.full_eval).collect();
    assert_eq!(minibatch.len(), 12);

    let promoted: Vec<_> = report.trials[1..].iter().filter(|t| t.full_eval).collect();
    assert!(!promoted.is_empty() && promoted.len() <= 3);
    for record in &promoted {
        assert_eq!(record.trial % 2, 0, "full eval off schedule at trial {}", record.trial);
        assert_ne!(record.choices[0], 0);
        assert_eq!(record.score, 1.0);
    }
    let mut distinct: Vec<_> = promoted.iter().map(|t| t.choices.clone()).collect();
    distinct.dedup();
    assert_eq!(distinct.len(), promoted.len());

    assert_eq!(report.best_score, 1.0);
    assert!(compiled.signature().instructions.contains("uppercase"));
}
