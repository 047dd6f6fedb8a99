// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Integration tests for evaluation system

use sigil::{Example, Predict, Settings, TraceEntry};
use sigil_client::MockLM;
use sigil_eval::*;

fn devset() -> Vec<Example> {
    ["refund please", "server down", "pricing question", "invoice wrong"]
        .iter()
        .zip(["Billing", "Technical", "Sales", "Billing"])
        .map(|(ticket, team)| {
            Example::new()
                .with("ticket", *ticket)
                .with("team", team)
                .with_inputs(["ticket"])
        })
        .collect()
}

fn router_lm() -> MockLM {
    MockLM::new(|req| {
        let user = req.messages.last().unwrap().content.to_string();
        let team = if user.contains("refund") || user.contains("invoice") {
            "Billing"
        } else if user.contains("server") {
            "Technical"
        } else {
            "General"
        };
        format!("[[ ## team ## ]]\n{team}\n\n[[ ## completed ## ]]")
    })
}

#[tokio::test]
async fn test_evaluate_program() {
    let ctx = Settings::new(router_lm());
    let program = Predict::from_spec("ticket -> team").unwrap();

    let result = Evaluate::new(devset(), ExactMatch::new("team").ignore_case())
        .with_num_threads(3)
        .with_display_progress(true)
        .run(&ctx, &program)
        .await
        .unwrap();

    assert_eq!(result.total, 4);
    assert_eq!(result.passed, 3);
    assert_eq!(result.percentage(), 75.0);
    assert_eq!(result.results[2].example.get_str("ticket"), Some("pricing question"));
    assert!(!result.results[2].result.passed);
}

#[tokio::test]
async fn test_failed_forward_uses_failure_score() {
    let ctx = Settings::new(MockLM::constant("no markers and no json"));
    let program = Predict::from_spec("ticket -> team").unwrap();

    let result = Evaluate::new(devset(), ExactMatch::new("team"))
        .with_failure_score(0.25)
        .run(&ctx, &program)
        .await
        .unwrap();

    assert!(result.results.iter().all(|r| r.prediction.is_none()));
    assert!((result.score - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn test_too_many_errors_abort() {
    let ctx = Settings::new(MockLM::constant("unparseable"));
    let program = Predict::from_spec("ticket -> team").unwrap();

    let err = Evaluate::new(devset(), ExactMatch::new("team"))
        .with_max_errors(1)
        .run(&ctx, &program)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("aborted"));
}

#[tokio::test]
async fn test_closure_metric() {
    let ctx = Settings::new(router_lm());
    let program = Predict::from_spec("ticket -> team").unwrap();
    let billing_only = FnMetric::new(
        "billing_only",
        |example: &Example, prediction: &sigil::Prediction, _: Option<&[TraceEntry]>| {
            if example.get_str("team") != Some("Billing") {
                return MetricResult::pass().with_details("not scored");
            }
            (prediction.get_str("team").as_deref() == Some("Billing")).into()
        },
    );

    let result = Evaluate::new(devset(), billing_only)
        .run(&ctx, &program)
        .await
        .unwrap();
    assert_eq!(result.passed, 4);
    assert_eq!(result.results[1].result.details.as_deref(), Some("not scored"));
}
