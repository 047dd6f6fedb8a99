// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! End-to-end runs of the demo programs against scripted LMs

use sigil::{ChainOfThought, Example, Inputs, JSONAdapter, Module, Settings};
use sigil_client::{MockLM, ResponseFormat};
use sigil_demos::nps::{self, TOPICS};
use sigil_demos::tickets::{self, BusinessCriticalMatch};
use sigil_demos::{BusinessAnalysisPipeline, TicketRouter};
use sigil_eval::{Evaluate, ListExactMatch, Metric};
use sigil_optimize::{BootstrapFewShot, Optimizer};
use std::path::PathBuf;

fn data_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

/// Knows every ticket's team, but misses urgent tickets unless shown demos.
fn ticket_oracle() -> MockLM {
    let known: Vec<(String, String)> = tickets::trainset()
        .into_iter()
        .chain(tickets::testset())
        .map(|e| {
            (
                e.get_str("ticket_text").unwrap().to_string(),
                e.get_str("team").unwrap().to_string(),
            )
        })
        .collect();
    MockLM::new(move |req| {
        let last = req.messages.last().map(|m| m.content.to_string()).unwrap_or_default();
        let team = known
            .iter()
            .find(|(text, _)| last.contains(text.as_str()))
            .map_or("General", |(_, team)| team.as_str());
        let team = if team == "Urgent" && req.messages.len() == 2 {
            "Technical"
        } else {
            team
        };
        format!(
            "[[ ## reasoning ## ]]\nMatched the ticket to a team.\n\n[[ ## team ## ]]\n{team}\n\n[[ ## completed ## ]]"
        )
    })
}

#[tokio::test]
async fn test_ticket_router_bootstrap_beats_baseline() {
    let ctx = Settings::new(ticket_oracle());
    let baseline = TicketRouter::new().unwrap();

    let evaluate = Evaluate::new(tickets::testset(), tickets::exact_match()).with_num_threads(4);
    let before = evaluate.run(&ctx, &baseline).await.unwrap();
    assert!((before.score - 0.8).abs() < 1e-9);

    let optimized = BootstrapFewShot::new(tickets::exact_match())
        .with_max_bootstrapped_demos(5)
        .with_max_rounds(2)
        .compile(&ctx, &baseline, &tickets::trainset(), None)
        .await
        .unwrap();
    let demos = optimized.named_predictors()[0].1.demos().len();
    assert!(demos >= 1);
    assert!(baseline.named_predictors()[0].1.demos().is_empty());

    let after = evaluate.run(&ctx, &optimized).await.unwrap();
    assert!((after.score - 1.0).abs() < 1e-9);

    let critical = Evaluate::new(tickets::testset(), BusinessCriticalMatch)
        .run(&ctx, &baseline)
        .await
        .unwrap();
    assert_eq!(critical.passed, 8);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("optimized_ticket_router.json");
    optimized.save(&path).unwrap();
    let mut restored = TicketRouter::new().unwrap();
    restored.load(&path).unwrap();
    assert_eq!(restored.named_predictors()[0].1.demos().len(), demos);
}

#[tokio::test]
async fn test_business_pipeline_chains_stages() {
    let lm = MockLM::new(|req| {
        let system = req.messages[0].content.as_ref();
        if system.contains("`recommendations`") {
            let last = req.messages.last().unwrap().content.as_ref();
            assert!(last.contains("Zendesk"), "strategy stage must see the market analysis");
            "[[ ## reasoning ## ]]\nCombine both analyses.\n\n[[ ## recommendations ## ]]\n[\"Automate tier-1 queries\", \"Integrate with CRMs\", \"Premium SLA plan\"]\n\n[[ ## go_to_market ## ]]\nMid-market SaaS first.\n\n[[ ## success_metrics ## ]]\n- Resolution time\n- Net revenue retention\n\n[[ ## completed ## ]]".to_string()
        } else if system.contains("`market_size`") {
            "[[ ## reasoning ## ]]\nGrowth is strong.\n\n[[ ## market_size ## ]]\n$2B, growing 25% a year\n\n[[ ## competitors ## ]]\n[\"Zendesk\", \"Intercom\"]\n\n[[ ## revenue_opportunity ## ]]\n$40M ARR within five years\n\n[[ ## completed ## ]]".to_string()
        } else {
            "[[ ## reasoning ## ]]\nUsers are impatient.\n\n[[ ## pain_points ## ]]\n- Slow responses\n- Repetitive queries\n\n[[ ## customer_needs ## ]]\nspeed, automation\n\n[[ ## willingness_to_pay ## ]]\nHigh for quality support\n\n[[ ## completed ## ]]".to_string()
        }
    });
    let ctx = Settings::new(lm);

    let result = BusinessAnalysisPipeline::new()
        .unwrap()
        .analyze(
            &ctx,
            "AI-powered customer support tool",
            "Market growing at 25% annually, current size $2B",
            "Users want faster response times",
        )
        .await
        .unwrap();

    let market = result.nested("market_analysis").unwrap();
    let customers = result.nested("customer_analysis").unwrap();
    let strategy = result.nested("recommendations").unwrap();
    assert_eq!(market.get_list("competitors").unwrap(), ["Zendesk", "Intercom"]);
    assert_eq!(
        customers.get_list("pain_points").unwrap(),
        ["Slow responses", "Repetitive queries"]
    );
    assert_eq!(strategy.get_list("recommendations").unwrap().len(), 3);
    assert_eq!(ctx.history().len(), 3);
}

#[tokio::test]
async fn test_nps_tagger_with_json_adapter() {
    let records = nps::load_records(data_file("nps_comments.json")).unwrap();
    assert!(!records.is_empty());
    for topic in nps::collect_topics(&records) {
        assert!(TOPICS.contains(&topic.as_str()), "unknown topic {topic}");
    }

    let lm = MockLM::new(|req| {
        assert!(matches!(req.response_format, Some(ResponseFormat::JsonObject)));
        r#"{"reasoning": "Stock issues.", "answer": ["limited size or shade availability"]}"#
            .to_string()
    });
    let ctx = Settings::new(lm).with_adapter(JSONAdapter::default());
    let tagger = ChainOfThought::new(nps::topic_signature().unwrap()).unwrap();

    let pred = tagger
        .forward(&ctx, &Inputs::new().with("comment", nps::SAMPLE_COMMENT))
        .await
        .unwrap();
    assert_eq!(
        pred.get_list("answer").unwrap(),
        ["Limited Size or Shade Availability"]
    );

    let expected = nps::NpsRecord {
        comment: nps::SAMPLE_COMMENT.to_string(),
        topics: vec!["Limited Size or Shade Availability".to_string()],
    }
    .to_example();
    assert!(ListExactMatch::new("answer").evaluate(&expected, &pred, None).passed);
}

#[test]
fn test_question_files_load() {
    for name in ["trainset.jsonl", "valset.jsonl"] {
        let examples = Example::load_jsonl(data_file(name), ["question"]).unwrap();
        assert!(!examples.is_empty());
        for example in &examples {
            assert!(example.inputs().contains("question"));
            assert!(example.get_str("answer").is_some());
        }
    }
}
