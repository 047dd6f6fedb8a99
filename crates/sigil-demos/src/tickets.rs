// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Support ticket routing
//!
//! A one-stage chain-of-thought router, the labelled tickets it is trained
//! and tested on, and the metrics used to compare a zero-shot router with a
//! bootstrapped one.

use async_trait::async_trait;
use sigil::{
    ChainOfThought, Example, InputField, Inputs, Module, OutputField, Predict, Prediction, Result,
    Settings, SignatureBuilder, TraceEntry,
};
use sigil_eval::{ExactMatch, Metric, MetricResult};

/// Routing teams
pub const TEAMS: [&str; 5] = ["Billing", "Technical", "Sales", "Urgent", "General"];

const TRAIN: [(&str, &str); 20] = [
    ("I was double charged this month, need refund", "Billing"),
    ("API giving 500 errors since morning", "Technical"),
    ("Website completely down, customers complaining", "Urgent"),
    ("Want to upgrade to enterprise plan", "Sales"),
    ("Where to download invoice?", "Billing"),
    ("Database connection timeout errors", "Technical"),
    ("Payment failed but money deducted", "Billing"),
    ("Can't login, password reset not working", "Urgent"),
    ("Need pricing for 100 users", "Sales"),
    ("How to export user data?", "General"),
    ("Subscription cancelled but still charged", "Billing"),
    ("Mobile app crashing on iOS", "Technical"),
    ("Server not responding, complete outage", "Urgent"),
    ("Interested in API partnership", "Sales"),
    ("Where is my order confirmation?", "General"),
    ("Tax ID missing from invoice", "Billing"),
    ("Slow response times from API", "Technical"),
    ("Security breach suspected", "Urgent"),
    ("Volume discount for startup?", "Sales"),
    ("How to change company address?", "General"),
];

const TEST: [(&str, &str); 10] = [
    ("Credit card declined but it should work", "Billing"),
    ("SSL certificate expired error", "Technical"),
    ("All services down across regions", "Urgent"),
    ("Want to discuss custom solution", "Sales"),
    ("Where to find documentation?", "General"),
    ("Invoice amount doesn't match agreement", "Billing"),
    ("Database backup failing", "Technical"),
    ("Unauthorized charges on my account", "Billing"),
    ("Can't process any payments", "Urgent"),
    ("Feature comparison between plans", "Sales"),
];

fn ticket(text: &str, team: &str) -> Example {
    Example::new()
        .with("ticket_text", text)
        .with("team", team)
        .with_inputs(["ticket_text"])
}

/// The 20 training tickets
pub fn trainset() -> Vec<Example> {
    TRAIN.iter().map(|(text, team)| ticket(text, team)).collect()
}

/// The 10 held-out tickets
pub fn testset() -> Vec<Example> {
    TEST.iter().map(|(text, team)| ticket(text, team)).collect()
}

/// Chain-of-thought ticket router.
#[derive(Debug, Clone)]
pub struct TicketRouter {
    router: ChainOfThought,
}

impl TicketRouter {
    /// Router with the `RouteTicket` signature and no demos
    pub fn new() -> Result<Self> {
        let signature = SignatureBuilder::new("RouteTicket")
            .instructions("Route support tickets to appropriate teams.")
            .input(InputField::create(
                "ticket_text",
                "Customer support ticket content",
            ))?
            .output(OutputField::create(
                "team",
                format!("One of: {}", TEAMS.join(", ")),
            ))?
            .build()?;
        Ok(Self {
            router: ChainOfThought::new(signature)?,
        })
    }

    /// Route one ticket
    pub async fn route(&self, ctx: &Settings, ticket_text: &str) -> Result<Prediction> {
        self.forward(ctx, &Inputs::new().with("ticket_text", ticket_text))
            .await
    }
}

#[async_trait]
impl Module for TicketRouter {
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        self.router.forward(ctx, inputs).await
    }

    fn named_predictors(&self) -> Vec<(String, &Predict)> {
        vec![("router.predict".to_string(), self.router.predict())]
    }

    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
        vec![("router.predict".to_string(), self.router.predict_mut())]
    }

    fn name(&self) -> &str {
        "TicketRouter"
    }
}

fn predicted_team(prediction: &Prediction) -> String {
    prediction
        .get_str("team")
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn expected_team(example: &Example) -> &str {
    example.get_str("team").unwrap_or_default()
}

/// Case-insensitive match on `team`
pub fn exact_match() -> ExactMatch {
    ExactMatch::new("team").ignore_case()
}

/// Like exact match, but an urgent ticket only counts when routed to
/// `Urgent` with that exact spelling.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusinessCriticalMatch;

impl Metric for BusinessCriticalMatch {
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        _trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        let expected = expected_team(example);
        let predicted = predicted_team(prediction);
        let matched = if expected == "Urgent" {
            predicted == "Urgent"
        } else {
            expected.eq_ignore_ascii_case(&predicted)
        };
        matched.into()
    }

    fn name(&self) -> &str {
        "business_critical_match"
    }
}

/// Records the team name on a correct route and `wrong` otherwise, for
/// per-team breakdowns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamWiseAccuracy;

impl Metric for TeamWiseAccuracy {
    fn evaluate(
        &self,
        example: &Example,
        prediction: &Prediction,
        _trace: Option<&[TraceEntry]>,
    ) -> MetricResult {
        let expected = expected_team(example);
        if expected.eq_ignore_ascii_case(&predicted_team(prediction)) {
            MetricResult::pass().with_details(expected)
        } else {
            MetricResult::fail().with_details("wrong")
        }
    }

    fn name(&self) -> &str {
        "team_wise_accuracy"
    }
}

/// Count of `team_wise_accuracy` labels, in [`TEAMS`] order with `wrong` last.
pub fn team_breakdown<'a>(details: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = TEAMS
        .iter()
        .chain(std::iter::once(&"wrong"))
        .map(|t| (t.to_string(), 0))
        .collect();
    for label in details {
        if let Some(slot) = counts.iter_mut().find(|(t, _)| t == label) {
            slot.1 += 1;
        }
    }
    counts
}
