// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Sales lead qualification

use async_trait::async_trait;
use sigil::modules::chain_of_thought::REASONING_FIELD;
use sigil::{
    ChainOfThought, Example, InputField, Inputs, Module, OutputField, Predict, Prediction, Result,
    Settings, Signature, SignatureBuilder,
};

/// Output fields shown when printing an analysis, with their labels
pub const REPORT_FIELDS: [(&str, &str); 8] = [
    ("company_tier", "Company Tier"),
    ("decision_maker_engaged", "Decision Maker"),
    ("budget_alignment", "Budget"),
    ("urgency_level", "Urgency"),
    ("deal_stage", "Deal Stage"),
    ("confidence_score", "Confidence"),
    ("next_best_action", "Next Action"),
    ("reasoning", "Reasoning"),
];

/// Enterprise conversation used to compare the baseline and optimized qualifiers
pub const COMPLEX_EMAIL: &str = r#"
Prospect: "I'm the VP of Engineering at a 2000-person public company.
We're replacing our legacy system and need migration support.
Our board meeting is in 3 weeks where we'll decide."

Sales: "We specialize in enterprise migrations. Our team can provide dedicated support."
Prospect: "Budget isn't finalized but we've allocated $250K for this project.
Need to see your security certifications and implementation plan first."
"#;

/// `QualifySalesLead`, with its own step-by-step `reasoning` output.
pub fn qualify_signature() -> Result<Signature> {
    SignatureBuilder::new("QualifySalesLead")
        .instructions("Analyze sales emails and predict deal success probability.")
        .input(InputField::create(
            "email_conversation",
            "Email exchange between sales and prospect",
        ))?
        .output(OutputField::create(
            "company_tier",
            "Startup, SMB, Mid-Market, Enterprise",
        ))?
        .output(OutputField::create(
            "decision_maker_engaged",
            "yes, no, or partially",
        ))?
        .output(OutputField::create(
            "budget_alignment",
            "below, within, or above our pricing",
        ))?
        .output(OutputField::create(
            "urgency_level",
            "low, medium, high, critical",
        ))?
        .output(OutputField::create(
            "deal_stage",
            "Discovery, Demo, Proposal, Negotiation, Closed-Won, Closed-Lost",
        ))?
        .output(OutputField::create(
            "confidence_score",
            "0-100% probability of closing",
        ))?
        .output(OutputField::create(
            "next_best_action",
            "Specific recommended sales action",
        ))?
        .output(OutputField::create(
            REASONING_FIELD,
            "Step-by-step analysis of all factors",
        ))?
        .build()
}

/// Chain-of-thought lead qualifier.
#[derive(Debug, Clone)]
pub struct SalesQualifier {
    qualify: ChainOfThought,
}

impl SalesQualifier {
    /// Qualifier that reasons factor by factor before the verdict
    pub fn new() -> Result<Self> {
        Ok(Self {
            qualify: ChainOfThought::new(qualify_signature()?)?,
        })
    }

    /// Analyze one conversation
    pub async fn qualify(&self, ctx: &Settings, email_conversation: &str) -> Result<Prediction> {
        self.forward(
            ctx,
            &Inputs::new().with("email_conversation", email_conversation),
        )
        .await
    }
}

#[async_trait]
impl Module for SalesQualifier {
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        self.qualify.forward(ctx, inputs).await
    }

    fn named_predictors(&self) -> Vec<(String, &Predict)> {
        vec![("qualify.predict".to_string(), self.qualify.predict())]
    }

    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
        vec![("qualify.predict".to_string(), self.qualify.predict_mut())]
    }

    fn name(&self) -> &str {
        "SalesQualifier"
    }
}

struct Lead<'a> {
    email: &'a str,
    tier: &'a str,
    decision_maker: &'a str,
    budget: &'a str,
    urgency: &'a str,
    stage: &'a str,
    confidence: &'a str,
    action: &'a str,
    reasoning: &'a str,
}

impl Lead<'_> {
    fn into_example(self) -> Example {
        Example::new()
            .with("email_conversation", self.email)
            .with("company_tier", self.tier)
            .with("decision_maker_engaged", self.decision_maker)
            .with("budget_alignment", self.budget)
            .with("urgency_level", self.urgency)
            .with("deal_stage", self.stage)
            .with("confidence_score", self.confidence)
            .with("next_best_action", self.action)
            .with("reasoning", self.reasoning)
            .with_inputs(["email_conversation"])
    }
}

/// Three labelled conversations: startup, mid-market and enterprise.
pub fn trainset() -> Vec<Example> {
    vec![
        Lead {
            email: r#"
Prospect: "We're a 50-person startup looking to scale. Can you send pricing?"
Sales: "Sure! Our growth plan is $299/month. Would you like a demo?"
Prospect: "That's higher than expected. We'll discuss internally."
"#,
            tier: "Startup",
            decision_maker: "partially",
            budget: "below",
            urgency: "low",
            stage: "Discovery",
            confidence: "25%",
            action: "Send case studies showing ROI for similar startups",
            reasoning: "Startup with budget concerns, no decision maker engaged, early stage discussion",
        }
        .into_example(),
        Lead {
            email: r#"
Prospect: "I'm the CTO at 500-employee company. We need this implemented before Q4."
Sales: "Understood. Our enterprise plan starts at $5K/month. Available for technical deep dive?"
Prospect: "Yes, bring your solutions architect. We have budget approved."
"#,
            tier: "Mid-Market",
            decision_maker: "yes",
            budget: "within",
            urgency: "high",
            stage: "Demo",
            confidence: "75%",
            action: "Schedule technical deep dive with solutions architect",
            reasoning: "CTO engaged, budget approved, timeline urgency, mid-market company",
        }
        .into_example(),
        Lead {
            email: r#"
Prospect: "We're evaluating vendors for $500K annual contract. Send security docs."
Sales: "Here's our SOC2 compliance. When can we discuss your requirements?"
Prospect: "Our procurement team will review. We're deciding in 30 days."
"#,
            tier: "Enterprise",
            decision_maker: "partially",
            budget: "above",
            urgency: "medium",
            stage: "Proposal",
            confidence: "60%",
            action: "Engage procurement team directly with compliance documentation",
            reasoning: "Large contract, procurement process, security focus, longer sales cycle",
        }
        .into_example(),
    ]
}

/// `label: value` lines for every reported field, indented for the console.
pub fn render_analysis(prediction: &Prediction) -> String {
    REPORT_FIELDS
        .iter()
        .map(|(field, label)| {
            let value = prediction.get_str(field).unwrap_or_default();
            format!("   {label}: {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
