// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Three-stage business analysis
//!
//! Market and customer analyses run independently; the strategy stage takes
//! both predictions as structured inputs. The returned prediction nests each
//! stage's outputs under `market_analysis`, `customer_analysis` and
//! `recommendations`.

use async_trait::async_trait;
use sigil::{
    ChainOfThought, Error, FieldKind, InputField, Inputs, Module, OutputField, Predict,
    Prediction, Result, Settings, Signature, SignatureBuilder,
};

fn list() -> FieldKind {
    FieldKind::list(FieldKind::Str)
}

fn market_signature() -> Result<Signature> {
    SignatureBuilder::new("MarketAnalysis")
        .input(InputField::create("topic", "Business topic to analyze"))?
        .input(InputField::create("market_data", "Available market information"))?
        .output(OutputField::create(
            "market_size",
            "Market size and growth potential",
        ))?
        .output(
            OutputField::create("competitors", "Key competitors and differentiation")
                .with_kind(list()),
        )?
        .output(OutputField::create(
            "revenue_opportunity",
            "Revenue opportunity estimate",
        ))?
        .build()
}

fn customer_signature() -> Result<Signature> {
    SignatureBuilder::new("CustomerAnalysis")
        .input(InputField::create("topic", "Business topic to analyze"))?
        .input(InputField::create("customer_feedback", "Customer feedback data"))?
        .output(OutputField::create("pain_points", "Key customer pain points").with_kind(list()))?
        .output(
            OutputField::create("customer_needs", "Customer needs and preferences")
                .with_kind(list()),
        )?
        .output(OutputField::create(
            "willingness_to_pay",
            "Willingness to pay indicators",
        ))?
        .build()
}

fn strategy_signature() -> Result<Signature> {
    SignatureBuilder::new("StrategicRecommendations")
        .input(InputField::create("topic", "Business topic to analyze"))?
        .input(
            InputField::create("market_analysis", "Market analysis results")
                .with_kind(FieldKind::Json),
        )?
        .input(
            InputField::create("customer_analysis", "Customer analysis results")
                .with_kind(FieldKind::Json),
        )?
        .output(
            OutputField::create("recommendations", "Top 3 strategic recommendations")
                .with_kind(list()),
        )?
        .output(OutputField::create("go_to_market", "Go-to-market strategy"))?
        .output(OutputField::create("success_metrics", "Key success metrics").with_kind(list()))?
        .build()
}

/// Market, customer and strategy stages.
#[derive(Debug, Clone)]
pub struct BusinessAnalysisPipeline {
    analyze_market: ChainOfThought,
    analyze_customers: ChainOfThought,
    generate_strategy: ChainOfThought,
}

impl BusinessAnalysisPipeline {
    /// Build the three stages
    pub fn new() -> Result<Self> {
        Ok(Self {
            analyze_market: ChainOfThought::new(market_signature()?)?,
            analyze_customers: ChainOfThought::new(customer_signature()?)?,
            generate_strategy: ChainOfThought::new(strategy_signature()?)?,
        })
    }

    /// Analyze `topic`
    pub async fn analyze(
        &self,
        ctx: &Settings,
        topic: &str,
        market_data: &str,
        customer_feedback: &str,
    ) -> Result<Prediction> {
        let inputs = Inputs::new()
            .with("topic", topic)
            .with("market_data", market_data)
            .with("customer_feedback", customer_feedback);
        self.forward(ctx, &inputs).await
    }
}

fn required<'a>(inputs: &'a Inputs, key: &str) -> Result<&'a str> {
    inputs
        .get_str(key)
        .ok_or_else(|| Error::field(format!("BusinessAnalysisPipeline needs a `{key}` input")))
}

#[async_trait]
impl Module for BusinessAnalysisPipeline {
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        let topic = required(inputs, "topic")?;

        let market = self
            .analyze_market
            .forward(
                ctx,
                &Inputs::new()
                    .with("topic", topic)
                    .with("market_data", required(inputs, "market_data")?),
            )
            .await?;
        let customers = self
            .analyze_customers
            .forward(
                ctx,
                &Inputs::new()
                    .with("topic", topic)
                    .with("customer_feedback", required(inputs, "customer_feedback")?),
            )
            .await?;
        let strategy = self
            .generate_strategy
            .forward(
                ctx,
                &Inputs::new()
                    .with("topic", topic)
                    .with("market_analysis", market.to_value())
                    .with("customer_analysis", customers.to_value()),
            )
            .await?;

        let mut result = Prediction::new()
            .with("market_analysis", market.to_value())
            .with("customer_analysis", customers.to_value())
            .with("recommendations", strategy.to_value());
        for stage in [&market, &customers, &strategy] {
            result.add_usage(stage.usage);
        }
        Ok(result)
    }

    fn named_predictors(&self) -> Vec<(String, &Predict)> {
        vec![
            ("analyze_market.predict".to_string(), self.analyze_market.predict()),
            ("analyze_customers.predict".to_string(), self.analyze_customers.predict()),
            ("generate_strategy.predict".to_string(), self.generate_strategy.predict()),
        ]
    }

    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
        vec![
            ("analyze_market.predict".to_string(), self.analyze_market.predict_mut()),
            ("analyze_customers.predict".to_string(), self.analyze_customers.predict_mut()),
            ("generate_strategy.predict".to_string(), self.generate_strategy.predict_mut()),
        ]
    }

    fn name(&self) -> &str {
        "BusinessAnalysisPipeline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_signatures() {
        let pipeline = BusinessAnalysisPipeline::new().unwrap();
        let predictors = pipeline.named_predictors();
        assert_eq!(predictors.len(), 3);

        let strategy = predictors[2].1.signature();
        let inputs: Vec<&str> = strategy.input_names().collect();
        assert_eq!(inputs, ["topic", "market_analysis", "customer_analysis"]);
        assert_eq!(
            strategy.field("recommendations").unwrap().kind,
            FieldKind::list(FieldKind::Str)
        );
    }
}
