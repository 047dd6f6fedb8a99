// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Direct schema-constrained calls, without signatures or adapters

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sigil_client::{generate_structured, LMRequest, Message, LM};

/// Sentiment reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentClassifier {
    /// The classified text
    pub text: String,
    /// 0 to 10, higher is more positive
    pub sentiment: i64,
}

impl SentimentClassifier {
    /// Strict JSON schema for the reply
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" },
                "sentiment": { "type": "integer" }
            },
            "required": ["text", "sentiment"],
            "additionalProperties": false
        })
    }
}

/// Business analysis reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessAnalysis {
    /// Size, growth, competitors and revenue opportunity
    pub market_analysis: String,
    /// Pain points, needs and willingness to pay
    pub customer_analysis: String,
    /// Recommendations and go-to-market
    pub strategic_recommendations: String,
}

impl BusinessAnalysis {
    /// Strict JSON schema for the reply
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "market_analysis": { "type": "string" },
                "customer_analysis": { "type": "string" },
                "strategic_recommendations": { "type": "string" }
            },
            "required": ["market_analysis", "customer_analysis", "strategic_recommendations"],
            "additionalProperties": false
        })
    }
}

const SENTIMENT_SYSTEM: &str = "You are a sentiment classifier. the sentiment, the higher the more positive is an integer between 0 and 10.";

const BUSINESS_SYSTEM: &str = "You are a business analyst. Analyze the business opportunity and provide three key analyses:
1. Market Analysis: Size, growth potential, competitors, and revenue opportunity
2. Customer Analysis: Pain points, needs, and willingness to pay
3. Strategic Recommendations: Top recommendations with go-to-market strategy

Return the analysis in the specified structured format.";

/// Opportunity analyzed by the structured business demo
pub const BUSINESS_BRIEF: &str = "
Analyze this business opportunity:

TOPIC: AI-powered customer support tool

MARKET DATA:
- Market growing at 25% annually
- Current market size: $2B
- Main competitors: Zendesk, Intercom, Freshdesk
- Regulatory environment: Moderate

CUSTOMER FEEDBACK:
- Users want faster response times
- Hate answering repetitive queries
- Willing to pay premium for quality support
- Want better integration with existing tools

Provide comprehensive analysis in the three required sections.
";

/// Classify `text` in one call.
pub async fn classify_sentiment<L: LM + ?Sized>(
    lm: &L,
    text: &str,
) -> anyhow::Result<SentimentClassifier> {
    let request = LMRequest::from_messages(vec![
        Message::system(SENTIMENT_SYSTEM),
        Message::user(text),
    ]);
    generate_structured(lm, request, "SentimentClassifier", SentimentClassifier::schema()).await
}

/// Analyze `brief` in one call.
pub async fn analyze_business<L: LM + ?Sized>(
    lm: &L,
    brief: &str,
) -> anyhow::Result<BusinessAnalysis> {
    let request = LMRequest::from_messages(vec![
        Message::system(BUSINESS_SYSTEM),
        Message::user(brief),
    ]);
    generate_structured(lm, request, "BusinessAnalysis", BusinessAnalysis::schema()).await
}
