// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Typed decoding of JSON completions

use crate::lm::LM;
use crate::request::{LMRequest, ResponseFormat};
use crate::response::LMResponse;
use serde::de::DeserializeOwned;

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a completion into `T`.
pub fn parse_structured<T: DeserializeOwned>(response: &LMResponse) -> anyhow::Result<T> {
    let body = strip_code_fence(&response.text);
    serde_json::from_str(body).map_err(|e| {
        anyhow::anyhow!(
            "completion from {} is not a valid {}: {e}",
            response.model,
            std::any::type_name::<T>()
        )
    })
}

/// Send `request` with a schema-constrained response format and decode the reply.
pub async fn generate_structured<T, L>(
    lm: &L,
    request: LMRequest<'_>,
    schema_name: &str,
    schema: serde_json::Value,
) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    L: LM + ?Sized,
{
    let request = request.with_response_format(ResponseFormat::json_schema(schema_name, schema));
    let response = lm.generate(&request).await?;
    parse_structured(&response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLM;
    use crate::request::Message;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sentiment {
        text: String,
        sentiment: i64,
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_structured_reports_type() {
        let response = LMResponse::new("not json", "m");
        let err = parse_structured::<Sentiment>(&response).unwrap_err();
        assert!(err.to_string().contains("Sentiment"));
    }

    #[tokio::test]
    async fn test_generate_structured_sets_format() {
        let lm = MockLM::new(|req| {
            assert!(matches!(
                req.response_format,
                Some(ResponseFormat::JsonSchema { .. })
            ));
            r#"{"text":"great","sentiment":9}"#.to_string()
        });
        let out: Sentiment = generate_structured(
            &lm,
            LMRequest::from_messages(vec![Message::user("great")]),
            "SentimentClassifier",
            serde_json::json!({"type": "object"}),
        )
        .await
        .unwrap();
        assert_eq!(out.sentiment, 9);
        assert_eq!(out.text, "great");
    }
}
