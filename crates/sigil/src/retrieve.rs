// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! ColBERTv2 retrieval client
//!
//! Queries a hosted ColBERTv2 index over HTTP
//! (`GET {url}?query=...&k=...`), returning the `topk` passages.

use crate::error::{Error, Result};
use crate::modules::react::{passages_observation, string_arg, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// One retrieved passage
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,
    /// Passage id in the index
    #[serde(default)]
    pub pid: Option<u64>,
    /// Rank, starting at 1
    #[serde(default)]
    pub rank: Option<u32>,
    /// Retrieval score
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    topk: Vec<Passage>,
}

/// HTTP client for a ColBERTv2 server.
#[derive(Debug, Clone)]
pub struct ColBERTv2 {
    url: String,
    client: reqwest::Client,
}

impl ColBERTv2 {
    /// Client for the index at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Index URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Top `k` passages for `query`.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("query", query), ("k", &k.to_string())])
            .send()
            .await
            .map_err(|e| Error::tool(format!("retrieval request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::tool(format!("retrieval returned {status}: {body}")));
        }

        let mut parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::tool(format!("malformed retrieval response: {e}")))?;
        parsed.topk.truncate(k);
        tracing::debug!(query, hits = parsed.topk.len(), "retrieved passages");
        Ok(parsed.topk)
    }

    /// Wrap this client as a `search_wikipedia` tool returning `k` passages.
    pub fn search_tool(self, k: usize) -> SearchTool {
        SearchTool { retriever: self, k }
    }
}

/// Agent tool over a [`ColBERTv2`] index.
#[derive(Debug, Clone)]
pub struct SearchTool {
    retriever: ColBERTv2,
    k: usize,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_wikipedia"
    }

    fn description(&self) -> &str {
        "Search Wikipedia abstracts and return the most relevant passages."
    }

    fn args_schema(&self) -> Value {
        serde_json::json!({ "query": { "type": "string" } })
    }

    async fn call(&self, args: &Value) -> Result<String> {
        let query = string_arg(args, "query")
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| Error::tool(format!("expected {{\"query\": ...}}, got {args}")))?;
        let passages = self.retriever.search(&query, self.k).await?;
        let texts: Vec<String> = passages.into_iter().map(|p| p.text).collect();
        Ok(passages_observation(&texts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_tool_rejects_missing_query() {
        let tool = ColBERTv2::new("http://127.0.0.1:9/unused").search_tool(3);
        let err = tool.call(&serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }
}
