// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Response caching in front of any [`LM`]

use crate::lm::{LMConfig, LM};
use crate::request::LMRequest;
use crate::response::LMResponse;
use async_trait::async_trait;
use sigil_cache::{Cache, CacheKey};

/// LM wrapper that answers repeated requests from a cache.
///
/// The key covers the model, the full serialized request (messages,
/// overrides, response format, rollout id) and the effective temperature.
/// Caching is skipped when the inner config has `cache` disabled.
pub struct CachedLM<L, C> {
    inner: L,
    cache: C,
}

impl<L: LM, C: Cache> CachedLM<L, C> {
    /// Wrap `inner` with `cache`
    pub fn new(inner: L, cache: C) -> Self {
        Self { inner, cache }
    }

    /// Underlying cache
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Underlying LM
    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn key(&self, request: &LMRequest<'_>) -> anyhow::Result<CacheKey> {
        let serialized = serde_json::to_string(request)?;
        let temperature = request.temperature.unwrap_or(self.inner.config().temperature);
        Ok(CacheKey::from_request(
            self.inner.model(),
            &serialized,
            temperature,
        ))
    }
}

#[async_trait]
impl<L: LM, C: Cache> LM for CachedLM<L, C> {
    async fn generate(&self, request: &LMRequest<'_>) -> anyhow::Result<LMResponse> {
        if !self.inner.config().cache {
            return self.inner.generate(request).await;
        }

        let key = self.key(request)?;
        if let Some(bytes) = self.cache.get(&key).await {
            match serde_json::from_slice::<LMResponse>(&bytes) {
                Ok(mut response) => {
                    tracing::debug!(model = %self.inner.model(), "LM cache hit");
                    response.cached = true;
                    return Ok(response);
                }
                Err(e) => tracing::warn!(error = %e, "discarding unreadable cache entry"),
            }
        }

        let response = self.inner.generate(request).await?;
        self.cache.set(key, serde_json::to_vec(&response)?).await?;
        Ok(response)
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn config(&self) -> &LMConfig {
        self.inner.config()
    }
}
