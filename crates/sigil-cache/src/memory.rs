// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! In-memory LRU cache

use crate::{Cache, CacheKey};
use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of entries kept by [`MemoryCache::with_default_capacity`].
pub const DEFAULT_CAPACITY: usize = 1000;

/// In-memory LRU cache
#[derive(Clone)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<CacheKey, Vec<u8>>>>,
}

#[derive(Serialize, Deserialize)]
struct Entry {
    key: CacheKey,
    value: Vec<u8>,
}

impl MemoryCache {
    /// Create a new memory cache with capacity
    pub fn new(capacity: usize) -> anyhow::Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| anyhow::anyhow!("memory cache capacity must be > 0"))?;
        Ok(Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    /// Create with default capacity (1000 items)
    pub fn with_default_capacity() -> Self {
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::MIN.saturating_add(DEFAULT_CAPACITY - 1),
            ))),
        }
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    /// Persist every entry to `path` as JSON, least recently used first.
    pub async fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let entries: Vec<Entry> = {
            let cache = self.cache.lock().await;
            cache
                .iter()
                .rev()
                .map(|(key, value)| Entry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        };
        let data = serde_json::to_vec(&entries)?;
        tokio::fs::write(path.as_ref(), data).await?;
        tracing::debug!(entries = entries.len(), path = %path.as_ref().display(), "memory cache saved");
        Ok(())
    }

    /// Load entries written by [`MemoryCache::save`], keeping existing ones.
    ///
    /// Returns the number of entries read.
    pub async fn load(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let data = tokio::fs::read(path.as_ref()).await?;
        let entries: Vec<Entry> = serde_json::from_slice(&data)?;
        let count = entries.len();

        let mut cache = self.cache.lock().await;
        for entry in entries {
            cache.put(entry.key, entry.value);
        }
        tracing::debug!(entries = count, path = %path.as_ref().display(), "memory cache loaded");
        Ok(count)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let mut cache = self.cache.lock().await;
        cache.get(key).cloned()
    }

    async fn set(&self, key: CacheKey, value: Vec<u8>) -> anyhow::Result<()> {
        let mut cache = self.cache.lock().await;
        cache.put(key, value);
        Ok(())
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        let cache = self.cache.lock().await;
        cache.contains(key)
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut cache = self.cache.lock().await;
        cache.clear();
        Ok(())
    }
}
