// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Disk-based cache
//!
//! Entries live under `<dir>/<model>/<hash>_<temperature>.json`. Writes go
//! to a temporary file first and are renamed into place, so concurrent
//! evaluations never read a partial entry.

use crate::{Cache, CacheKey};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const ENTRY_EXT: &str = "json";

/// Cache that stores each LM response as a file
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    /// Open `cache_dir`, creating it if needed
    pub async fn new(cache_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).await?;
        Ok(Self { cache_dir })
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn model_dir(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(sanitize(&key.model))
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.model_dir(key).join(format!(
            "{:016x}_{}.{ENTRY_EXT}",
            key.request_hash, key.temperature_x1000
        ))
    }

    /// Number of stored entries across all models
    pub async fn len(&self) -> anyhow::Result<usize> {
        let mut count = 0;
        let mut models = fs::read_dir(&self.cache_dir).await?;
        while let Some(model) = models.next_entry().await? {
            if !model.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(model.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if is_entry(&entry.path()) {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Whether no entries are stored
    pub async fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len().await? == 0)
    }
}

fn sanitize(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn is_entry(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(ENTRY_EXT)
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        fs::read(self.entry_path(key)).await.ok()
    }

    async fn set(&self, key: CacheKey, value: Vec<u8>) -> anyhow::Result<()> {
        fs::create_dir_all(self.model_dir(&key)).await?;
        let path = self.entry_path(&key);
        let tmp = path.with_extension("tmp");

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&value).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path).await?;
        tracing::trace!(path = %path.display(), bytes = value.len(), "disk cache write");
        Ok(())
    }

    async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.entry_path(key)).await.unwrap_or(false)
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut models = fs::read_dir(&self.cache_dir).await?;
        while let Some(model) = models.next_entry().await? {
            if model.file_type().await?.is_dir() {
                fs::remove_dir_all(model.path()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_grouped_by_model() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).await.unwrap();

        let a = CacheKey::from_request("azure/gpt-4o", "q1", 0.0);
        let b = CacheKey::from_request("ollama_chat/llama3.2:1b", "q1", 0.0);
        cache.set(a.clone(), b"a".to_vec()).await.unwrap();
        cache.set(b.clone(), b"b".to_vec()).await.unwrap();

        assert!(dir.path().join("azure_gpt-4o").is_dir());
        assert!(dir.path().join("ollama_chat_llama3.2_1b").is_dir());
        assert_eq!(cache.len().await.unwrap(), 2);
        assert_eq!(cache.get(&b).await.as_deref(), Some(&b"b"[..]));
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).await.unwrap();
        let key = CacheKey::from_request("m", "q", 0.5);

        cache.set(key.clone(), b"first".to_vec()).await.unwrap();
        cache.set(key.clone(), b"second".to_vec()).await.unwrap();

        assert_eq!(cache.get(&key).await.as_deref(), Some(&b"second"[..]));
        let leftovers = std::fs::read_dir(dir.path().join("m"))
            .unwrap()
            .filter(|e| !is_entry(&e.as_ref().unwrap().path()))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_clear_empties() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).await.unwrap();
        cache
            .set(CacheKey::from_request("m", "q", 0.0), vec![1])
            .await
            .unwrap();
        cache.clear().await.unwrap();
        assert!(cache.is_empty().await.unwrap());
    }
}
