// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Connection pooling for LM clients

use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Connection pool for rate limiting and concurrency control
#[derive(Clone)]
pub struct LMPool {
    /// Semaphore for controlling concurrent requests
    semaphore: Arc<Semaphore>,

    /// Maximum concurrent requests
    max_concurrent: usize,
}

impl LMPool {
    /// Create a new pool. A zero limit is raised to one.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Acquire a permit to make a request
    pub async fn acquire(&self) -> anyhow::Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("LM pool closed"))
    }

    /// Get max concurrent requests
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for LMPool {
    fn default() -> Self {
        Self::new(10)
    }
}
