// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Cache key generation

use serde::{Deserialize, Serialize};

/// A cache key for LM requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Model name
    pub model: String,

    /// Request hash
    pub request_hash: u64,

    /// Temperature (multiplied by 1000 for integer comparison)
    pub temperature_x1000: u32,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(model: impl Into<String>, request_hash: u64, temperature: f32) -> Self {
        Self {
            model: model.into(),
            request_hash,
            temperature_x1000: (temperature.max(0.0) * 1000.0).round() as u32,
        }
    }

    /// Create from the serialized request body.
    ///
    /// FNV-1a keeps keys stable across processes.
    pub fn from_request(model: &str, request: &str, temperature: f32) -> Self {
        Self::new(model, fnv1a(request.as_bytes()), temperature)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}
