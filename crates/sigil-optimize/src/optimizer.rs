// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Optimizer trait and shared helpers

use async_trait::async_trait;
use sigil::{Example, Module, Result, Settings};
use sigil_eval::{Evaluate, Metric};
use std::sync::Arc;

/// Trait for optimizers that improve modules.
///
/// `compile` never mutates the student; it returns an improved copy.
#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Optimize `student` on `trainset`, validating on `valset` when the
    /// optimizer uses one.
    async fn compile<M>(
        &self,
        ctx: &Settings,
        student: &M,
        trainset: &[Example],
        valset: Option<&[Example]>,
    ) -> Result<M>
    where
        M: Module + Clone + 'static;

    /// Get optimizer name.
    fn name(&self) -> &'static str;
}

/// Simple random number generator (64-bit LCG).
///
/// The seed is scrambled with splitmix64 so small or adjacent seeds do not
/// start with near-zero draws.
#[derive(Clone, Copy, Debug)]
pub struct Rng(u64);

impl Rng {
    /// Create from seed.
    pub const fn new(seed: u64) -> Self {
        let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self(z ^ (z >> 31))
    }

    /// Get next random u64.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    /// Get random float in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Get random usize in [0, max).
    #[inline]
    pub fn next_usize(&mut self, max: usize) -> usize {
        ((self.next_f64() * max as f64) as usize).min(max.saturating_sub(1))
    }

    /// Get random usize in [min, max].
    pub fn range_inclusive(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        min + self.next_usize(max - min + 1)
    }

    /// Shuffle a mutable slice.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_usize(i + 1);
            slice.swap(i, j);
        }
    }

    /// `k` distinct elements in random order.
    pub fn sample<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T> {
        let mut pool: Vec<T> = items.to_vec();
        self.shuffle(&mut pool);
        pool.truncate(k);
        pool
    }
}

/// Mean metric score of `program` over `examples`; failed examples score 0.
pub async fn evaluate_program<M: Module + ?Sized>(
    ctx: &Settings,
    program: &M,
    examples: &[Example],
    metric: &Arc<dyn Metric>,
    num_threads: usize,
) -> Result<f64> {
    let result = Evaluate::from_arc(examples.to_vec(), metric.clone())
        .with_num_threads(num_threads)
        .with_max_errors(usize::MAX)
        .run(ctx, program)
        .await?;
    Ok(result.score)
}

/// Parse `1. text` / `2) text` lines from an LM completion.
///
/// Unnumbered non-empty lines are accepted when no numbered line is present.
pub fn parse_numbered(text: &str, limit: usize) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let numbered: Vec<String> = lines
        .iter()
        .filter_map(|line| {
            let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
            if rest.len() == line.len() {
                return None;
            }
            rest.strip_prefix('.')
                .or_else(|| rest.strip_prefix(')'))
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect();

    let candidates = if numbered.is_empty() {
        lines.iter().map(|l| l.to_string()).collect()
    } else {
        numbered
    };
    candidates.into_iter().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = Rng::new(42);
        let mut rng2 = Rng::new(42);
        for _ in 0..10 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_first_draw_not_biased_by_small_seeds() {
        let low = (0..1000u64)
            .filter(|&seed| Rng::new(seed).next_f64() < 0.5)
            .count();
        assert!((400..=600).contains(&low), "{low} of 1000 first draws below 0.5");
    }

    #[test]
    fn test_first_pick_covers_every_index() {
        let picks: std::collections::BTreeSet<usize> =
            (0..100u64).map(|seed| Rng::new(seed).next_usize(6)).collect();
        assert_eq!(picks.len(), 6);
    }

    #[test]
    fn test_rng_bounds() {
        let mut rng = Rng::new(7);
        for _ in 0..200 {
            assert!(rng.next_f64() < 1.0);
            assert!(rng.next_usize(3) < 3);
            let r = rng.range_inclusive(1, 4);
            assert!((1..=4).contains(&r));
        }
    }

    #[test]
    fn test_sample_is_permutation_prefix() {
        let mut rng = Rng::new(1);
        let mut picked = rng.sample(&[1, 2, 3, 4, 5], 3);
        assert_eq!(picked.len(), 3);
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 3);
        assert_eq!(rng.sample(&[1, 2], 5).len(), 2);
    }

    #[test]
    fn test_parse_numbered() {
        let text = "Here you go:\n1. Route by urgency.\n2) Read the whole ticket.\n\n3. Be brief.";
        assert_eq!(
            parse_numbered(text, 2),
            vec!["Route by urgency.", "Read the whole ticket."]
        );
        assert_eq!(parse_numbered("Just one idea", 3), vec!["Just one idea"]);
        assert!(parse_numbered("   \n", 3).is_empty());
    }
}
