// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Optimizers for sigil programs
//!
//! - [`BootstrapFewShot`]: collects successful traces as few-shot demos
//! - [`COPRO`]: coordinate ascent over predictor instructions
//! - [`MIPROv2`]: joint search over instructions and demo sets

#![warn(missing_docs)]

pub mod bootstrap;
pub mod copro;
pub mod mipro;
pub mod optimizer;

pub use bootstrap::BootstrapFewShot;
pub use copro::{CandidateStats, COPROStats, COPRO};
pub use mipro::{AutoMode, MIPROReport, MIPROv2, TPESampler, TrialRecord};
pub use optimizer::{evaluate_program, parse_numbered, Optimizer, Rng};
