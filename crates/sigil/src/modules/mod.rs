// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Composite modules built on [`Predict`](crate::predict::Predict)
//!
//! - `ChainOfThought`: adds a reasoning output before the declared outputs
//! - `ReAct`: tool-using agent loop followed by an extraction step

pub mod chain_of_thought;
pub mod react;

pub use chain_of_thought::ChainOfThought;
pub use react::{passages_observation, string_arg, FnTool, ReAct, ReActConfig, Step, Tool};
