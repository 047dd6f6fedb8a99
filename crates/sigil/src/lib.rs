// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! # Sigil - declarative LM programs
//!
//! Programs are built from typed [`Signature`]s. A [`Predict`] turns a
//! signature into prompts through an [`Adapter`], calls the LM held by the
//! [`Settings`] context and parses the completion into a [`Prediction`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use sigil::{ChainOfThought, Inputs, Module, Settings};
//! use sigil_client::MockLM;
//!
//! let ctx = Settings::new(MockLM::constant("[[ ## reasoning ## ]]\n...\n\n[[ ## answer ## ]]\n4"));
//! let cot = ChainOfThought::from_spec("question -> answer: int")?;
//! let pred = cot.forward(&ctx, &Inputs::new().with("question", "2+2?")).await?;
//! assert_eq!(pred.get_i64("answer"), Some(4));
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod error;
pub mod example;
pub mod field;
pub mod history;
pub mod module;
pub mod modules;
pub mod predict;
pub mod prediction;
pub mod retrieve;
pub mod settings;
pub mod signature;
pub mod trace;
pub mod types;

pub use adapter::{Adapter, ChatAdapter, JSONAdapter};
pub use adapter::chat::ChatConfig;
pub use adapter::json::JSONConfig;
pub use error::{Error, Result};
pub use example::Example;
pub use field::{Field, FieldKind, FieldType, InputField, OutputField};
pub use history::{History, HistoryEntry};
pub use module::Module;
pub use modules::{ChainOfThought, FnTool, ReAct, ReActConfig, Step, Tool};
pub use predict::{Predict, PredictState};
pub use prediction::Prediction;
pub use retrieve::{ColBERTv2, Passage, SearchTool};
pub use settings::Settings;
pub use signature::{Signature, SignatureBuilder};
pub use trace::{Trace, TraceEntry};
pub use types::{FieldMap, Inputs};
