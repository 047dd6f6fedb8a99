// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Adapters
//!
//! Adapters turn a signature, its demos and the current inputs into chat
//! messages, and turn the LM completion back into a [`Prediction`].
//!
//! ## Available Adapters
//!
//! - `ChatAdapter`: `[[ ## field ## ]]` section markers
//! - `JSONAdapter`: a single JSON object keyed by output field names

pub mod chat;
pub mod json;

use crate::error::Result;
use crate::example::Example;
use crate::field::Field;
use crate::prediction::Prediction;
use crate::signature::Signature;
use crate::types::{value_to_text, Inputs};
use sigil_client::{Message, ResponseFormat};
use std::fmt::Write;

/// Prompt formatting and completion parsing for one prompt style.
pub trait Adapter: Send + Sync {
    /// Build the chat messages for a call.
    fn format(
        &self,
        signature: &Signature,
        demos: &[Example],
        inputs: &Inputs,
    ) -> Vec<Message<'static>>;

    /// Parse a completion into the signature's outputs.
    fn parse(&self, signature: &Signature, completion: &str) -> Result<Prediction>;

    /// Output format to request from the provider, if any.
    fn response_format(&self, _signature: &Signature) -> Option<ResponseFormat> {
        None
    }

    /// Adapter name.
    fn name(&self) -> &'static str;
}

/// Section marker for a field.
#[inline]
pub fn marker(name: &str) -> String {
    format!("[[ ## {name} ## ]]")
}

/// Numbered listing of fields with their types and descriptions.
pub fn field_listing(fields: &[Field]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        let _ = write!(out, "{}. `{}` ({})", i + 1, field.name, field.kind.type_name());
        if !field.desc.is_empty() {
            let _ = write!(out, ": {}", field.desc);
        }
        out.push('\n');
    }
    out
}

/// Header describing inputs and outputs, shared by every adapter.
pub(crate) fn describe_signature(signature: &Signature) -> String {
    let mut out = String::new();
    out.push_str("Your input fields are:\n");
    out.push_str(&field_listing(&signature.input_fields));
    out.push_str("Your output fields are:\n");
    out.push_str(&field_listing(&signature.output_fields));
    out
}

/// Objective paragraph closing the system message.
pub(crate) fn objective(signature: &Signature) -> String {
    let instructions = if signature.instructions.trim().is_empty() {
        signature.default_instructions()
    } else {
        signature.instructions.clone()
    };
    let indented: Vec<String> = instructions
        .lines()
        .map(|l| format!("        {l}"))
        .collect();
    format!(
        "In adhering to this structure, your objective is: \n{}",
        indented.join("\n")
    )
}

/// Render input fields as marker sections, skipping absent ones.
pub(crate) fn format_input_sections<'a>(
    fields: impl Iterator<Item = &'a Field>,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    let mut out = String::new();
    for field in fields {
        if let Some(value) = lookup(&field.name) {
            let _ = write!(out, "{}\n{}\n\n", marker(&field.name), value);
        }
    }
    out
}

/// Input sections for the live call.
pub(crate) fn render_inputs(signature: &Signature, inputs: &Inputs) -> String {
    format_input_sections(signature.input_fields.iter(), |name| {
        inputs.get(name).map(value_to_text)
    })
}

/// Input sections for a demo.
pub(crate) fn render_demo_inputs(signature: &Signature, demo: &Example) -> String {
    format_input_sections(signature.input_fields.iter(), |name| {
        demo.get(name).map(value_to_text)
    })
}

/// Trailing note for one output field.
pub(crate) fn output_note(field: &Field) -> String {
    match field.kind.constraint() {
        Some(c) => format!("`{}` (must be formatted as {c})", marker(&field.name)),
        None => format!("`{}`", marker(&field.name)),
    }
}

pub use chat::ChatAdapter;
pub use json::JSONAdapter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, InputField, OutputField};

    #[test]
    fn test_marker() {
        assert_eq!(marker("answer"), "[[ ## answer ## ]]");
    }

    #[test]
    fn test_field_listing() {
        let fields = vec![
            InputField::create("ticket_text", "The ticket"),
            OutputField::create("score", "").with_kind(FieldKind::int()),
        ];
        assert_eq!(
            field_listing(&fields),
            "1. `ticket_text` (str): The ticket\n2. `score` (int)\n"
        );
    }

    #[test]
    fn test_objective_indents_every_line() {
        let sig = Signature::parse("q -> a")
            .unwrap()
            .with_instructions("Line one\nLine two");
        let text = objective(&sig);
        assert!(text.ends_with("        Line one\n        Line two"));
    }
}
