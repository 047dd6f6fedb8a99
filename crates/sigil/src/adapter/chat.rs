// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Chat Adapter
//!
//! Formats prompts for chat-style LM interfaces with `[[ ## field ## ]]`
//! separators. The system message lists the fields and the objective;
//! each demo becomes a user/assistant exchange.

use crate::adapter::{
    describe_signature, json, marker, objective, output_note, render_demo_inputs, render_inputs,
    Adapter,
};
use crate::error::{Error, Result};
use crate::example::Example;
use crate::prediction::Prediction;
use crate::signature::Signature;
use crate::types::{value_to_text, Inputs};
use regex::Regex;
use sigil_client::Message;
use std::collections::HashMap;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[ ## (\w+) ## \]\]").expect("valid regex"));

const COMPLETED: &str = "completed";

/// Chat adapter configuration.
#[derive(Clone, Copy, Debug)]
pub struct ChatConfig {
    /// Retry parsing as JSON when no section markers are found
    pub json_fallback: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            json_fallback: true,
        }
    }
}

/// Chat-style adapter for LM prompts.
///
/// Formats prompts as:
/// ```text
/// [[ ## question ## ]]
/// What is 2+2?
///
/// Respond with the corresponding output fields, starting with the field
/// `[[ ## answer ## ]]`, and then ending with the marker for
/// `[[ ## completed ## ]]`.
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ChatAdapter {
    config: ChatConfig,
}

impl ChatAdapter {
    /// Create a new chat adapter.
    pub fn new(config: ChatConfig) -> Self {
        Self { config }
    }

    fn system_message(&self, signature: &Signature) -> String {
        let mut out = describe_signature(signature);
        out.push_str(
            "All interactions will be structured in the following way, with the appropriate values filled in.\n\n",
        );
        for field in signature.all_fields() {
            out.push_str(&format!("{}\n{{{}}}\n\n", marker(&field.name), field.name));
        }
        out.push_str(&marker(COMPLETED));
        out.push('\n');
        out.push_str(&objective(signature));
        out
    }

    fn user_request(&self, signature: &Signature) -> String {
        let notes: Vec<String> = signature.output_fields.iter().map(output_note).collect();
        let listing = match notes.split_first() {
            Some((first, rest)) if !rest.is_empty() => {
                format!("starting with the field {first}, then {}", rest.join(", then "))
            }
            Some((first, _)) => format!("starting with the field {first}"),
            None => String::new(),
        };
        format!(
            "Respond with the corresponding output fields, {listing}, and then ending with the marker for `{}`.",
            marker(COMPLETED)
        )
    }

    fn demo_outputs(&self, signature: &Signature, demo: &Example) -> String {
        let mut out = String::new();
        for field in &signature.output_fields {
            if let Some(value) = demo.get(&field.name) {
                out.push_str(&format!("{}\n{}\n\n", marker(&field.name), value_to_text(value)));
            }
        }
        out.push_str(&marker(COMPLETED));
        out
    }

    fn sections<'t>(&self, completion: &'t str) -> HashMap<&'t str, &'t str> {
        let headers: Vec<_> = HEADER.captures_iter(completion).collect();
        let mut sections = HashMap::new();
        for (i, caps) in headers.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(completion.len(), |m| m.start());
            sections
                .entry(name.as_str())
                .or_insert_with(|| completion[whole.end()..end].trim());
        }
        sections
    }
}

impl Adapter for ChatAdapter {
    fn format(
        &self,
        signature: &Signature,
        demos: &[Example],
        inputs: &Inputs,
    ) -> Vec<Message<'static>> {
        let mut messages = Vec::with_capacity(2 + demos.len() * 2);
        messages.push(Message::system(self.system_message(signature)));

        for demo in demos {
            messages.push(Message::user(render_demo_inputs(signature, demo)));
            messages.push(Message::assistant(self.demo_outputs(signature, demo)));
        }

        let mut request = render_inputs(signature, inputs);
        request.push_str(&self.user_request(signature));
        messages.push(Message::user(request));
        messages
    }

    fn parse(&self, signature: &Signature, completion: &str) -> Result<Prediction> {
        let sections = self.sections(completion);

        if sections.is_empty() && self.config.json_fallback {
            tracing::debug!("no section markers in completion, trying JSON");
            return json::parse_json_completion(signature, completion);
        }

        let mut prediction = Prediction::new();
        for field in &signature.output_fields {
            let raw = sections.get(field.name.as_str()).ok_or_else(|| {
                Error::parse(format!(
                    "missing output field `{}` in completion: {}",
                    field.name,
                    truncate(completion, 200)
                ))
            })?;
            let value = field
                .kind
                .coerce(raw)
                .map_err(|e| Error::parse(format!("field `{}`: {e}", field.name)))?;
            prediction.insert(field.name.clone(), value);
        }
        Ok(prediction)
    }

    fn name(&self) -> &'static str {
        "chat"
    }
}

pub(crate) fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}
