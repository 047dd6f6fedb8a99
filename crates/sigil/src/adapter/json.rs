// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! JSON Adapter
//!
//! Asks for a single JSON object keyed by output field names and parses the
//! first balanced object found in the completion.

use crate::adapter::{
    chat::truncate, describe_signature, marker, objective, render_demo_inputs, render_inputs,
    Adapter,
};
use crate::error::{Error, Result};
use crate::example::Example;
use crate::prediction::Prediction;
use crate::signature::Signature;
use crate::types::{FieldMap, Inputs};
use serde_json::Value;
use sigil_client::{Message, ResponseFormat};

/// JSON adapter configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct JSONConfig {
    /// Request a JSON schema built from the output fields instead of plain JSON mode
    pub use_schema: bool,
}

/// JSON-object adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct JSONAdapter {
    config: JSONConfig,
}

impl JSONAdapter {
    /// Create a new JSON adapter.
    pub fn new(config: JSONConfig) -> Self {
        Self { config }
    }

    fn system_message(&self, signature: &Signature) -> String {
        let mut out = describe_signature(signature);
        out.push_str(
            "All interactions will be structured in the following way, with the appropriate values filled in.\n\nInputs will have the following structure:\n\n",
        );
        for field in &signature.input_fields {
            out.push_str(&format!("{}\n{{{}}}\n\n", marker(&field.name), field.name));
        }
        out.push_str("Outputs will be a JSON object with the following fields.\n\n");
        let skeleton: Vec<String> = signature
            .output_fields
            .iter()
            .map(|f| {
                let note = f
                    .kind
                    .constraint()
                    .map(|c| format!("        # note: the value you produce must be {c}"))
                    .unwrap_or_default();
                format!("  \"{}\": \"{{{}}}\"{}", f.name, f.name, note)
            })
            .collect();
        out.push_str(&format!("{{\n{}\n}}\n", skeleton.join(",\n")));
        out.push_str(&objective(signature));
        out
    }

    fn user_request(&self, signature: &Signature) -> String {
        let order: Vec<String> = signature
            .output_fields
            .iter()
            .map(|f| match f.kind.constraint() {
                Some(c) => format!("`{}` (must be formatted as {c})", f.name),
                None => format!("`{}`", f.name),
            })
            .collect();
        format!(
            "Respond with a JSON object in the following order of fields: {}.",
            order.join(", then ")
        )
    }

    fn demo_outputs(&self, signature: &Signature, demo: &Example) -> String {
        let outputs: FieldMap = signature
            .output_fields
            .iter()
            .filter_map(|f| demo.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect();
        Value::Object(outputs).to_string()
    }
}

impl Adapter for JSONAdapter {
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
        parse_json_completion(signature, completion)
    }

    fn response_format(&self, signature: &Signature) -> Option<ResponseFormat> {
        Some(if self.config.use_schema {
            ResponseFormat::json_schema(signature.name.clone(), signature.output_schema())
        } else {
            ResponseFormat::JsonObject
        })
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Parse the first JSON object in `completion` into the signature's outputs.
pub(crate) fn parse_json_completion(signature: &Signature, completion: &str) -> Result<Prediction> {
    let object_text = first_json_object(completion).ok_or_else(|| {
        Error::parse(format!(
            "no JSON object in completion: {}",
            truncate(completion, 200)
        ))
    })?;
    let object: FieldMap = serde_json::from_str(object_text)
        .map_err(|e| Error::parse(format!("invalid JSON object: {e}")))?;

    let mut prediction = Prediction::new();
    for field in &signature.output_fields {
        let value = object.get(&field.name).ok_or_else(|| {
            Error::parse(format!("missing output field `{}` in JSON", field.name))
        })?;
        let value = field
            .kind
            .coerce_value(value)
            .map_err(|e| Error::parse(format!("field `{}`: {e}", field.name)))?;
        prediction.insert(field.name.clone(), value);
    }
    Ok(prediction)
}

/// Slice of the first balanced `{...}` in `text`, ignoring braces in strings.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
