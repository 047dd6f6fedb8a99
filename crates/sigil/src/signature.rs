// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Signature system for defining input/output contracts
//!
//! A signature is declared once and treated as a value: methods that change
//! it consume `self` and return the modified copy, so optimizers can derive
//! variants without touching the original.

use crate::error::{Error, Result};
use crate::field::{Field, FieldKind, FieldType};
use serde::{Deserialize, Serialize};

/// A signature defining the input/output contract of a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Name used in logs and saved programs
    pub name: String,

    /// Instruction/prompt for the task
    pub instructions: String,

    /// Input fields
    pub input_fields: Vec<Field>,

    /// Output fields
    pub output_fields: Vec<Field>,
}

impl Signature {
    /// Create a new signature
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            input_fields: Vec::new(),
            output_fields: Vec::new(),
        }
    }

    fn check_unique(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::signature("field name must not be empty"));
        }
        if self.field(name).is_some() {
            return Err(Error::signature(format!(
                "duplicate field {name:?} in signature {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Add an input field
    pub fn add_input(mut self, field: Field) -> Result<Self> {
        if field.field_type != FieldType::Input {
            return Err(Error::signature("Field must be an input field"));
        }
        self.check_unique(&field.name)?;
        self.input_fields.push(field);
        Ok(self)
    }

    /// Add an output field
    pub fn add_output(mut self, field: Field) -> Result<Self> {
        if field.field_type != FieldType::Output {
            return Err(Error::signature("Field must be an output field"));
        }
        self.check_unique(&field.name)?;
        self.output_fields.push(field);
        Ok(self)
    }

    /// Insert an output field ahead of the existing outputs
    pub fn prepend_output(mut self, field: Field) -> Result<Self> {
        if field.field_type != FieldType::Output {
            return Err(Error::signature("Field must be an output field"));
        }
        self.check_unique(&field.name)?;
        self.output_fields.insert(0, field);
        Ok(self)
    }

    /// Replace the instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Replace the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.all_fields().find(|f| f.name == name)
    }

    /// Get all fields (inputs then outputs)
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.input_fields.iter().chain(self.output_fields.iter())
    }

    /// Input field names in declaration order
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.input_fields.iter().map(|f| f.name.as_str())
    }

    /// Output field names in declaration order
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.output_fields.iter().map(|f| f.name.as_str())
    }

    /// JSON schema of an object holding every output field
    pub fn output_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .output_fields
            .iter()
            .map(|f| {
                let mut schema = f.kind.json_schema();
                if !f.desc.is_empty() {
                    schema["description"] = serde_json::Value::from(f.desc.clone());
                }
                (f.name.clone(), schema)
            })
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.output_names().collect::<Vec<_>>(),
            "additionalProperties": false,
        })
    }

    /// Parse a signature from string format: "input1, input2 -> output1, output2"
    ///
    /// Fields may carry a type annotation (`score: int`, `topics: list[str]`).
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split("->").map(|p| p.trim()).collect();
        if parts.len() != 2 {
            return Err(Error::signature(
                "Signature must be in format 'inputs -> outputs'",
            ));
        }

        let mut sig = Self::new("StringSignature", "");

        for input in split_fields(parts[0]) {
            let (name, kind) = parse_field_decl(input)?;
            sig = sig.add_input(Field::new(name, "", FieldType::Input).with_kind(kind))?;
        }

        for output in split_fields(parts[1]) {
            let (name, kind) = parse_field_decl(output)?;
            sig = sig.add_output(Field::new(name, "", FieldType::Output).with_kind(kind))?;
        }

        if sig.output_fields.is_empty() {
            return Err(Error::signature("Signature needs at least one output"));
        }

        sig.instructions = sig.default_instructions();
        Ok(sig)
    }

    /// Instructions derived from the field names
    pub fn default_instructions(&self) -> String {
        let quote = |names: Vec<&str>| {
            names
                .iter()
                .map(|n| format!("`{n}`"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Given the fields {}, produce the fields {}.",
            quote(self.input_names().collect()),
            quote(self.output_names().collect())
        )
    }

    /// Convert signature to string format
    pub fn to_string_format(&self) -> String {
        let inputs: Vec<&str> = self.input_names().collect();
        let outputs: Vec<&str> = self.output_names().collect();
        format!("{} -> {}", inputs.join(", "), outputs.join(", "))
    }
}

fn split_fields(s: &str) -> impl Iterator<Item = &str> {
    // Commas inside brackets belong to a type annotation
    let mut depth = 0i32;
    let mut start = 0;
    let mut pieces = Vec::new();
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&s[start..]);
    pieces.into_iter().map(str::trim).filter(|p| !p.is_empty())
}

fn parse_field_decl(decl: &str) -> Result<(&str, FieldKind)> {
    match decl.split_once(':') {
        None => Ok((decl, FieldKind::Str)),
        Some((name, ty)) => Ok((name.trim(), parse_kind(ty.trim())?)),
    }
}

fn parse_kind(ty: &str) -> Result<FieldKind> {
    let lower = ty.to_ascii_lowercase();
    match lower.as_str() {
        "str" | "string" => return Ok(FieldKind::Str),
        "int" => return Ok(FieldKind::int()),
        "float" => return Ok(FieldKind::Float),
        "bool" => return Ok(FieldKind::Bool),
        "dict" | "json" => return Ok(FieldKind::Json),
        _ => {}
    }
    if let Some(inner) = lower
        .strip_prefix("list[")
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let start = ty.len() - inner.len() - 1;
        return Ok(FieldKind::list(parse_kind(&ty[start..ty.len() - 1])?));
    }
    if lower.starts_with("literal[") && lower.ends_with(']') {
        let options = ty["literal[".len()..ty.len() - 1]
            .split(',')
            .map(|o| o.trim().trim_matches(|c: char| c == '\'' || c == '"'))
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        return Ok(FieldKind::Literal(options));
    }
    Err(Error::signature(format!("unknown field type {ty:?}")))
}

/// Builder for creating signatures
pub struct SignatureBuilder {
    signature: Signature,
}

impl SignatureBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            signature: Signature::new(name, ""),
        }
    }

    /// Set the instructions
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.signature.instructions = instructions.into();
        self
    }

    /// Add an input field
    pub fn input(mut self, field: Field) -> Result<Self> {
        self.signature = self.signature.add_input(field)?;
        Ok(self)
    }

    /// Add an output field
    pub fn output(mut self, field: Field) -> Result<Self> {
        self.signature = self.signature.add_output(field)?;
        Ok(self)
    }

    /// Build the signature.
    ///
    /// Fails without outputs; empty instructions fall back to
    /// [`Signature::default_instructions`].
    pub fn build(self) -> Result<Signature> {
        let mut signature = self.signature;
        if signature.output_fields.is_empty() {
            return Err(Error::signature(format!(
                "signature {} has no output fields",
                signature.name
            )));
        }
        if signature.instructions.trim().is_empty() {
            signature.instructions = signature.default_instructions();
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{InputField, OutputField};

    #[test]
    fn test_signature_from_str() {
        let sig = Signature::parse("question, context -> answer").unwrap();
        assert_eq!(sig.input_fields.len(), 2);
        assert_eq!(sig.output_fields.len(), 1);
        assert_eq!(sig.input_fields[0].name, "question");
        assert_eq!(sig.input_fields[1].name, "context");
        assert_eq!(sig.output_fields[0].name, "answer");
        assert_eq!(
            sig.instructions,
            "Given the fields `question`, `context`, produce the fields `answer`."
        );
    }

    #[test]
    fn test_signature_typed_annotations() {
        let sig =
            Signature::parse("comment -> answer: list[Literal['Pricing', 'Support']], n: int")
                .unwrap();
        assert_eq!(
            sig.output_fields[0].kind,
            FieldKind::list(FieldKind::literal(["Pricing", "Support"]))
        );
        assert_eq!(sig.output_fields[1].kind, FieldKind::int());
    }

    #[test]
    fn test_output_schema_requires_all_outputs() {
        let sig = Signature::parse("q -> reasoning, score: int").unwrap();
        let schema = sig.output_schema();
        assert_eq!(schema["required"], serde_json::json!(["reasoning", "score"]));
        assert_eq!(schema["properties"]["score"]["type"], "integer");
    }

    #[test]
    fn test_signature_to_string() {
        let sig = Signature::parse("q, ctx -> a").unwrap();
        assert_eq!(sig.to_string_format(), "q, ctx -> a");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Signature::parse("question answer").is_err());
        assert!(Signature::parse("q -> ").is_err());
        assert!(Signature::parse("q -> a: tensor").is_err());
        assert!(Signature::parse("q, q -> a").is_err());
    }

    #[test]
    fn test_signature_builder() {
        let sig = SignatureBuilder::new("QA")
            .instructions("Answer the question")
            .input(InputField::create("question", "User question"))
            .unwrap()
            .output(OutputField::create("answer", "Short answer"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(sig.instructions, "Answer the question");
        assert_eq!(sig.input_fields.len(), 1);
    }

    #[test]
    fn test_duplicate_across_inputs_and_outputs() {
        let result = Signature::new("S", "")
            .add_input(InputField::create("text", ""))
            .unwrap()
            .add_output(OutputField::create("text", ""));
        assert!(result.is_err());
    }

    #[test]
    fn test_prepend_output_leaves_original() {
        let base = Signature::parse("q -> a").unwrap();
        let cot = base
            .clone()
            .prepend_output(OutputField::create("reasoning", "Think step by step"))
            .unwrap();
        assert_eq!(base.output_fields.len(), 1);
        assert_eq!(cot.output_fields[0].name, "reasoning");
        assert_eq!(cot.output_fields[1].name, "a");
    }
}
