// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! ReAct module - Reasoning + Acting with tools.
//!
//! Each iteration asks the LM for a thought, a tool name and JSON tool
//! arguments, runs the tool and appends the observation to the trajectory.
//! The built-in `finish` tool ends the loop. A chain-of-thought extractor
//! then produces the original outputs from the inputs and the trajectory.

use crate::error::{Error, Result};
use crate::field::{FieldKind, InputField, OutputField};
use crate::module::Module;
use crate::modules::chain_of_thought::ChainOfThought;
use crate::predict::Predict;
use crate::prediction::Prediction;
use crate::settings::Settings;
use crate::signature::Signature;
use crate::types::{value_to_text, Inputs};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

/// Name of the tool that ends the loop
pub const FINISH_TOOL: &str = "finish";

const TRAJECTORY_FIELD: &str = "trajectory";

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as the LM must spell it.
    fn name(&self) -> &str;

    /// Tool description for the prompt.
    fn description(&self) -> &str;

    /// JSON description of the accepted arguments.
    fn args_schema(&self) -> Value {
        Value::Object(Default::default())
    }

    /// Execute the tool.
    async fn call(&self, args: &Value) -> Result<String>;
}

/// Tool backed by a synchronous closure.
pub struct FnTool<F> {
    name: String,
    description: String,
    args: Value,
    f: F,
}

impl<F> FnTool<F>
where
    F: Fn(&Value) -> Result<String> + Send + Sync,
{
    /// Create a tool
    pub fn new(name: impl Into<String>, description: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args: Value::Object(Default::default()),
            f,
        }
    }

    /// Describe the arguments
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&Value) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        self.args.clone()
    }

    async fn call(&self, args: &Value) -> Result<String> {
        (self.f)(args)
    }
}

/// One thought/action/observation cycle
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Step {
    /// Reasoning before acting
    pub thought: String,
    /// Selected tool
    pub tool_name: String,
    /// Arguments passed to the tool
    pub tool_args: Value,
    /// Tool output or error text
    pub observation: String,
}

fn render_trajectory(steps: &[Step]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "[[ ## thought_{i} ## ]]\n{}\n", step.thought);
        let _ = writeln!(out, "[[ ## tool_name_{i} ## ]]\n{}\n", step.tool_name);
        let _ = writeln!(out, "[[ ## tool_args_{i} ## ]]\n{}\n", step.tool_args);
        let _ = writeln!(out, "[[ ## observation_{i} ## ]]\n{}\n", step.observation);
    }
    out
}

/// ReAct module configuration.
#[derive(Clone, Copy, Debug)]
pub struct ReActConfig {
    /// Maximum thought-action-observation cycles
    pub max_iters: usize,
}

impl Default for ReActConfig {
    fn default() -> Self {
        Self { max_iters: 10 }
    }
}

/// ReAct module.
///
/// ## Example
///
/// ```ignore
/// let react = ReAct::new(Signature::parse("question -> answer")?, vec![Arc::new(search)])?;
/// let result = react.forward(&ctx, &inputs).await?;
/// ```
#[derive(Clone)]
pub struct ReAct {
    signature: Signature,
    tools: Vec<Arc<dyn Tool>>,
    react: Predict,
    extract: ChainOfThought,
    config: ReActConfig,
}

impl ReAct {
    /// Build the agent for `signature` with `tools`.
    pub fn new(signature: Signature, tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        if let Some(tool) = tools.iter().find(|t| t.name() == FINISH_TOOL) {
            return Err(Error::signature(format!(
                "tool name {:?} is reserved",
                tool.name()
            )));
        }

        let instructions = Self::agent_instructions(&signature, &tools);
        let mut react_sig = Signature::new(format!("{}ReAct", signature.name), instructions);
        for field in &signature.input_fields {
            react_sig = react_sig.add_input(field.clone())?;
        }
        react_sig = react_sig
            .add_input(InputField::create(TRAJECTORY_FIELD, "Steps taken so far"))?
            .add_output(OutputField::create("next_thought", ""))?
            .add_output(OutputField::create(
                "next_tool_name",
                "Name of the tool to call next",
            ))?
            .add_output(
                OutputField::create("next_tool_args", "Arguments for the tool as a JSON object")
                    .with_kind(FieldKind::Json),
            )?;

        let mut extract_sig = Signature::new(
            format!("{}Extract", signature.name),
            signature.instructions.clone(),
        );
        for field in &signature.input_fields {
            extract_sig = extract_sig.add_input(field.clone())?;
        }
        extract_sig =
            extract_sig.add_input(InputField::create(TRAJECTORY_FIELD, "Steps taken so far"))?;
        for field in &signature.output_fields {
            extract_sig = extract_sig.add_output(field.clone())?;
        }

        Ok(Self {
            react: Predict::new(react_sig),
            extract: ChainOfThought::new(extract_sig)?,
            signature,
            tools,
            config: ReActConfig::default(),
        })
    }

    /// Set the iteration limit
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.config.max_iters = max_iters;
        self
    }

    /// The user-facing signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    fn agent_instructions(signature: &Signature, tools: &[Arc<dyn Tool>]) -> String {
        let quote = |names: Vec<&str>| {
            names
                .iter()
                .map(|n| format!("`{n}`"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let inputs = quote(signature.input_names().collect());
        let outputs = quote(signature.output_names().collect());

        let mut out = String::new();
        if !signature.instructions.trim().is_empty() {
            let _ = writeln!(out, "{}\n", signature.instructions);
        }
        let _ = writeln!(
            out,
            "You are an Agent. In each episode, you will be given the fields {inputs} as input. And you can see your past trajectory so far."
        );
        let _ = writeln!(
            out,
            "Your goal is to use one or more of the supplied tools to collect any necessary information for producing {outputs}.\n"
        );
        out.push_str("To do this, you will interleave next_thought, next_tool_name, and next_tool_args in each turn, and also when finishing the task.\n");
        out.push_str("After each tool call, you receive a resulting observation, which gets appended to your trajectory.\n\n");
        out.push_str("When writing next_thought, you may reason about the current situation and plan for future steps.\n");
        out.push_str("When selecting the next_tool_name and its next_tool_args, the tool must be one of:\n\n");
        for (i, tool) in tools.iter().enumerate() {
            let _ = writeln!(
                out,
                "({}) {}, whose description is <desc>{}</desc>. It takes arguments {} in JSON format.",
                i + 1,
                tool.name(),
                tool.description(),
                tool.args_schema()
            );
        }
        let _ = write!(
            out,
            "({}) {FINISH_TOOL}, whose description is <desc>Marks the task as complete. That is, signals that all information for producing the outputs, i.e. {outputs}, are now available to be extracted.</desc>. It takes arguments {{}} in JSON format.",
            tools.len() + 1
        );
        out
    }

    async fn run_tool(&self, name: &str, args: &Value) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            let known: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
            return format!(
                "Unknown tool {name:?}. Available tools: {}, {FINISH_TOOL}.",
                known.join(", ")
            );
        };
        match tool.call(args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                format!("Execution error in {name}: {e}")
            }
        }
    }
}

#[async_trait]
impl Module for ReAct {
    async fn forward(&self, ctx: &Settings, inputs: &Inputs) -> Result<Prediction> {
        let mut steps: Vec<Step> = Vec::new();
        for iter in 0..self.config.max_iters {
            let step_inputs = inputs
                .clone()
                .with(TRAJECTORY_FIELD, render_trajectory(&steps));
            let decision = match self.react.call(ctx, &step_inputs).await {
                Ok(p) => p,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(iter, error = %e, "agent step failed, ending trajectory");
                    break;
                }
                Err(e) => return Err(e),
            };

            let thought = decision.get_str("next_thought").unwrap_or_default();
            let tool_name = decision
                .get_str("next_tool_name")
                .unwrap_or_default()
                .trim()
                .to_string();
            let tool_args = decision
                .get("next_tool_args")
                .cloned()
                .unwrap_or(Value::Object(Default::default()));

            let finished = tool_name == FINISH_TOOL;
            let observation = if finished {
                "Completed.".to_string()
            } else {
                self.run_tool(&tool_name, &tool_args).await
            };
            tracing::debug!(iter, tool = %tool_name, "agent step");

            steps.push(Step {
                thought,
                tool_name,
                tool_args,
                observation,
            });
            if finished {
                break;
            }
        }

        let extract_inputs = inputs
            .clone()
            .with(TRAJECTORY_FIELD, render_trajectory(&steps));
        let mut prediction = self.extract.forward(ctx, &extract_inputs).await?;
        prediction.insert(TRAJECTORY_FIELD, serde_json::to_value(&steps)?);
        Ok(prediction)
    }

    fn named_predictors(&self) -> Vec<(String, &Predict)> {
        vec![
            ("react".to_string(), &self.react),
            ("extract.predict".to_string(), self.extract.predict()),
        ]
    }

    fn named_predictors_mut(&mut self) -> Vec<(String, &mut Predict)> {
        vec![
            ("react".to_string(), &mut self.react),
            ("extract.predict".to_string(), self.extract.predict_mut()),
        ]
    }

    fn name(&self) -> &str {
        &self.signature.name
    }
}

/// Observations longer than this are cut when shown to the LM.
pub const MAX_OBSERVATION_CHARS: usize = 4000;

/// Render a list of passages as a numbered observation.
pub fn passages_observation(passages: &[String]) -> String {
    let mut out = String::new();
    for (i, p) in passages.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}", i + 1, p);
    }
    let text = out.trim_end();
    if text.chars().count() > MAX_OBSERVATION_CHARS {
        text.chars().take(MAX_OBSERVATION_CHARS).collect()
    } else {
        text.to_string()
    }
}

impl std::fmt::Debug for ReAct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReAct")
            .field("signature", &self.signature.to_string_format())
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            )
            .field("max_iters", &self.config.max_iters)
            .finish()
    }
}

/// Text of a tool argument, accepting a bare string or `{"<key>": "..."}`.
pub fn string_arg(args: &Value, key: &str) -> Option<String> {
    match args {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(key).map(value_to_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_client::{LMRequest, MockLM};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lookup_tool() -> Arc<dyn Tool> {
        Arc::new(
            FnTool::new("lookup", "Look up a capital", |args: &Value| {
                match string_arg(args, "query").as_deref() {
                    Some("France") => Ok("Paris".to_string()),
                    _ => Err(Error::tool("not found")),
                }
            })
            .with_args(serde_json::json!({"query": {"type": "string"}})),
        )
    }

    fn is_extract(req: &LMRequest<'_>) -> bool {
        req.messages[0].content.contains("`reasoning`")
    }

    #[tokio::test]
    async fn test_tool_then_finish_then_extract() {
        let steps = Arc::new(AtomicUsize::new(0));
        let counter = steps.clone();
        let lm = MockLM::new(move |req| {
            if is_extract(req) {
                assert!(req.messages.last().unwrap().content.contains("Paris"));
                return "[[ ## reasoning ## ]]\nFound it.\n\n[[ ## answer ## ]]\nParis".to_string();
            }
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => "[[ ## next_thought ## ]]\nLook it up.\n\n[[ ## next_tool_name ## ]]\nlookup\n\n[[ ## next_tool_args ## ]]\n{\"query\": \"France\"}".to_string(),
                _ => "[[ ## next_thought ## ]]\nDone.\n\n[[ ## next_tool_name ## ]]\nfinish\n\n[[ ## next_tool_args ## ]]\n{}".to_string(),
            }
        });
        let ctx = Settings::new(lm);
        let react = ReAct::new(Signature::parse("question -> answer").unwrap(), vec![lookup_tool()]).unwrap();

        let pred = react
            .forward(&ctx, &Inputs::new().with("question", "Capital of France?"))
            .await
            .unwrap();

        assert_eq!(pred.get_str("answer").as_deref(), Some("Paris"));
        let trajectory = pred.get("trajectory").unwrap().as_array().unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory[0]["observation"], "Paris");
        assert_eq!(steps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_errors_become_observations() {
        let react = ReAct::new(Signature::parse("question -> answer").unwrap(), vec![lookup_tool()]).unwrap();
        let unknown = react.run_tool("calculator", &Value::Null).await;
        assert!(unknown.starts_with("Unknown tool \"calculator\""));
        let failed = react
            .run_tool("lookup", &serde_json::json!({"query": "Atlantis"}))
            .await;
        assert!(failed.contains("Execution error in lookup"));
    }

    #[tokio::test]
    async fn test_max_iters_bounds_loop() {
        let lm = MockLM::new(|req| {
            if is_extract(req) {
                "[[ ## reasoning ## ]]\n-\n\n[[ ## answer ## ]]\nunknown".to_string()
            } else {
                "[[ ## next_thought ## ]]\nagain\n\n[[ ## next_tool_name ## ]]\nlookup\n\n[[ ## next_tool_args ## ]]\n{\"query\": \"x\"}".to_string()
            }
        });
        let ctx = Settings::new(lm);
        let react = ReAct::new(Signature::parse("question -> answer").unwrap(), vec![lookup_tool()])
            .unwrap()
            .with_max_iters(3);
        let pred = react
            .forward(&ctx, &Inputs::new().with("question", "?"))
            .await
            .unwrap();
        assert_eq!(pred.get("trajectory").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_finish_name_reserved() {
        let finish: Arc<dyn Tool> = Arc::new(FnTool::new("finish", "", |_: &Value| Ok(String::new())));
        assert!(ReAct::new(Signature::parse("q -> a").unwrap(), vec![finish]).is_err());
    }

    #[test]
    fn test_passages_observation() {
        let text = passages_observation(&["A".to_string(), "B".to_string()]);
        assert_eq!(text, "[1] A\n[2] B");
    }
}
