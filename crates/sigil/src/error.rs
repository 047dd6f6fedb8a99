// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Error types for Sigil

use thiserror::Error;

/// Result type alias for Sigil operations
pub type Result<T> = core::result::Result<T, Error>;

/// Main error type for Sigil library
#[derive(Error, Debug)]
pub enum Error {
    /// Signature-related errors
    #[error("Signature error: {0}")]
    Signature(String),

    /// Field-related errors
    #[error("Field error: {0}")]
    Field(String),

    /// Module execution errors
    #[error("Module error: {0}")]
    Module(String),

    /// Prediction errors
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// LM output could not be parsed into the signature's outputs
    #[error("Parse error: {0}")]
    Parse(String),

    /// LM client failure
    #[error("LM error: {0}")]
    Lm(String),

    /// Tool invocation failure
    #[error("Tool error: {0}")]
    Tool(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Optimizer could not produce a program
    #[error("Optimization failed: {0}")]
    Optimization(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a signature error
    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }

    /// Create a field error
    pub fn field(msg: impl Into<String>) -> Self {
        Self::Field(msg.into())
    }

    /// Create a module error
    pub fn module(msg: impl Into<String>) -> Self {
        Self::Module(msg.into())
    }

    /// Create a prediction error
    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::Prediction(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Create an optimization error
    pub fn optimization(msg: impl Into<String>) -> Self {
        Self::Optimization(msg.into())
    }

    /// Wrap an error coming out of the LM client.
    ///
    /// The full context chain is kept in the message.
    pub fn lm(err: anyhow::Error) -> Self {
        Self::Lm(format!("{err:#}"))
    }

    /// Whether a retry with a different sample could succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Lm(_) | Self::Tool(_))
    }

    /// Get the error category for logging/metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Signature(_) => "signature",
            Self::Field(_) => "field",
            Self::Module(_) => "module",
            Self::Prediction(_) => "prediction",
            Self::Parse(_) => "parse",
            Self::Lm(_) => "lm",
            Self::Tool(_) => "tool",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Optimization(_) => "optimization",
            Self::Other(_) => "other",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::lm(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_signature() {
        let err = Error::signature("invalid format");
        assert!(matches!(err, Error::Signature(_)));
        assert_eq!(err.to_string(), "Signature error: invalid format");
    }

    #[test]
    fn test_error_field() {
        let err = Error::field("missing field");
        assert_eq!(err.to_string(), "Field error: missing field");
    }

    #[test]
    fn test_lm_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("HTTP 503").context("LM call to gpt-4o failed");
        let err: Error = inner.into();
        assert_eq!(err.to_string(), "LM error: LM call to gpt-4o failed: HTTP 503");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_result_type() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<i32> = Err(Error::Other("failed".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::signature("x").category(), "signature");
        assert_eq!(Error::field("x").category(), "field");
        assert_eq!(Error::module("x").category(), "module");
        assert_eq!(Error::prediction("x").category(), "prediction");
        assert_eq!(Error::parse("x").category(), "parse");
        assert_eq!(Error::tool("x").category(), "tool");
        assert_eq!(Error::optimization("x").category(), "optimization");
        assert_eq!(Error::Other("x".to_string()).category(), "other");
    }
}
