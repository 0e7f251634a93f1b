//! Error types for genforge operations.
//!
//! Defines per-subsystem error types:
//! - Function-signature parsing
//! - LLM completion-provider interactions
//! - Test-validator interactions
//! - Top-level engine errors surfaced to the generation loop

use thiserror::Error;

/// Errors raised while parsing a function signature into a [`crate::model::FunctionUnderTest`].
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature '{0}' does not match the expected `[class ]path(params)[ async]` form")]
    InvalidSignature(String),
}

/// Errors that can occur while talking to a completion provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API base URL: GENFORGE_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("failed to parse completion response: {0}")]
    ParseError(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while validating a candidate test.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("failed to prepare validation workspace: {0}")]
    WorkspaceSetup(String),

    #[error("validator process failed to start: {0}")]
    SpawnFailed(String),

    #[error("validator timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level engine error, surfaced only at function granularity (spec.md §7:
/// an invalid signature is fatal for that function but never aborts the run).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Validator(#[from] ValidatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}
