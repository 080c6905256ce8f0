//! Error types for the docquery engine.
//!
//! This module defines a unified error enum covering the error categories
//! of the system: configuration, I/O, embedding backends, the vector
//! index, the answer-generation LLM, and serialization.

use thiserror::Error;

/// Unified error type for the docquery engine.
///
/// All fallible functions return `Result<T, AppError>`. Recoverable
/// backend conditions are explicit variants so callers can tell
/// "backend errored" apart from "nothing matched" and still apply the
/// degraded-fallback policy.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding backend errors (timeouts, quota, malformed input)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Answer-generation LLM errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
