//! Error types for DeepSearch.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, provider failures (LLM, embedding,
//! vector index), argument validation, prompts, and cancellation.

use thiserror::Error;

/// Unified error type for DeepSearch.
///
/// All functions in the workspace return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller input, rejected before any external call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Language model provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// Document loading and collection management errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The consumer of a streaming search went away
    #[error("Search cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error originated in an external adapter
    /// (language model, embedding provider or vector index).
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_) | AppError::Embedding(_) | AppError::VectorIndex(_)
        )
    }
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
