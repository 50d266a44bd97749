//! Error types for the docgraph pipeline.
//!
//! This module defines a unified error enum covering every failure category
//! in the application: document parsing, vector store dimension conflicts,
//! external provider failures, cancellation, and startup configuration.

use thiserror::Error;

/// Unified error type for docgraph.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed input document beyond recovery. Local, non-retryable.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Vector length conflicts with an index's fixed dimension.
    /// A configuration/programmer error — fatal, never retried, and never
    /// papered over by truncation or padding.
    #[error("Dimension mismatch on index '{index}': expected {expected}, got {actual}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    /// Transient failure from the embedding provider. The orchestration
    /// layer decides retry policy; adapters only report.
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// Transient failure from the chat/completion provider.
    #[error("Completion provider error: {0}")]
    CompletionProvider(String),

    /// Caller-requested abort or elapsed query deadline.
    /// A normal outcome, not a defect — callers must not receive partial
    /// results alongside it.
    #[error("Operation cancelled")]
    Cancelled,

    /// Missing or invalid startup configuration. The process does not start.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vector store persistence failures.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
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

impl AppError {
    /// Whether the orchestration layer may retry the failed operation.
    ///
    /// Only external provider failures are transient; everything else is
    /// either a hard error or a deliberate outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingProvider(_) | AppError::CompletionProvider(_)
        )
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
