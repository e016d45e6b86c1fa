use thiserror::Error;

use crate::llm::LlmError;

/// Errors from vector index operations (used by trait definitions in memoria-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("vector store connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt payload for point {id}: {reason}")]
    CorruptPayload { id: String, reason: String },
}

/// Errors from embedding generation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model error: {0}")]
    Model(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding model returned no vectors")]
    Empty,
}

/// Component-level error for the memory pipeline.
///
/// Every `try_*` method returns this. The non-`try` facades log it and
/// degrade to an empty or no-op result.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("malformed model output: {0}")]
    Parse(String),

    #[error("unknown merge event: '{0}'")]
    UnknownEvent(String),
}
