//! Error types for embedding adapters.

use thiserror::Error;

/// Embedding error types.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The backend resource could not be loaded.
    #[error("Resource error: {0}")]
    Resource(String),

    /// Input was not a 1-D sequence of strings.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// `transform` was called before `fit`.
    #[error("Not fitted: {0}")]
    NotFitted(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbeddingError {
    /// Build a `NotFitted` error for the named adapter.
    pub fn not_fitted(name: &str) -> Self {
        EmbeddingError::NotFitted(format!(
            "This {} instance is not fitted yet. Call `fit` before `transform`.",
            name
        ))
    }
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
