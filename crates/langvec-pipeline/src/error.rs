//! Error types for pipelines and classifiers.

use langvec_embeddings::EmbeddingError;
use thiserror::Error;

/// Pipeline error types.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A featurizer stage failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Not fitted: {0}")]
    NotFitted(String),

    #[error("Got {samples} samples but {labels} labels")]
    LabelMismatch { samples: usize, labels: usize },

    /// Training labels contain fewer than two distinct classes.
    #[error("Need samples of at least two classes, got {0}")]
    SingleClass(usize),

    #[error("Feature dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Lift a parameter error raised by the shared param helpers.
    pub(crate) fn param(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::InvalidParameter(msg) => PipelineError::InvalidParameter(msg),
            other => PipelineError::Embedding(other),
        }
    }
}
