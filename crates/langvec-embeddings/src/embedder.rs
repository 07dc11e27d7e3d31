//! Resource-level embedding trait and matrix assembly.

use crate::{EmbeddingError, EmbeddingResult};
use ndarray::Array2;

/// A loaded embedding source that maps one string to one vector.
///
/// Implemented by the shared backend resources (vector tables, subword
/// models, BPE embeddings). Out-of-vocabulary input never fails: each
/// implementor documents its own fallback vector.
pub trait Embedder: Send + Sync {
    /// Embed a single text string.
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}

/// Stack per-row vectors into an `(n, dim)` matrix.
///
/// Every row must have exactly `dim` entries; nothing is returned otherwise.
pub fn stack_rows(rows: Vec<Vec<f32>>, dim: usize) -> EmbeddingResult<Array2<f32>> {
    let n = rows.len();
    let mut flat = Vec::with_capacity(n * dim);
    for row in rows {
        if row.len() != dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dim,
                got: row.len(),
            });
        }
        flat.extend(row);
    }
    Ok(Array2::from_shape_vec((n, dim), flat)?)
}
