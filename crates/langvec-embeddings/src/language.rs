//! The generic embedding adapter.
//!
//! [`Language`] holds one backend plus the fitted flag and implements the
//! [`Transformer`] contract once for every backend kind. Backends only
//! decide how a single string becomes a vector.

use crate::embedder::stack_rows;
use crate::{EmbeddingError, EmbeddingResult, Params, TextInput, Transformer};
use ndarray::Array2;
use tracing::debug;

/// Per-backend hooks used by [`Language`].
pub trait Backend {
    /// Adapter name used in errors and logs.
    fn name(&self) -> &str;

    /// Fit-time warm-up. Lookup backends have nothing to learn.
    fn learn(&mut self, _texts: &[&str]) -> EmbeddingResult<()> {
        Ok(())
    }

    /// Output width, if known before fitting.
    fn dimension(&self) -> Option<usize>;

    /// Vector for one string, applying the backend's out-of-vocabulary
    /// fallback instead of failing.
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    fn params(&self) -> Params;

    /// Replace the backend's configuration. Must leave `self` untouched
    /// when it fails.
    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()>;
}

/// An embedding adapter: a backend behind the fit/transform contract.
#[derive(Debug, Clone)]
pub struct Language<B> {
    backend: B,
    fitted: bool,
}

impl<B: Backend> Language<B> {
    /// Wrap a ready backend. The adapter starts unfitted.
    pub fn from_backend(backend: B) -> Self {
        Self {
            backend,
            fitted: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: Backend> Transformer for Language<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn learn(&mut self, x: &TextInput<'_>) -> EmbeddingResult<()> {
        let texts = x.column()?;
        self.backend.learn(texts)?;
        self.fitted = true;
        debug!(
            adapter = self.backend.name(),
            samples = texts.len(),
            dimension = ?self.backend.dimension(),
            "fitted"
        );
        Ok(())
    }

    fn transform(&self, x: &TextInput<'_>) -> EmbeddingResult<Array2<f32>> {
        if !self.fitted {
            return Err(EmbeddingError::not_fitted(self.backend.name()));
        }
        let texts = x.column()?;
        let dim = self
            .backend
            .dimension()
            .ok_or_else(|| EmbeddingError::not_fitted(self.backend.name()))?;
        let rows = texts
            .iter()
            .map(|t| self.backend.embed(t))
            .collect::<EmbeddingResult<Vec<_>>>()?;
        debug!(adapter = self.backend.name(), rows = rows.len(), dim, "transformed");
        stack_rows(rows, dim)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn dimension(&self) -> Option<usize> {
        self.backend.dimension()
    }

    fn get_params(&self, _deep: bool) -> Params {
        self.backend.params()
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        self.backend.apply_params(params)?;
        self.fitted = false;
        Ok(())
    }
}
