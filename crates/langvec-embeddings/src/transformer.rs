//! The fit/transform estimator contract.

use crate::{EmbeddingResult, Params, TextInput};
use ndarray::Array2;

/// A pipeline stage that turns a batch of strings into a dense matrix.
///
/// Every implementor has two states, unfitted and fitted. `transform` is
/// only allowed once `fit` has succeeded, and its output always has one row
/// per input string and a column count fixed for the fitted instance.
pub trait Transformer {
    /// Short identifier used in errors and logs.
    fn name(&self) -> &str;

    /// Object-safe form of [`Transformer::fit`].
    fn learn(&mut self, x: &TextInput<'_>) -> EmbeddingResult<()>;

    /// Embed every string in `x`, producing an `(n, d)` matrix.
    fn transform(&self, x: &TextInput<'_>) -> EmbeddingResult<Array2<f32>>;

    fn is_fitted(&self) -> bool;

    /// Output width, when known.
    fn dimension(&self) -> Option<usize>;

    /// Constructor parameters. `deep` adds nested `stage__param` entries
    /// for composite transformers.
    fn get_params(&self, deep: bool) -> Params;

    /// Object-safe form of [`Transformer::set_params`].
    ///
    /// On success the transformer is reset to the unfitted state.
    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()>;

    /// Fit on `x` and return `self` for chaining.
    fn fit(&mut self, x: &TextInput<'_>) -> EmbeddingResult<&mut Self>
    where
        Self: Sized,
    {
        self.learn(x)?;
        Ok(self)
    }

    /// `fit` followed by `transform` on the same input.
    fn fit_transform(&mut self, x: &TextInput<'_>) -> EmbeddingResult<Array2<f32>> {
        self.learn(x)?;
        self.transform(x)
    }

    fn set_params(&mut self, params: Params) -> EmbeddingResult<&mut Self>
    where
        Self: Sized,
    {
        self.apply_params(params)?;
        Ok(self)
    }
}

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn learn(&mut self, x: &TextInput<'_>) -> EmbeddingResult<()> {
        (**self).learn(x)
    }

    fn transform(&self, x: &TextInput<'_>) -> EmbeddingResult<Array2<f32>> {
        (**self).transform(x)
    }

    fn is_fitted(&self) -> bool {
        (**self).is_fitted()
    }

    fn dimension(&self) -> Option<usize> {
        (**self).dimension()
    }

    fn get_params(&self, deep: bool) -> Params {
        (**self).get_params(deep)
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        (**self).apply_params(params)
    }

    fn fit_transform(&mut self, x: &TextInput<'_>) -> EmbeddingResult<Array2<f32>> {
        (**self).fit_transform(x)
    }
}
