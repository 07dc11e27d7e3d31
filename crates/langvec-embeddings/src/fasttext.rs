//! fastText adapter.

use crate::params::check_keys;
use crate::{
    Backend, EmbeddingError, EmbeddingResult, Language, ParamValue, Params, Resource, Source,
    SubwordModel,
};
use std::sync::Arc;

/// Sentence vectors from a [`SubwordModel`]. Out-of-vocabulary words are
/// composed from their character n-grams; empty text maps to zeros.
#[derive(Debug, Clone)]
pub struct FasttextBackend {
    model: Arc<SubwordModel>,
}

pub type FasttextLanguage = Language<FasttextBackend>;

impl Language<FasttextBackend> {
    /// Resolve a model handle or a path to a `.bin` file.
    pub fn new(model: impl Into<Source<SubwordModel>>) -> EmbeddingResult<Self> {
        let model = model.into().resolve()?;
        Ok(Language::from_backend(FasttextBackend { model }))
    }

    pub fn model(&self) -> &Arc<SubwordModel> {
        &self.backend().model
    }
}

impl Backend for FasttextBackend {
    fn name(&self) -> &str {
        "FasttextLanguage"
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.model.dim())
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.model.sentence_vector(text))
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert(
            "model".to_string(),
            ParamValue::Resource(Resource::Subwords(self.model.clone())),
        );
        params
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        check_keys(self.name(), &params, &["model"])?;
        match params.get("model") {
            Some(ParamValue::Resource(Resource::Subwords(model))) => {
                self.model = model.clone();
                Ok(())
            }
            Some(other) => Err(EmbeddingError::InvalidParameter(format!(
                "model expects a fastText model, got {:?}",
                other
            ))),
            None => Ok(()),
        }
    }
}
