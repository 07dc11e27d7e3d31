//! Lexical vector adapter (toy vector spaces and spaCy-style vector tables).

use crate::params::check_keys;
use crate::{
    Backend, Embedder, EmbeddingError, EmbeddingResult, Language, ParamValue, Params, Resource,
    Source, VectorTable,
};
use std::sync::Arc;

/// Embeds text as the mean of its token vectors.
#[derive(Debug, Clone)]
pub struct VectorBackend {
    nlp: Arc<VectorTable>,
}

/// Adapter over a [`VectorTable`].
///
/// # Example
///
/// ```rust
/// use langvec_embeddings::{TextInput, Transformer, VectorLanguage, VectorTable};
/// use std::sync::Arc;
///
/// let table = VectorTable::from_pairs(vec![
///     ("red", vec![1.0, 0.0]),
///     ("green", vec![0.5, 0.5]),
///     ("blue", vec![0.0, 1.0]),
/// ]).unwrap();
/// let mut lang = VectorLanguage::new(Arc::new(table)).unwrap();
///
/// let x = ["red", "green"];
/// let m = lang.fit(&TextInput::from(&x)).unwrap().transform(&TextInput::from(&x)).unwrap();
/// assert_eq!(m.shape(), &[2, 2]);
/// ```
pub type VectorLanguage = Language<VectorBackend>;

impl Language<VectorBackend> {
    /// Resolve `nlp` (a handle, path or model name) into a ready adapter.
    pub fn new(nlp: impl Into<Source<VectorTable>>) -> EmbeddingResult<Self> {
        let nlp = nlp.into().resolve()?;
        Ok(Language::from_backend(VectorBackend { nlp }))
    }

    pub fn table(&self) -> &Arc<VectorTable> {
        &self.backend().nlp
    }
}

impl Backend for VectorBackend {
    fn name(&self) -> &str {
        "VectorLanguage"
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.nlp.dimension())
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.nlp.embed(text)
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert(
            "nlp".to_string(),
            ParamValue::Resource(Resource::Vectors(self.nlp.clone())),
        );
        params
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        check_keys(self.name(), &params, &["nlp"])?;
        if let Some(value) = params.get("nlp") {
            self.nlp = vectors_param("nlp", value)?;
        }
        Ok(())
    }
}

/// Extract a vector-table handle from a parameter value.
pub(crate) fn vectors_param(key: &str, value: &ParamValue) -> EmbeddingResult<Arc<VectorTable>> {
    match value {
        ParamValue::Resource(Resource::Vectors(table)) => Ok(table.clone()),
        other => Err(EmbeddingError::InvalidParameter(format!(
            "{} expects a vector table, got {:?}",
            key, other
        ))),
    }
}
