//! sense2vec adapter: vectors keyed by `phrase|SENSE`.

use crate::params::check_keys;
use crate::vectors::vectors_param;
use crate::{
    Backend, EmbeddingResult, Language, ParamValue, Params, Resource, Source, VectorTable,
};
use std::collections::HashMap;
use std::sync::Arc;

const SENSE_SEP: char = '|';

/// Direct key lookup over a sense-tagged vector table.
///
/// Queries may carry an explicit sense (`duck|NOUN`) or just a phrase
/// (`duck`), in which case the first sense of that phrase in table order is
/// used. sense2vec tables are stored most-frequent first, so that is the
/// dominant sense. Unknown keys map to the zero vector.
#[derive(Debug, Clone)]
pub struct Sense2VecBackend {
    s2v: Arc<VectorTable>,
    best_sense: HashMap<String, String>,
}

pub type Sense2VecLanguage = Language<Sense2VecBackend>;

impl Language<Sense2VecBackend> {
    pub fn new(s2v: impl Into<Source<VectorTable>>) -> EmbeddingResult<Self> {
        let s2v = s2v.into().resolve()?;
        Ok(Language::from_backend(Sense2VecBackend::with_table(s2v)))
    }
}

impl Sense2VecBackend {
    fn with_table(s2v: Arc<VectorTable>) -> Self {
        let mut best_sense = HashMap::new();
        for key in s2v.keys() {
            if let Some((phrase, _)) = key.rsplit_once(SENSE_SEP) {
                best_sense
                    .entry(phrase.to_string())
                    .or_insert_with(|| key.clone());
            }
        }
        Self { s2v, best_sense }
    }

    /// Resolve a query to a table key, if any form of it is present.
    pub fn resolve_key(&self, query: &str) -> Option<String> {
        let (phrase, sense) = match query.trim().rsplit_once(SENSE_SEP) {
            Some((phrase, sense)) => (phrase_key(phrase), Some(sense)),
            None => (phrase_key(query), None),
        };

        let candidates = [phrase.clone(), phrase.to_lowercase()];
        for candidate in candidates.iter() {
            let key = match sense {
                Some(sense) => Some(format!("{}{}{}", candidate, SENSE_SEP, sense)),
                None => self.best_sense.get(candidate).cloned(),
            };
            if let Some(key) = key.filter(|k| self.s2v.contains(k)) {
                return Some(key);
            }
        }
        None
    }
}

/// Phrases are stored with underscores between words.
fn phrase_key(phrase: &str) -> String {
    phrase.split_whitespace().collect::<Vec<_>>().join("_")
}

impl Backend for Sense2VecBackend {
    fn name(&self) -> &str {
        "Sense2VecLanguage"
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.s2v.dimension())
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self
            .resolve_key(text)
            .and_then(|key| self.s2v.get(&key).map(|v| v.to_vec()))
            .unwrap_or_else(|| vec![0.0; self.s2v.dimension()]))
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert(
            "s2v".to_string(),
            ParamValue::Resource(Resource::Vectors(self.s2v.clone())),
        );
        params
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        check_keys(self.name(), &params, &["s2v"])?;
        if let Some(value) = params.get("s2v") {
            *self = Self::with_table(vectors_param("s2v", value)?);
        }
        Ok(())
    }
}
