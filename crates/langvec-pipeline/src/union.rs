//! Column-wise concatenation of several featurizers.

use crate::routing::{check_stage_name, names_param, prefixed, route_params};
use langvec_embeddings::{EmbeddingError, EmbeddingResult, Params, TextInput, Transformer};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use tracing::debug;

const STAGES_KEY: &str = "stages";

/// Runs every stage on the same input and concatenates their outputs.
///
/// ```rust
/// use langvec_embeddings::{CountVectorLanguage, TextInput, Transformer};
/// use langvec_pipeline::FeatureUnion;
///
/// let mut union = FeatureUnion::new()
///     .with("words", CountVectorLanguage::bag_of_words()).unwrap()
///     .with("chars", CountVectorLanguage::new(2).unwrap()).unwrap();
///
/// let docs = ["red apple", "green apple", "blue sky"];
/// let m = union.fit_transform(&TextInput::from(&docs)).unwrap();
/// assert_eq!(m.nrows(), 3);
/// ```
#[derive(Default)]
pub struct FeatureUnion {
    stages: Vec<(String, Box<dyn Transformer>)>,
}

impl FeatureUnion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named stage.
    pub fn with(mut self, name: &str, stage: impl Transformer + 'static) -> EmbeddingResult<Self> {
        self.push(name, Box::new(stage))?;
        Ok(self)
    }

    pub fn push(&mut self, name: &str, stage: Box<dyn Transformer>) -> EmbeddingResult<()> {
        check_stage_name(self.name(), name, &self.stage_names())?;
        self.stages.push((name.to_string(), stage));
        Ok(())
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn stage(&self, name: &str) -> Option<&dyn Transformer> {
        self.stages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_ref())
    }

    fn ensure_stages(&self) -> EmbeddingResult<()> {
        if self.stages.is_empty() {
            return Err(EmbeddingError::InvalidParameter(
                "FeatureUnion has no stages".to_string(),
            ));
        }
        Ok(())
    }
}

impl Transformer for FeatureUnion {
    fn name(&self) -> &str {
        "FeatureUnion"
    }

    fn learn(&mut self, x: &TextInput<'_>) -> EmbeddingResult<()> {
        self.ensure_stages()?;
        x.column()?;
        for (name, stage) in &mut self.stages {
            debug!(stage = name.as_str(), "fitting union stage");
            stage.learn(x)?;
        }
        Ok(())
    }

    fn transform(&self, x: &TextInput<'_>) -> EmbeddingResult<Array2<f32>> {
        self.ensure_stages()?;
        if !self.is_fitted() {
            return Err(EmbeddingError::not_fitted(self.name()));
        }
        let blocks = self
            .stages
            .iter()
            .map(|(_, stage)| stage.transform(x))
            .collect::<EmbeddingResult<Vec<_>>>()?;
        let views: Vec<ArrayView2<'_, f32>> = blocks.iter().map(|b| b.view()).collect();
        let joined = concatenate(Axis(1), &views)?;
        debug!(rows = joined.nrows(), cols = joined.ncols(), "transformed union");
        Ok(joined)
    }

    fn is_fitted(&self) -> bool {
        !self.stages.is_empty() && self.stages.iter().all(|(_, s)| s.is_fitted())
    }

    /// Sum of the stage widths, once every stage knows its own.
    fn dimension(&self) -> Option<usize> {
        if self.stages.is_empty() {
            return None;
        }
        self.stages.iter().map(|(_, s)| s.dimension()).sum()
    }

    fn get_params(&self, deep: bool) -> Params {
        let mut params = Params::new();
        params.insert(STAGES_KEY.to_string(), names_param(&self.stage_names()));
        if deep {
            for (name, stage) in &self.stages {
                prefixed(&mut params, name, stage.get_params(true));
            }
        }
        params
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        let mut routed = route_params(self.name(), STAGES_KEY, &self.stage_names(), params)?;
        for (name, stage) in &mut self.stages {
            if let Some(stage_params) = routed.remove(name.as_str()) {
                stage.apply_params(stage_params)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use langvec_embeddings::{CountVectorLanguage, ParamValue, VectorLanguage, VectorTable};
    use std::sync::Arc;

    fn colors() -> VectorLanguage {
        let table = VectorTable::from_pairs(vec![
            ("red", vec![1.0, 0.0]),
            ("green", vec![0.0, 1.0]),
        ])
        .unwrap();
        VectorLanguage::new(Arc::new(table)).unwrap()
    }

    #[test]
    fn concatenates_stage_outputs() {
        let mut union = FeatureUnion::new()
            .with("colors", colors())
            .unwrap()
            .with("words", CountVectorLanguage::bag_of_words())
            .unwrap();
        let docs = ["red car", "green car", "red green"];
        let m = union.fit_transform(&TextInput::from(&docs)).unwrap();

        // colors: 2 columns, words: car/green/red
        assert_eq!(m.shape(), &[3, 5]);
        assert_eq!(union.dimension(), Some(5));
        assert_eq!(m.row(0).to_vec(), vec![0.5, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(m.row(2).to_vec(), vec![0.5, 0.5, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_union_is_invalid() {
        let mut union = FeatureUnion::new();
        assert!(matches!(
            union.fit(&TextInput::from(&["red"])),
            Err(EmbeddingError::InvalidParameter(_))
        ));
        assert!(!union.is_fitted());
    }

    #[test]
    fn unfitted_union_refuses_transform() {
        let union = FeatureUnion::new().with("colors", colors()).unwrap();
        assert!(matches!(
            union.transform(&TextInput::from(&["red"])),
            Err(EmbeddingError::NotFitted(_))
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let union = FeatureUnion::new().with("colors", colors()).unwrap();
        assert!(union.with("colors", colors()).is_err());
    }

    #[test]
    fn routes_nested_params() {
        let mut union = FeatureUnion::new()
            .with("words", CountVectorLanguage::bag_of_words())
            .unwrap();
        let deep = union.get_params(true);
        assert!(deep.contains_key("stages"));
        assert!(deep.contains_key("words__binary"));
        assert_eq!(union.get_params(false).len(), 1);

        let mut params = Params::new();
        params.insert("words__binary".into(), true.into());
        union.set_params(params).unwrap();
        assert_eq!(union.get_params(true)["words__binary"], ParamValue::from(true));

        let mut bad = Params::new();
        bad.insert("chars__binary".into(), true.into());
        assert!(union.set_params(bad).is_err());
    }
}
