//! A featurizer followed by a classifier.

use crate::classifier::check_labels;
use crate::routing::{check_stage_name, names_param, prefixed, route_params};
use crate::{Classifier, PipelineError, PipelineResult};
use langvec_embeddings::{Params, TextInput, Transformer};
use tracing::debug;

const STEPS_KEY: &str = "steps";

/// Text in, labels out: embeds the input with a named featurizer and feeds
/// the matrix to a named classifier.
///
/// ```rust
/// use langvec_embeddings::{CountVectorLanguage, TextInput};
/// use langvec_pipeline::{LogisticRegression, Pipeline};
///
/// let mut pipe = Pipeline::new(
///     "embed",
///     CountVectorLanguage::bag_of_words(),
///     "model",
///     LogisticRegression::new(),
/// )
/// .unwrap();
///
/// let docs = ["good movie", "great movie", "bad movie", "awful movie"];
/// pipe.fit(&TextInput::from(&docs), &[1, 1, 0, 0]).unwrap();
/// assert_eq!(pipe.predict(&TextInput::from(&docs)).unwrap().len(), 4);
/// ```
pub struct Pipeline {
    featurizer: (String, Box<dyn Transformer>),
    classifier: (String, Box<dyn Classifier>),
}

impl Pipeline {
    pub fn new(
        featurizer_name: &str,
        featurizer: impl Transformer + 'static,
        classifier_name: &str,
        classifier: impl Classifier + 'static,
    ) -> PipelineResult<Self> {
        check_stage_name("Pipeline", featurizer_name, &[]).map_err(PipelineError::param)?;
        check_stage_name("Pipeline", classifier_name, &[featurizer_name])
            .map_err(PipelineError::param)?;
        Ok(Self {
            featurizer: (featurizer_name.to_string(), Box::new(featurizer)),
            classifier: (classifier_name.to_string(), Box::new(classifier)),
        })
    }

    pub fn featurizer(&self) -> &dyn Transformer {
        self.featurizer.1.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.1.as_ref()
    }

    fn step_names(&self) -> [&str; 2] {
        [self.featurizer.0.as_str(), self.classifier.0.as_str()]
    }

    /// Fit the featurizer on `x`, then the classifier on its output.
    ///
    /// Labels are checked before either step is touched, so a rejected
    /// call leaves a previous fit in place.
    pub fn fit(&mut self, x: &TextInput<'_>, y: &[i64]) -> PipelineResult<&mut Self> {
        check_labels(x.column()?.len(), y)?;
        let features = self.featurizer.1.fit_transform(x)?;
        debug!(
            featurizer = self.featurizer.0.as_str(),
            rows = features.nrows(),
            cols = features.ncols(),
            "featurized training data"
        );
        self.classifier.1.fit(features.view(), y)?;
        Ok(self)
    }

    /// One label per input string.
    pub fn predict(&self, x: &TextInput<'_>) -> PipelineResult<Vec<i64>> {
        let features = self.featurizer.1.transform(x)?;
        self.classifier.1.predict(features.view())
    }

    pub fn is_fitted(&self) -> bool {
        self.featurizer.1.is_fitted() && self.classifier.1.is_fitted()
    }

    /// Step names under `steps`; with `deep`, every step's own params
    /// prefixed by `<step>__`.
    pub fn get_params(&self, deep: bool) -> Params {
        let mut params = Params::new();
        params.insert(STEPS_KEY.to_string(), names_param(&self.step_names()));
        if deep {
            prefixed(
                &mut params,
                &self.featurizer.0,
                self.featurizer.1.get_params(true),
            );
            prefixed(&mut params, &self.classifier.0, self.classifier.1.get_params());
        }
        params
    }

    /// Route `<step>__<param>` entries to their step. Both steps are reset
    /// to unfitted when they receive params.
    pub fn set_params(&mut self, params: Params) -> PipelineResult<&mut Self> {
        let mut routed = route_params("Pipeline", STEPS_KEY, &self.step_names(), params)
            .map_err(PipelineError::param)?;
        if let Some(p) = routed.remove(&self.featurizer.0) {
            self.featurizer.1.apply_params(p)?;
        }
        if let Some(p) = routed.remove(&self.classifier.0) {
            self.classifier.1.apply_params(p)?;
        }
        Ok(self)
    }
}
