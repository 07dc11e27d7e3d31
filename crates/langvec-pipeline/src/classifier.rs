//! Classifiers that consume embedding matrices.

use crate::{PipelineError, PipelineResult};
use langvec_embeddings::{check_keys, value_param, ParamValue, Params};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A supervised model over dense feature rows.
pub trait Classifier {
    fn name(&self) -> &str;

    /// Fit on `x` (one row per sample) with one label per row.
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[i64]) -> PipelineResult<()>;

    /// One predicted label per row of `x`.
    fn predict(&self, x: ArrayView2<'_, f32>) -> PipelineResult<Vec<i64>>;

    fn is_fitted(&self) -> bool;

    fn get_params(&self) -> Params;

    /// Replace the configuration and drop any fitted state.
    fn apply_params(&mut self, params: Params) -> PipelineResult<()>;
}

impl<T: Classifier + ?Sized> Classifier for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[i64]) -> PipelineResult<()> {
        (**self).fit(x, y)
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> PipelineResult<Vec<i64>> {
        (**self).predict(x)
    }

    fn is_fitted(&self) -> bool {
        (**self).is_fitted()
    }

    fn get_params(&self) -> Params {
        (**self).get_params()
    }

    fn apply_params(&mut self, params: Params) -> PipelineResult<()> {
        (**self).apply_params(params)
    }
}

/// Hyperparameters of [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticRegressionConfig {
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub fit_intercept: bool,
    /// Training stops once every gradient component is below this.
    pub tol: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.1,
            fit_intercept: true,
            tol: 1e-6,
        }
    }
}

impl LogisticRegressionConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "c must be positive, got {}",
                self.c
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_iter == 0 {
            return Err(PipelineError::InvalidParameter(
                "max_iter must be at least 1".to_string(),
            ));
        }
        if self.tol.is_nan() || self.tol < 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// One binary logistic model.
#[derive(Debug, Clone, PartialEq)]
struct BinaryModel {
    weights: Array1<f64>,
    bias: f64,
}

impl BinaryModel {
    /// Decision value for every row of `x`.
    fn decision(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.bias
    }

    /// Batch gradient descent on the mean log loss plus `|w|² / (2·c·n)`.
    ///
    /// Returns the model and whether it converged within `max_iter`.
    fn train(x: &Array2<f64>, targets: &Array1<f64>, config: &LogisticRegressionConfig) -> (Self, bool) {
        let n = x.nrows() as f64;
        let penalty = 1.0 / (config.c * n);
        let mut model = Self {
            weights: Array1::zeros(x.ncols()),
            bias: 0.0,
        };

        for _ in 0..config.max_iter {
            let error = model.decision(x).mapv(sigmoid) - targets;
            let grad_w = x.t().dot(&error) / n + &model.weights * penalty;
            let grad_b = error.sum() / n;

            let mut largest = grad_w.fold(0.0f64, |m, g| m.max(g.abs()));
            if config.fit_intercept {
                largest = largest.max(grad_b.abs());
            }
            if largest < config.tol {
                return (model, true);
            }

            model.weights.scaled_add(-config.learning_rate, &grad_w);
            if config.fit_intercept {
                model.bias -= config.learning_rate * grad_b;
            }
        }
        (model, false)
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<i64>,
    /// One model for two classes (scoring `classes[1]`), otherwise one
    /// model per class.
    models: Vec<BinaryModel>,
    width: usize,
}

/// L2-regularized logistic regression, one-vs-rest for more than two
/// classes.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    fitted: Option<Fitted>,
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LogisticRegressionConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    pub fn config(&self) -> &LogisticRegressionConfig {
        &self.config
    }

    /// Sorted class labels seen during fit.
    pub fn classes(&self) -> Option<&[i64]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn fitted(&self) -> PipelineResult<&Fitted> {
        self.fitted.as_ref().ok_or_else(|| {
            PipelineError::NotFitted(format!(
                "This {} instance is not fitted yet. Call `fit` before `predict`.",
                self.name()
            ))
        })
    }

    /// Class probabilities, one column per entry of [`classes`](Self::classes).
    pub fn predict_proba(&self, x: ArrayView2<'_, f32>) -> PipelineResult<Array2<f64>> {
        let fitted = self.fitted()?;
        if x.ncols() != fitted.width {
            return Err(PipelineError::DimensionMismatch {
                expected: fitted.width,
                got: x.ncols(),
            });
        }

        let x = x.mapv(f64::from);
        if let [model] = fitted.models.as_slice() {
            let p = model.decision(&x).mapv(sigmoid);
            let mut proba: Array2<f64> = Array2::zeros((x.nrows(), 2));
            proba.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
            proba.column_mut(1).assign(&p);
            return Ok(proba);
        }

        let k = fitted.classes.len();
        let mut proba: Array2<f64> = Array2::zeros((x.nrows(), k));
        for (j, model) in fitted.models.iter().enumerate() {
            proba.column_mut(j).assign(&model.decision(&x).mapv(sigmoid));
        }
        for mut row in proba.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                row.fill(1.0 / k as f64);
            }
        }
        Ok(proba)
    }
}

/// Sorted distinct labels, after checking there is one label per sample
/// and at least two classes.
pub(crate) fn check_labels(samples: usize, y: &[i64]) -> PipelineResult<Vec<i64>> {
    if samples != y.len() {
        return Err(PipelineError::LabelMismatch {
            samples,
            labels: y.len(),
        });
    }
    let classes: Vec<i64> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if classes.len() < 2 {
        return Err(PipelineError::SingleClass(classes.len()));
    }
    Ok(classes)
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "LogisticRegression"
    }

    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[i64]) -> PipelineResult<()> {
        let classes = check_labels(x.nrows(), y)?;

        let features = x.mapv(f64::from);
        let positives: &[i64] = if classes.len() == 2 {
            &classes[1..]
        } else {
            &classes
        };

        let mut models = Vec::with_capacity(positives.len());
        for &positive in positives {
            let targets: Array1<f64> = y
                .iter()
                .map(|&label| if label == positive { 1.0 } else { 0.0 })
                .collect();
            let (model, converged) = BinaryModel::train(&features, &targets, &self.config);
            if !converged {
                warn!(
                    class = positive,
                    max_iter = self.config.max_iter,
                    "logistic regression did not converge"
                );
            }
            models.push(model);
        }

        debug!(
            samples = features.nrows(),
            features = x.ncols(),
            classes = classes.len(),
            "fitted logistic regression"
        );
        self.fitted = Some(Fitted {
            classes,
            models,
            width: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> PipelineResult<Vec<i64>> {
        let proba = self.predict_proba(x)?;
        let classes = &self.fitted()?.classes;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (j, &p)| {
                        if p > best.1 {
                            (j, p)
                        } else {
                            best
                        }
                    })
                    .0;
                classes[best]
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn get_params(&self) -> Params {
        match serde_json::to_value(&self.config) {
            Ok(serde_json::Value::Object(fields)) => fields
                .into_iter()
                .map(|(k, v)| (k, ParamValue::Value(v)))
                .collect(),
            _ => Params::new(),
        }
    }

    fn apply_params(&mut self, params: Params) -> PipelineResult<()> {
        let mut fields = match serde_json::to_value(&self.config) {
            Ok(serde_json::Value::Object(fields)) => fields,
            _ => serde_json::Map::new(),
        };
        let allowed: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
        check_keys(self.name(), &params, &allowed).map_err(PipelineError::param)?;
        for (key, value) in &params {
            let json: serde_json::Value = value_param(key, value).map_err(PipelineError::param)?;
            fields.insert(key.clone(), json);
        }
        let config: LogisticRegressionConfig =
            serde_json::from_value(serde_json::Value::Object(fields))
                .map_err(|e| PipelineError::InvalidParameter(e.to_string()))?;
        config.validate()?;
        self.config = config;
        self.fitted = None;
        Ok(())
    }
}
