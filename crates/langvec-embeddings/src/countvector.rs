//! Count-vectorizer adapter: bag-of-n-grams counts, optionally reduced to
//! a fixed number of dimensions with a truncated SVD.

use crate::params::{check_keys, value_param};
use crate::tokenize::{collapse_whitespace, word_tokens};
use crate::{Backend, EmbeddingError, EmbeddingResult, Language, ParamValue, Params};
use nalgebra::{DMatrix, SVD};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// How text is split into terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Word n-grams over alphanumeric tokens of two or more characters.
    Word,
    /// Character n-grams over the whole text, whitespace runs collapsed.
    Char,
    /// Character n-grams inside word boundaries, padded with spaces.
    CharWb,
}

/// A document-frequency bound: an absolute count or a share of documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocFrequency {
    Count(usize),
    Proportion(f64),
}

impl DocFrequency {
    fn as_count(&self, n_docs: usize) -> f64 {
        match *self {
            DocFrequency::Count(c) => c as f64,
            DocFrequency::Proportion(p) => p * n_docs as f64,
        }
    }
}

/// Constructor parameters of [`CountVectorLanguage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CountVectorConfig {
    pub analyzer: Analyzer,
    pub ngram_range: (usize, usize),
    pub lowercase: bool,
    pub binary: bool,
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
    pub max_features: Option<usize>,
    /// Output width after SVD; raw counts when unset.
    pub n_components: Option<usize>,
}

impl Default for CountVectorConfig {
    fn default() -> Self {
        Self {
            analyzer: Analyzer::Char,
            ngram_range: (1, 2),
            lowercase: true,
            binary: false,
            min_df: DocFrequency::Count(1),
            max_df: DocFrequency::Proportion(1.0),
            max_features: None,
            n_components: None,
        }
    }
}

impl CountVectorConfig {
    pub fn validate(&self) -> EmbeddingResult<()> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(EmbeddingError::InvalidParameter(format!(
                "ngram_range must satisfy 1 <= min <= max, got ({}, {})",
                lo, hi
            )));
        }
        for (name, df) in [("min_df", self.min_df), ("max_df", self.max_df)] {
            if let DocFrequency::Proportion(p) = df {
                if !(0.0..=1.0).contains(&p) {
                    return Err(EmbeddingError::InvalidParameter(format!(
                        "{} proportion must be within [0, 1], got {}",
                        name, p
                    )));
                }
            }
        }
        if self.n_components == Some(0) {
            return Err(EmbeddingError::InvalidParameter(
                "n_components must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(EmbeddingError::InvalidParameter(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Split one document into its terms (with repetition).
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let (lo, hi) = self.ngram_range;
        match self.analyzer {
            Analyzer::Word => {
                let tokens = word_tokens(&text);
                let mut terms = Vec::new();
                for n in lo..=hi {
                    for window in tokens.windows(n) {
                        terms.push(window.join(" "));
                    }
                }
                terms
            }
            Analyzer::Char => {
                let chars: Vec<char> = collapse_whitespace(&text).chars().collect();
                let mut terms = Vec::new();
                for n in lo..=hi {
                    for window in chars.windows(n) {
                        terms.push(window.iter().collect());
                    }
                }
                terms
            }
            Analyzer::CharWb => {
                let mut terms = Vec::new();
                for word in text.split_whitespace() {
                    let padded: Vec<char> = format!(" {} ", word).chars().collect();
                    let len = padded.len();
                    for n in lo..=hi {
                        let mut offset = 0;
                        terms.push(padded[..n.min(len)].iter().collect());
                        while offset + n < len {
                            offset += 1;
                            terms.push(padded[offset..offset + n].iter().collect());
                        }
                        // A word no longer than `n` is counted once.
                        if offset == 0 {
                            break;
                        }
                    }
                }
                terms
            }
        }
    }
}

/// State learnt by `fit`.
#[derive(Debug, Clone)]
struct Fitted {
    vocabulary: BTreeMap<String, usize>,
    /// `(k, vocabulary)` projection, one component per row.
    components: Option<Array2<f64>>,
}

/// Bag-of-n-grams backend.
#[derive(Debug, Clone)]
pub struct CountVectorBackend {
    config: CountVectorConfig,
    fitted: Option<Fitted>,
}

/// Adapter that learns its vocabulary in `fit`.
///
/// Rows for texts made only of unseen terms are all zeros.
pub type CountVectorLanguage = Language<CountVectorBackend>;

impl Language<CountVectorBackend> {
    /// Character 1–2-grams reduced to `n_components` dimensions.
    pub fn new(n_components: usize) -> EmbeddingResult<Self> {
        Self::with_config(CountVectorConfig {
            n_components: Some(n_components),
            ..CountVectorConfig::default()
        })
    }

    /// Word unigram counts, one column per vocabulary term.
    pub fn bag_of_words() -> Self {
        Language::from_backend(CountVectorBackend {
            config: CountVectorConfig {
                analyzer: Analyzer::Word,
                ngram_range: (1, 1),
                ..CountVectorConfig::default()
            },
            fitted: None,
        })
    }

    pub fn with_config(config: CountVectorConfig) -> EmbeddingResult<Self> {
        config.validate()?;
        Ok(Language::from_backend(CountVectorBackend {
            config,
            fitted: None,
        }))
    }

    pub fn config(&self) -> &CountVectorConfig {
        &self.backend().config
    }

    /// Learnt vocabulary (term → column), once fitted.
    pub fn vocabulary(&self) -> Option<&BTreeMap<String, usize>> {
        self.backend().fitted.as_ref().map(|f| &f.vocabulary)
    }
}

impl CountVectorBackend {
    fn term_counts(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for term in self.config.analyze(text) {
            *counts.entry(term).or_insert(0) += 1;
        }
        counts
    }

    fn build_vocabulary(&self, docs: &[HashMap<String, usize>]) -> EmbeddingResult<Vec<String>> {
        let n_docs = docs.len();
        let min_doc = self.config.min_df.as_count(n_docs);
        let max_doc = self.config.max_df.as_count(n_docs);
        if max_doc < min_doc {
            return Err(EmbeddingError::InvalidParameter(
                "max_df corresponds to fewer documents than min_df".to_string(),
            ));
        }

        let mut df: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for doc in docs {
            for (term, count) in doc {
                let entry = df.entry(term.as_str()).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += count;
            }
        }

        let mut kept: Vec<(&str, usize)> = df
            .into_iter()
            .filter(|(_, (d, _))| (*d as f64) >= min_doc && (*d as f64) <= max_doc)
            .map(|(term, (_, total))| (term, total))
            .collect();

        if let Some(limit) = self.config.max_features {
            if kept.len() > limit {
                kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        if kept.is_empty() {
            return Err(EmbeddingError::InvalidParameter(
                "empty vocabulary; the documents contain no terms within the frequency bounds"
                    .to_string(),
            ));
        }
        Ok(kept.into_iter().map(|(t, _)| t.to_string()).collect())
    }

    fn count_row(&self, text: &str, vocabulary: &BTreeMap<String, usize>) -> Array1<f64> {
        let mut row = Array1::zeros(vocabulary.len());
        for (term, count) in self.term_counts(text) {
            if let Some(&col) = vocabulary.get(&term) {
                row[col] = if self.config.binary { 1.0 } else { count as f64 };
            }
        }
        row
    }
}

impl Backend for CountVectorBackend {
    fn name(&self) -> &str {
        "CountVectorLanguage"
    }

    fn learn(&mut self, texts: &[&str]) -> EmbeddingResult<()> {
        let docs: Vec<_> = texts.iter().map(|t| self.term_counts(t)).collect();
        let terms = self.build_vocabulary(&docs)?;
        let vocabulary: BTreeMap<String, usize> =
            terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        let components = match self.config.n_components {
            None => None,
            Some(k) if k > vocabulary.len() => {
                return Err(EmbeddingError::InvalidParameter(format!(
                    "n_components={} exceeds the vocabulary size {}",
                    k,
                    vocabulary.len()
                )))
            }
            Some(k) => {
                let rows: Vec<Array1<f64>> = texts
                    .iter()
                    .map(|t| self.count_row(t, &vocabulary))
                    .collect();
                let matrix = DMatrix::from_fn(rows.len(), vocabulary.len(), |i, j| rows[i][j]);
                Some(top_components(matrix, k)?)
            }
        };

        debug!(
            terms = vocabulary.len(),
            components = ?self.config.n_components,
            "built count vocabulary"
        );
        self.fitted = Some(Fitted {
            vocabulary,
            components,
        });
        Ok(())
    }

    fn dimension(&self) -> Option<usize> {
        match (&self.fitted, self.config.n_components) {
            (_, Some(k)) => Some(k),
            (Some(f), None) => Some(f.vocabulary.len()),
            (None, None) => None,
        }
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| EmbeddingError::not_fitted(self.name()))?;
        let counts = self.count_row(text, &fitted.vocabulary);
        let row = match &fitted.components {
            None => counts,
            Some(components) => components.dot(&counts),
        };
        Ok(row.iter().map(|&v| v as f32).collect())
    }

    fn params(&self) -> Params {
        match serde_json::to_value(&self.config) {
            Ok(serde_json::Value::Object(fields)) => fields
                .into_iter()
                .map(|(k, v)| (k, ParamValue::Value(v)))
                .collect(),
            _ => Params::new(),
        }
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        let mut fields = match serde_json::to_value(&self.config) {
            Ok(serde_json::Value::Object(fields)) => fields,
            _ => serde_json::Map::new(),
        };
        let allowed: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
        check_keys(self.name(), &params, &allowed)?;
        for (key, value) in &params {
            let json: serde_json::Value = value_param(key, value)?;
            fields.insert(key.clone(), json);
        }
        let config: CountVectorConfig = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| EmbeddingError::InvalidParameter(e.to_string()))?;
        config.validate()?;
        self.config = config;
        self.fitted = None;
        Ok(())
    }
}

/// Top-`k` right singular vectors of `matrix` (documents by terms), one
/// per row, in decreasing order of singular value.
///
/// Each component's largest-magnitude entry is made positive. Rows past
/// the rank of `matrix` are zeros.
fn top_components(matrix: DMatrix<f64>, k: usize) -> EmbeddingResult<Array2<f64>> {
    let width = matrix.ncols();
    let svd = SVD::new(matrix, false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| EmbeddingError::InvalidParameter("SVD failed to compute V^T".to_string()))?;
    let singular = svd.singular_values;

    let mut order: Vec<usize> = (0..singular.len()).collect();
    order.sort_by(|&a, &b| singular[b].total_cmp(&singular[a]));
    let cutoff = singular.max() * 1e-10;

    let mut components = Array2::zeros((k, width));
    for (row, &i) in order.iter().take(k).enumerate() {
        if singular[i] <= cutoff {
            break;
        }
        let v = v_t.row(i);
        let peak = v
            .iter()
            .fold(0.0f64, |best, &x| if x.abs() > best.abs() { x } else { best });
        let sign = if peak < 0.0 { -1.0 } else { 1.0 };
        for (j, &x) in v.iter().enumerate() {
            components[[row, j]] = sign * x;
        }
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TextInput, Transformer};

    const DOCS: [&str; 6] = [
        "i really like this post",
        "thanks for that comment",
        "i enjoy this friendly forum",
        "this is a bad post",
        "i dislike this article",
        "this is not well written",
    ];

    #[test]
    fn word_analyzer_ngrams() {
        let config = CountVectorConfig {
            analyzer: Analyzer::Word,
            ngram_range: (1, 2),
            ..CountVectorConfig::default()
        };
        assert_eq!(
            config.analyze("Bad post, bad!"),
            vec!["bad", "post", "bad", "bad post", "post bad"]
        );
    }

    #[test]
    fn char_analyzers() {
        let config = CountVectorConfig {
            ngram_range: (2, 2),
            ..CountVectorConfig::default()
        };
        assert_eq!(config.analyze("ab  c"), vec!["ab", "b ", " c"]);
        assert_eq!(config.analyze(" a"), vec![" a"]);
        assert_eq!(config.analyze(" a  "), vec![" a", "a "]);

        let wb = CountVectorConfig {
            analyzer: Analyzer::CharWb,
            ngram_range: (3, 4),
            ..CountVectorConfig::default()
        };
        assert_eq!(wb.analyze("a"), vec![" a "]);
        assert_eq!(wb.analyze("ab"), vec![" ab", "ab ", " ab "]);
    }

    #[test]
    fn bag_of_words_counts() {
        let mut lang = CountVectorLanguage::bag_of_words();
        let x = TextInput::from(&DOCS);
        let m = lang.fit_transform(&x).unwrap();
        let vocab = lang.vocabulary().unwrap();
        assert_eq!(m.shape(), &[6, vocab.len()]);

        let this = vocab["this"];
        assert_eq!(m.column(this).sum(), 5.0);
        // Single-character tokens are not terms.
        assert!(!vocab.contains_key("i"));

        let unseen = lang.transform(&TextInput::from(&["completely novel words"])).unwrap();
        assert!(unseen.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn binary_and_df_bounds() {
        let config = CountVectorConfig {
            analyzer: Analyzer::Word,
            ngram_range: (1, 1),
            binary: true,
            min_df: DocFrequency::Count(2),
            max_df: DocFrequency::Proportion(0.5),
            ..CountVectorConfig::default()
        };
        let mut lang = CountVectorLanguage::with_config(config).unwrap();
        lang.learn(&TextInput::from(&DOCS)).unwrap();
        let vocab: Vec<&String> = lang.vocabulary().unwrap().keys().collect();
        // "this" is in 5/6 docs (> 0.5); "post" and "is" are in exactly 2.
        assert_eq!(vocab, vec!["is", "post"]);

        let m = lang.transform(&TextInput::from(&["post post is"])).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn max_features_keeps_most_frequent() {
        let config = CountVectorConfig {
            analyzer: Analyzer::Word,
            ngram_range: (1, 1),
            max_features: Some(2),
            ..CountVectorConfig::default()
        };
        let mut lang = CountVectorLanguage::with_config(config).unwrap();
        lang.learn(&TextInput::from(&DOCS)).unwrap();
        let vocab: Vec<&String> = lang.vocabulary().unwrap().keys().collect();
        assert_eq!(vocab, vec!["is", "this"]);
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let mut lang = CountVectorLanguage::bag_of_words();
        let err = lang.learn(&TextInput::from(&["a b", "c"])).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidParameter(_)));
        assert!(!lang.is_fitted());
    }

    #[test]
    fn svd_projection_has_fixed_width() {
        let mut lang = CountVectorLanguage::new(3).unwrap();
        let m = lang.fit_transform(&TextInput::from(&DOCS)).unwrap();
        assert_eq!(m.shape(), &[6, 3]);
        assert_eq!(lang.dimension(), Some(3));

        let again = lang.fit_transform(&TextInput::from(&DOCS)).unwrap();
        assert_eq!(m, again);
    }

    #[test]
    fn svd_components_are_orthonormal() {
        let matrix = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 1.0, 0.0, 4.0, 0.0, 1.0, 0.0, 2.0]);
        let comps = top_components(matrix, 3).unwrap();
        let gram = comps.dot(&comps.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-9);
            }
        }
        // Largest singular value is 4, on the second axis.
        assert!((comps[[0, 1]] - 1.0).abs() < 1e-9);
        // Then 3, along (1, 0, 1) with a positive sign.
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!((comps[[1, 0]] - half).abs() < 1e-9);
        assert!((comps[[1, 2]] - half).abs() < 1e-9);
    }

    #[test]
    fn svd_components_past_rank_are_zero() {
        let matrix = DMatrix::from_row_slice(1, 3, &[-3.0, 0.0, -4.0]);
        let comps = top_components(matrix, 2).unwrap();
        assert_eq!(comps.shape(), &[2, 3]);
        assert!((comps[[0, 0]] - 0.6).abs() < 1e-9);
        assert!((comps[[0, 2]] - 0.8).abs() < 1e-9);
        assert!(comps.row(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn too_many_components_is_an_error() {
        let mut lang = CountVectorLanguage::new(500).unwrap();
        assert!(lang.learn(&TextInput::from(&["ab"])).is_err());
    }

    #[test]
    fn params_roundtrip_and_reset() {
        let mut lang = CountVectorLanguage::new(2).unwrap();
        lang.learn(&TextInput::from(&DOCS)).unwrap();
        let params = lang.get_params(false);
        assert_eq!(params["n_components"], ParamValue::from(2usize));
        assert_eq!(params["ngram_range"], ParamValue::Value(serde_json::json!([1, 2])));

        lang.set_params(params.clone()).unwrap();
        assert!(!lang.is_fitted());
        assert_eq!(lang.get_params(false), params);

        let mut bad = Params::new();
        bad.insert("ngram_range".into(), ParamValue::Value(serde_json::json!([3, 1])));
        assert!(lang.set_params(bad).is_err());
        assert_eq!(lang.get_params(false), params);
    }
}
