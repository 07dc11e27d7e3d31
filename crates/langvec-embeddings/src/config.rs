//! TOML configuration for adapters.
//!
//! One explicit case per backend kind:
//!
//! ```toml
//! backend = "vectors"
//! path = "models/colors"
//! ```
//!
//! ```toml
//! backend = "count_vector"
//! analyzer = "word"
//! ngram_range = [1, 2]
//! n_components = 16
//! ```

use crate::bpemb::Preprocess;
use crate::{
    BpeEmbeddings, BpembLanguage, CountVectorConfig, CountVectorLanguage, EmbeddingError,
    EmbeddingResult, FasttextLanguage, Sense2VecLanguage, Source, SubwordModel, Transformer,
    VectorLanguage, VectorTable,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a backend resource comes from: exactly one of `path` or `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLocator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceLocator {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            name: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            path: None,
            name: Some(name.into()),
        }
    }

    fn source<T>(&self) -> EmbeddingResult<Source<T>> {
        match (&self.path, &self.name) {
            (Some(path), None) => Ok(Source::Path(path.clone())),
            (None, Some(name)) => Ok(Source::Named(name.clone())),
            _ => Err(EmbeddingError::Config(
                "exactly one of `path` or `name` must be set".to_string(),
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Adapter configuration, tagged by `backend`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum LanguageConfig {
    Vectors {
        #[serde(flatten)]
        locator: ResourceLocator,
    },
    Sense2vec {
        #[serde(flatten)]
        locator: ResourceLocator,
    },
    Fasttext {
        #[serde(flatten)]
        locator: ResourceLocator,
    },
    Bpemb {
        #[serde(flatten)]
        locator: ResourceLocator,
        #[serde(default = "default_true")]
        lowercase: bool,
        #[serde(default = "default_true")]
        normalize_digits: bool,
    },
    CountVector(CountVectorConfig),
}

impl LanguageConfig {
    pub fn from_toml_str(content: &str) -> EmbeddingResult<Self> {
        toml::from_str(content).map_err(|e| EmbeddingError::Config(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> EmbeddingResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EmbeddingError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| EmbeddingError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn to_toml_string(&self) -> EmbeddingResult<String> {
        toml::to_string_pretty(self).map_err(|e| EmbeddingError::Config(e.to_string()))
    }

    /// Construct the configured adapter, loading its backend.
    pub fn build(&self) -> EmbeddingResult<Box<dyn Transformer>> {
        debug!(config = ?self, "building adapter");
        Ok(match self {
            LanguageConfig::Vectors { locator } => {
                Box::new(VectorLanguage::new(locator.source::<VectorTable>()?)?)
            }
            LanguageConfig::Sense2vec { locator } => {
                Box::new(Sense2VecLanguage::new(locator.source::<VectorTable>()?)?)
            }
            LanguageConfig::Fasttext { locator } => {
                Box::new(FasttextLanguage::new(locator.source::<SubwordModel>()?)?)
            }
            LanguageConfig::Bpemb {
                locator,
                lowercase,
                normalize_digits,
            } => Box::new(BpembLanguage::with_preprocess(
                locator.source::<BpeEmbeddings>()?,
                Preprocess {
                    lowercase: *lowercase,
                    normalize_digits: *normalize_digits,
                },
            )?),
            LanguageConfig::CountVector(config) => {
                Box::new(CountVectorLanguage::with_config(config.clone())?)
            }
        })
    }
}
