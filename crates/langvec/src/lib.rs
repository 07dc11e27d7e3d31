//! # langvec
//!
//! Word and sentence embeddings behind one fit/transform contract.
//!
//! Each adapter wraps an embedding source (a vector table, a sense2vec
//! table, a fastText model, byte-pair embeddings or a learnt n-gram
//! vocabulary) and turns a batch of strings into an `(n, dim)` matrix.
//! Adapters compose into pipelines and feature unions.
//!
//! ## Quick Start
//!
//! ```rust
//! use langvec::prelude::*;
//! use std::sync::Arc;
//!
//! let colors = Arc::new(VectorTable::from_pairs(vec![
//!     ("red", vec![1.0, 0.0]),
//!     ("green", vec![0.5, 0.5]),
//!     ("blue", vec![0.0, 1.0]),
//! ]).unwrap());
//!
//! let texts = ["red", "green"];
//! let x = TextInput::from(&texts);
//! let mut lang = VectorLanguage::new(colors).unwrap();
//! let m = lang.fit(&x).unwrap().transform(&x).unwrap();
//! assert_eq!(m.shape(), &[2, 2]);
//!
//! // Compose with a classifier
//! let mut pipe = Pipeline::new("embed", lang, "model", LogisticRegression::new()).unwrap();
//! pipe.fit(&TextInput::from(&["red", "blue"]), &[1, 0]).unwrap();
//! assert_eq!(pipe.predict(&TextInput::from(&["red"])).unwrap(), vec![1]);
//! ```
//!
//! ## Architecture
//!
//! - [`langvec_embeddings`] - the [`Transformer`](langvec_embeddings::Transformer)
//!   contract, every backend, params and TOML configuration
//! - [`langvec_pipeline`] - [`Pipeline`](langvec_pipeline::Pipeline),
//!   [`FeatureUnion`](langvec_pipeline::FeatureUnion) and
//!   [`LogisticRegression`](langvec_pipeline::LogisticRegression)
//!
//! ## Backends
//!
//! | Adapter | Resource | Out-of-vocabulary input |
//! |---------|----------|-------------------------|
//! | `VectorLanguage` | `vectors.txt` | counts as a zero vector in the mean |
//! | `Sense2VecLanguage` | sense-tagged `vectors.txt` | zero vector |
//! | `FasttextLanguage` | fastText `.bin` | composed from character n-grams |
//! | `BpembLanguage` | `vocab.json`, `merges.txt`, `vectors.txt` | subwords without vectors are skipped |
//! | `CountVectorLanguage` | learnt at fit | unseen terms are ignored |
//!
//! Named models resolve under `$LANGVEC_HOME`, falling back to the
//! platform data directory.

pub use langvec_embeddings;
pub use langvec_pipeline;

/// Prelude for convenient imports.
pub mod prelude {
    pub use langvec_embeddings::prelude::*;
    pub use langvec_embeddings::{LanguageConfig, ParamValue, Resource};
    pub use langvec_pipeline::{
        Classifier, FeatureUnion, LogisticRegression, Pipeline, PipelineError, PipelineResult,
    };
}
