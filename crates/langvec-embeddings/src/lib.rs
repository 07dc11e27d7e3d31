//! # langvec Embeddings
//!
//! Word and sentence embedding backends behind a uniform fit/transform
//! contract.
//!
//! Every adapter accepts a 1-D batch of strings and produces an
//! `(n_inputs, dim)` matrix:
//! - [`VectorLanguage`]: lexical vector tables (toy vector spaces,
//!   spaCy-style word vectors)
//! - [`Sense2VecLanguage`]: sense-tagged phrase vectors
//! - [`FasttextLanguage`]: fastText subword models
//! - [`BpembLanguage`]: byte-pair subword embeddings
//! - [`CountVectorLanguage`]: bag-of-n-grams counts with optional SVD
//!
//! ## Usage
//!
//! ```rust
//! use langvec_embeddings::{TextInput, Transformer, VectorLanguage, VectorTable};
//! use std::sync::Arc;
//!
//! let table = Arc::new(VectorTable::from_pairs(vec![
//!     ("red", vec![1.0, 0.0]),
//!     ("blue", vec![0.0, 1.0]),
//! ]).unwrap());
//!
//! let mut lang = VectorLanguage::new(table).unwrap();
//! let texts = ["red", "blue red", "unknown"];
//! let x = TextInput::from(&texts);
//! let m = lang.fit_transform(&x).unwrap();
//! assert_eq!(m.shape(), &[3, 2]);
//! ```

mod bpemb;
mod config;
mod countvector;
mod embedder;
mod error;
mod fasttext;
mod input;
mod language;
mod normalize;
mod params;
mod sense2vec;
mod source;
mod subword;
mod table;
mod tokenize;
mod transformer;
mod vectors;

pub use bpemb::{BpeEmbeddings, BpembBackend, BpembLanguage, Preprocess};
pub use config::{LanguageConfig, ResourceLocator};
pub use countvector::{
    Analyzer, CountVectorBackend, CountVectorConfig, CountVectorLanguage, DocFrequency,
};
pub use embedder::{stack_rows, Embedder};
pub use error::{EmbeddingError, EmbeddingResult};
pub use fasttext::{FasttextBackend, FasttextLanguage};
pub use input::TextInput;
pub use language::{Backend, Language};
pub use normalize::l2_norm;
pub use params::{check_keys, nested, value_param, ParamValue, Params, Resource};
pub use sense2vec::{Sense2VecBackend, Sense2VecLanguage};
pub use source::{model_home, LoadResource, Source, MODEL_HOME_ENV};
pub use subword::{fasttext_hash, SubwordArgs, SubwordModel};
pub use table::VectorTable;
pub use transformer::Transformer;
pub use vectors::{VectorBackend, VectorLanguage};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BpembLanguage, CountVectorLanguage, FasttextLanguage, Sense2VecLanguage, VectorLanguage,
    };
    pub use crate::{EmbeddingError, EmbeddingResult, Params, TextInput, Transformer};
    pub use crate::{Source, VectorTable};
}
