//! Byte-pair embeddings (BPEmb-style subword vectors).
//!
//! Text is segmented with a BPE model and embedded as the mean of its
//! subword vectors.

use crate::normalize::{add_into, scale_mean};
use crate::params::{check_keys, value_param};
use crate::source::{read_resource, LoadResource};
use crate::table::VECTORS_FILE;
use crate::{
    Backend, Embedder, EmbeddingError, EmbeddingResult, Language, ParamValue, Params, Resource,
    Source, VectorTable,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokenizers::models::bpe::BPE;
use tokenizers::Model;
use tracing::debug;

pub const VOCAB_FILE: &str = "vocab.json";
pub const MERGES_FILE: &str = "merges.txt";

/// Marker prepended to every word, as in SentencePiece vocabularies.
pub const WORD_MARKER: char = '▁';

/// Text preprocessing applied before segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocess {
    pub lowercase: bool,
    pub normalize_digits: bool,
}

impl Default for Preprocess {
    fn default() -> Self {
        Self {
            lowercase: true,
            normalize_digits: true,
        }
    }
}

impl Preprocess {
    pub fn apply(&self, text: &str) -> String {
        text.chars()
            .flat_map(|c| {
                let c = if self.normalize_digits && c.is_ascii_digit() { '0' } else { c };
                let lowered: Vec<char> = if self.lowercase {
                    c.to_lowercase().collect()
                } else {
                    vec![c]
                };
                lowered
            })
            .collect()
    }
}

/// A BPE segmenter paired with one vector per subword.
pub struct BpeEmbeddings {
    name: String,
    bpe: BPE,
    vectors: VectorTable,
}

impl fmt::Debug for BpeEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeEmbeddings")
            .field("name", &self.name)
            .field("subwords", &self.vectors.len())
            .field("dim", &self.vectors.dimension())
            .finish()
    }
}

impl BpeEmbeddings {
    pub fn from_parts(bpe: BPE, vectors: VectorTable) -> Self {
        Self {
            name: "bpemb".to_string(),
            bpe,
            vectors,
        }
    }

    /// Load from explicit `vocab.json`, `merges.txt` and vector files.
    pub fn from_files(vocab: &Path, merges: &Path, vectors: &Path) -> EmbeddingResult<Self> {
        let bpe = BPE::from_file(&path_str(vocab)?, &path_str(merges)?)
            .build()
            .map_err(|e| EmbeddingError::Resource(format!("Failed to build BPE model: {}", e)))?;
        let vectors = VectorTable::parse(&read_resource(vectors)?)
            .map_err(|e| EmbeddingError::Resource(format!("{}: {}", vectors.display(), e)))?;
        debug!(
            vocab = bpe.get_vocab_size(),
            vectors = vectors.len(),
            dim = vectors.dimension(),
            "loaded BPE embeddings"
        );
        Ok(Self::from_parts(bpe, vectors))
    }

    pub fn dim(&self) -> usize {
        self.vectors.dimension()
    }

    pub fn vectors(&self) -> &VectorTable {
        &self.vectors
    }

    /// Segment already-preprocessed text into subword strings.
    pub fn segment(&self, text: &str) -> EmbeddingResult<Vec<String>> {
        let mut pieces = Vec::new();
        for word in text.split_whitespace() {
            let marked = format!("{}{}", WORD_MARKER, word);
            let tokens = self
                .bpe
                .tokenize(&marked)
                .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;
            pieces.extend(tokens.into_iter().map(|t| t.value));
        }
        Ok(pieces)
    }

    /// Mean of the vectors of the subwords of `text`. Subwords without a
    /// vector are skipped; if none has one, the result is all zeros.
    pub fn embed_with(&self, text: &str, preprocess: Preprocess) -> EmbeddingResult<Vec<f32>> {
        let pieces = self.segment(&preprocess.apply(text))?;
        let mut acc = vec![0.0f32; self.dim()];
        let mut found = 0;
        for piece in &pieces {
            if let Some(v) = self.vectors.get(piece) {
                add_into(&mut acc, v);
                found += 1;
            }
        }
        scale_mean(&mut acc, found);
        Ok(acc)
    }
}

fn path_str(path: &Path) -> EmbeddingResult<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| EmbeddingError::Resource(format!("Non UTF-8 path: {}", path.display())))
}

impl LoadResource for BpeEmbeddings {
    const KIND: &'static str = "BPE embeddings";

    /// Load from a directory holding `vocab.json`, `merges.txt` and
    /// `vectors.txt`.
    fn load(path: &Path) -> EmbeddingResult<Self> {
        if !path.is_dir() {
            return Err(EmbeddingError::Resource(format!(
                "{} is not a BPE embedding directory",
                path.display()
            )));
        }
        let mut emb = Self::from_files(
            &path.join(VOCAB_FILE),
            &path.join(MERGES_FILE),
            &path.join(VECTORS_FILE),
        )?;
        if let Some(name) = path.file_name() {
            emb.name = name.to_string_lossy().into_owned();
        }
        Ok(emb)
    }
}

impl Embedder for BpeEmbeddings {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.embed_with(text, Preprocess::default())
    }

    fn dimension(&self) -> usize {
        self.dim()
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Adapter state for [`BpembLanguage`].
#[derive(Debug, Clone)]
pub struct BpembBackend {
    model: Arc<BpeEmbeddings>,
    preprocess: Preprocess,
}

pub type BpembLanguage = Language<BpembBackend>;

impl Language<BpembBackend> {
    pub fn new(model: impl Into<Source<BpeEmbeddings>>) -> EmbeddingResult<Self> {
        Self::with_preprocess(model, Preprocess::default())
    }

    pub fn with_preprocess(
        model: impl Into<Source<BpeEmbeddings>>,
        preprocess: Preprocess,
    ) -> EmbeddingResult<Self> {
        let model = model.into().resolve()?;
        Ok(Language::from_backend(BpembBackend { model, preprocess }))
    }
}

impl Backend for BpembBackend {
    fn name(&self) -> &str {
        "BpembLanguage"
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.model.dim())
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.model.embed_with(text, self.preprocess)
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert(
            "model".to_string(),
            ParamValue::Resource(Resource::Bpe(self.model.clone())),
        );
        params.insert("lowercase".to_string(), self.preprocess.lowercase.into());
        params.insert(
            "normalize_digits".to_string(),
            self.preprocess.normalize_digits.into(),
        );
        params
    }

    fn apply_params(&mut self, params: Params) -> EmbeddingResult<()> {
        check_keys(self.name(), &params, &["model", "lowercase", "normalize_digits"])?;
        let model = match params.get("model") {
            Some(ParamValue::Resource(Resource::Bpe(model))) => model.clone(),
            Some(other) => {
                return Err(EmbeddingError::InvalidParameter(format!(
                    "model expects BPE embeddings, got {:?}",
                    other
                )))
            }
            None => self.model.clone(),
        };
        let mut preprocess = self.preprocess;
        if let Some(v) = params.get("lowercase") {
            preprocess.lowercase = value_param("lowercase", v)?;
        }
        if let Some(v) = params.get("normalize_digits") {
            preprocess.normalize_digits = value_param("normalize_digits", v)?;
        }
        self.model = model;
        self.preprocess = preprocess;
        Ok(())
    }
}
