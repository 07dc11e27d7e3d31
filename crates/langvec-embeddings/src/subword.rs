//! fastText subword models.
//!
//! Reads and writes the fastText `.bin` format (non-quantized) and composes
//! word vectors from character n-gram buckets, so out-of-vocabulary words
//! still receive a meaningful vector.

use crate::normalize::{add_into, l2_norm, scale_mean};
use crate::source::LoadResource;
use crate::{Embedder, EmbeddingError, EmbeddingResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const MAGIC: i32 = 793_712_314;
const VERSION: i32 = 12;
const BOW: &str = "<";
const EOW: &str = ">";

const MODEL_CBOW: i32 = 1;
const MODEL_SKIPGRAM: i32 = 2;
const MODEL_SUPERVISED: i32 = 3;
const LOSS_NEGATIVE_SAMPLING: i32 = 2;
const ENTRY_WORD: i8 = 0;

/// Training arguments stored in a model header.
#[derive(Debug, Clone, PartialEq)]
pub struct SubwordArgs {
    pub dim: usize,
    pub minn: usize,
    pub maxn: usize,
    pub bucket: usize,
    pub ws: i32,
    pub epoch: i32,
    pub min_count: i32,
    pub neg: i32,
    pub word_ngrams: i32,
    pub loss: i32,
    pub model: i32,
    pub lr_update_rate: i32,
    pub t: f64,
}

impl SubwordArgs {
    /// Skipgram defaults with the given geometry.
    pub fn new(dim: usize, minn: usize, maxn: usize, bucket: usize) -> Self {
        Self {
            dim,
            minn,
            maxn,
            bucket,
            ws: 5,
            epoch: 5,
            min_count: 5,
            neg: 5,
            word_ngrams: 1,
            loss: LOSS_NEGATIVE_SAMPLING,
            model: MODEL_SKIPGRAM,
            lr_update_rate: 100,
            t: 1e-4,
        }
    }
}

/// A fastText-style model: word rows followed by n-gram bucket rows.
#[derive(Debug, Clone)]
pub struct SubwordModel {
    name: String,
    args: SubwordArgs,
    words: Vec<String>,
    counts: Vec<i64>,
    word_index: HashMap<String, usize>,
    /// `None` for unpruned models; otherwise bucket id → compacted row.
    prune_index: Option<HashMap<i32, i32>>,
    input: Vec<f32>,
}

impl SubwordModel {
    /// Build a model from its input matrix, which must hold
    /// `words.len() + args.bucket` rows of `args.dim` values.
    pub fn new(args: SubwordArgs, words: Vec<String>, input: Vec<f32>) -> EmbeddingResult<Self> {
        let rows = words.len() + args.bucket;
        if input.len() != rows * args.dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: rows * args.dim,
                got: input.len(),
            });
        }
        let counts = vec![1; words.len()];
        Ok(Self::assemble("in-memory".to_string(), args, words, counts, None, input))
    }

    fn assemble(
        name: String,
        args: SubwordArgs,
        words: Vec<String>,
        counts: Vec<i64>,
        prune_index: Option<HashMap<i32, i32>>,
        input: Vec<f32>,
    ) -> Self {
        let word_index = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        Self {
            name,
            args,
            words,
            counts,
            word_index,
            prune_index,
            input,
        }
    }

    pub fn args(&self) -> &SubwordArgs {
        &self.args
    }

    pub fn dim(&self) -> usize {
        self.args.dim
    }

    pub fn nwords(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn contains(&self, word: &str) -> bool {
        self.word_index.contains_key(word)
    }

    fn row(&self, id: usize) -> &[f32] {
        let start = id * self.args.dim;
        &self.input[start..start + self.args.dim]
    }

    /// Input-matrix rows that make up `word`: its own row when in the
    /// vocabulary, then one row per character n-gram of `<word>`.
    pub fn subword_ids(&self, word: &str) -> Vec<usize> {
        let mut ids = Vec::new();
        if let Some(&id) = self.word_index.get(word) {
            ids.push(id);
        }
        if self.args.maxn == 0 || self.args.bucket == 0 {
            return ids;
        }

        let wrapped = format!("{}{}{}", BOW, word, EOW);
        let bytes = wrapped.as_bytes();
        for i in 0..bytes.len() {
            if is_continuation(bytes[i]) {
                continue;
            }
            let mut j = i;
            let mut n = 1;
            while j < bytes.len() && n <= self.args.maxn {
                j += 1;
                while j < bytes.len() && is_continuation(bytes[j]) {
                    j += 1;
                }
                if n >= self.args.minn && !(n == 1 && (i == 0 || j == bytes.len())) {
                    let h = (fasttext_hash(&bytes[i..j]) % self.args.bucket as u32) as i32;
                    self.push_bucket(&mut ids, h);
                }
                n += 1;
            }
        }
        ids
    }

    fn push_bucket(&self, ids: &mut Vec<usize>, bucket_id: i32) {
        let id = match &self.prune_index {
            None => bucket_id,
            Some(index) => match index.get(&bucket_id) {
                Some(&mapped) => mapped,
                None => return,
            },
        };
        if id >= 0 {
            ids.push(self.words.len() + id as usize);
        }
    }

    /// Word vector: mean of the word's subword rows, zeros if it has none.
    pub fn word_vector(&self, word: &str) -> Vec<f32> {
        let ids = self.subword_ids(word);
        let mut acc = vec![0.0f32; self.args.dim];
        for &id in &ids {
            add_into(&mut acc, self.row(id));
        }
        scale_mean(&mut acc, ids.len());
        acc
    }

    /// Sentence vector: mean of the unit-normalized word vectors of every
    /// whitespace-separated word with a non-zero vector.
    pub fn sentence_vector(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.args.dim];
        let mut count = 0;
        for word in text.split_whitespace() {
            let mut v = self.word_vector(word);
            let norm = l2_norm(&v);
            if norm > 0.0 {
                v.iter_mut().for_each(|x| *x /= norm);
                add_into(&mut acc, &v);
                count += 1;
            }
        }
        scale_mean(&mut acc, count);
        acc
    }

    /// Write the model in fastText `.bin` format.
    pub fn save(&self, path: &Path) -> EmbeddingResult<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let a = &self.args;
        w.write_all(&MAGIC.to_le_bytes())?;
        w.write_all(&VERSION.to_le_bytes())?;
        for v in [
            a.dim as i32,
            a.ws,
            a.epoch,
            a.min_count,
            a.neg,
            a.word_ngrams,
            a.loss,
            a.model,
            a.bucket as i32,
            a.minn as i32,
            a.maxn as i32,
            a.lr_update_rate,
        ] {
            w.write_all(&v.to_le_bytes())?;
        }
        w.write_all(&a.t.to_le_bytes())?;

        let nwords = self.words.len() as i32;
        let ntokens: i64 = self.counts.iter().sum();
        w.write_all(&nwords.to_le_bytes())?;
        w.write_all(&nwords.to_le_bytes())?;
        w.write_all(&0i32.to_le_bytes())?;
        w.write_all(&ntokens.to_le_bytes())?;
        let prune_size = self.prune_index.as_ref().map(|p| p.len() as i64).unwrap_or(-1);
        w.write_all(&prune_size.to_le_bytes())?;
        for (word, count) in self.words.iter().zip(&self.counts) {
            w.write_all(word.as_bytes())?;
            w.write_all(&[0u8])?;
            w.write_all(&count.to_le_bytes())?;
            w.write_all(&ENTRY_WORD.to_le_bytes())?;
        }
        if let Some(index) = &self.prune_index {
            let mut pairs: Vec<_> = index.iter().collect();
            pairs.sort();
            for (from, to) in pairs {
                w.write_all(&from.to_le_bytes())?;
                w.write_all(&to.to_le_bytes())?;
            }
        }

        w.write_all(&[0u8])?;
        let rows = (self.input.len() / a.dim.max(1)) as i64;
        w.write_all(&rows.to_le_bytes())?;
        w.write_all(&(a.dim as i64).to_le_bytes())?;
        for v in &self.input {
            w.write_all(&v.to_le_bytes())?;
        }

        // Output layer is not used for lookup; store it empty.
        w.write_all(&[0u8])?;
        w.write_all(&0i64.to_le_bytes())?;
        w.write_all(&(a.dim as i64).to_le_bytes())?;
        Ok(())
    }

    /// Parse a model from fastText `.bin` bytes.
    pub fn read_from<R: Read>(r: &mut R) -> EmbeddingResult<Self> {
        let mut r = BinReader { inner: r };

        let magic = r.i32()?;
        if magic != MAGIC {
            return Err(EmbeddingError::Resource(
                "not a fastText model (bad magic number)".to_string(),
            ));
        }
        let version = r.i32()?;
        if version > VERSION {
            return Err(EmbeddingError::Resource(format!(
                "unsupported fastText format version {}",
                version
            )));
        }

        let dim = r.usize32("dim")?;
        let ws = r.i32()?;
        let epoch = r.i32()?;
        let min_count = r.i32()?;
        let neg = r.i32()?;
        let word_ngrams = r.i32()?;
        let loss = r.i32()?;
        let model = r.i32()?;
        let bucket = r.usize32("bucket")?;
        let minn = r.usize32("minn")?;
        let mut maxn = r.usize32("maxn")?;
        let lr_update_rate = r.i32()?;
        let t = r.f64()?;
        if version == 11 && model == MODEL_SUPERVISED {
            maxn = 0;
        }
        if !matches!(model, MODEL_CBOW | MODEL_SKIPGRAM | MODEL_SUPERVISED) {
            return Err(EmbeddingError::Resource(format!("unknown model kind {}", model)));
        }
        let args = SubwordArgs {
            dim,
            minn,
            maxn,
            bucket,
            ws,
            epoch,
            min_count,
            neg,
            word_ngrams,
            loss,
            model,
            lr_update_rate,
            t,
        };

        let size = r.usize32("dictionary size")?;
        let nwords = r.usize32("word count")?;
        let _nlabels = r.i32()?;
        let _ntokens = r.i64()?;
        let prune_size = r.i64()?;
        if prune_size > i64::from(i32::MAX) {
            return Err(EmbeddingError::Resource(format!(
                "prune index size {} in header is out of range",
                prune_size
            )));
        }

        // Header counts are untrusted: containers grow only as entries are
        // actually read, so a short file fails as truncated.
        let mut words = Vec::new();
        let mut counts = Vec::new();
        for _ in 0..size {
            let word = r.cstring()?;
            let count = r.i64()?;
            let kind = r.i8()?;
            if kind == ENTRY_WORD && words.len() < nwords {
                words.push(word);
                counts.push(count);
            }
        }
        let prune_index = if prune_size >= 0 {
            let mut index = HashMap::new();
            for _ in 0..prune_size {
                let from = r.i32()?;
                let to = r.i32()?;
                index.insert(from, to);
            }
            Some(index)
        } else {
            None
        };

        if r.u8()? != 0 {
            return Err(EmbeddingError::Resource(
                "quantized fastText models are not supported".to_string(),
            ));
        }
        let rows = r.i64()?;
        let cols = r.i64()?;
        let (rows, len) = match (usize::try_from(rows), usize::try_from(cols)) {
            (Ok(rows), Ok(cols)) if cols == dim => match rows.checked_mul(dim) {
                Some(len) => (rows, len),
                None => {
                    return Err(EmbeddingError::Resource(format!(
                        "input matrix of {} rows x {} is too large",
                        rows, dim
                    )))
                }
            },
            _ => {
                return Err(EmbeddingError::Resource(format!(
                    "input matrix is {} x {}, expected width {}",
                    rows, cols, dim
                )))
            }
        };
        let expected_rows = match &prune_index {
            Some(index) => nwords.saturating_add(index.len()),
            None => nwords.saturating_add(bucket),
        };
        if rows < expected_rows {
            return Err(EmbeddingError::Resource(format!(
                "input matrix has {} rows, expected at least {}",
                rows, expected_rows
            )));
        }
        let mut input = Vec::new();
        for _ in 0..len {
            input.push(r.f32()?);
        }

        Ok(Self::assemble(
            "fasttext".to_string(),
            args,
            words,
            counts,
            prune_index,
            input,
        ))
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// FNV-1a over bytes, XOR-ing each byte sign-extended as fastText does.
pub fn fasttext_hash(bytes: &[u8]) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for &b in bytes {
        h ^= (b as i8) as u32;
        h = h.wrapping_mul(16_777_619);
    }
    h
}

struct BinReader<'a, R: Read> {
    inner: &'a mut R,
}

impl<R: Read> BinReader<'_, R> {
    fn bytes<const N: usize>(&mut self) -> EmbeddingResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(truncated)?;
        Ok(buf)
    }

    fn u8(&mut self) -> EmbeddingResult<u8> {
        Ok(self.bytes::<1>()?[0])
    }

    fn i8(&mut self) -> EmbeddingResult<i8> {
        Ok(i8::from_le_bytes(self.bytes()?))
    }

    fn i32(&mut self) -> EmbeddingResult<i32> {
        Ok(i32::from_le_bytes(self.bytes()?))
    }

    fn i64(&mut self) -> EmbeddingResult<i64> {
        Ok(i64::from_le_bytes(self.bytes()?))
    }

    fn f32(&mut self) -> EmbeddingResult<f32> {
        Ok(f32::from_le_bytes(self.bytes()?))
    }

    fn f64(&mut self) -> EmbeddingResult<f64> {
        Ok(f64::from_le_bytes(self.bytes()?))
    }

    fn usize32(&mut self, field: &str) -> EmbeddingResult<usize> {
        let v = self.i32()?;
        usize::try_from(v)
            .map_err(|_| EmbeddingError::Resource(format!("negative {} in header: {}", field, v)))
    }

    fn cstring(&mut self) -> EmbeddingResult<String> {
        let mut buf = Vec::new();
        loop {
            match self.u8()? {
                0 => break,
                b => buf.push(b),
            }
        }
        String::from_utf8(buf)
            .map_err(|e| EmbeddingError::Resource(format!("dictionary entry is not UTF-8: {}", e)))
    }
}

fn truncated(e: std::io::Error) -> EmbeddingError {
    EmbeddingError::Resource(format!("truncated fastText model: {}", e))
}

impl LoadResource for SubwordModel {
    const KIND: &'static str = "fastText";

    fn load(path: &Path) -> EmbeddingResult<Self> {
        let file = File::open(path).map_err(|e| {
            EmbeddingError::Resource(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let mut reader = BufReader::new(file);
        let mut model = Self::read_from(&mut reader)
            .map_err(|e| EmbeddingError::Resource(format!("{}: {}", path.display(), e)))?;
        if let Some(stem) = path.file_stem() {
            model.name = stem.to_string_lossy().into_owned();
        }
        debug!(
            words = model.nwords(),
            dim = model.dim(),
            bucket = model.args.bucket,
            "loaded fastText model"
        );
        Ok(model)
    }
}

impl Embedder for SubwordModel {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.sentence_vector(text))
    }

    fn dimension(&self) -> usize {
        self.args.dim
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two words, dim 2, 4 buckets; row values are distinct per row.
    fn tiny() -> SubwordModel {
        let args = SubwordArgs::new(2, 2, 3, 4);
        let words = vec!["red".to_string(), "blue".to_string()];
        let input: Vec<f32> = (0..6).flat_map(|i| [i as f32 + 1.0, -(i as f32)]).collect();
        SubwordModel::new(args, words, input).unwrap()
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(fasttext_hash(b""), 2_166_136_261);
        assert_eq!(fasttext_hash(b"a"), 0xe40c_292c);
        // Bytes above 0x7f are sign-extended before the XOR.
        let unsigned = "é".bytes().fold(2_166_136_261u32, |h, b| {
            (h ^ b as u32).wrapping_mul(16_777_619)
        });
        assert_ne!(fasttext_hash("é".as_bytes()), unsigned);
    }

    #[test]
    fn in_vocab_word_uses_own_row() {
        let model = tiny();
        let ids = model.subword_ids("red");
        assert_eq!(ids[0], 0);
        assert!(ids[1..].iter().all(|&id| id >= 2 && id < 6));
    }

    #[test]
    fn oov_word_is_composed_from_ngrams() {
        let model = tiny();
        assert!(!model.contains("reed"));
        let ids = model.subword_ids("reed");
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|&id| id >= 2));
        assert!(l2_norm(&model.word_vector("reed")) > 0.0);
    }

    #[test]
    fn ngrams_respect_utf8_boundaries() {
        let model = tiny();
        // "<é>" has 3 characters; minn=2, maxn=3 gives "<é", "é>", "<é>".
        assert_eq!(model.subword_ids("é").len(), 3);
    }

    #[test]
    fn no_ngrams_without_buckets() {
        let args = SubwordArgs::new(2, 3, 6, 0);
        let model = SubwordModel::new(args, vec!["red".into()], vec![1.0, 1.0]).unwrap();
        assert_eq!(model.subword_ids("red"), vec![0]);
        assert_eq!(model.word_vector("blue"), vec![0.0, 0.0]);
        assert_eq!(model.sentence_vector("blue"), vec![0.0, 0.0]);
    }

    #[test]
    fn sentence_vector_averages_unit_vectors() {
        let args = SubwordArgs::new(2, 3, 6, 0);
        let words = vec!["a".to_string(), "b".to_string()];
        let model = SubwordModel::new(args, words, vec![3.0, 0.0, 0.0, 5.0]).unwrap();
        assert_eq!(model.sentence_vector("a b zzz"), vec![0.5, 0.5]);
        assert_eq!(model.sentence_vector(""), vec![0.0, 0.0]);
    }

    #[test]
    fn rejects_wrong_matrix_size() {
        let args = SubwordArgs::new(2, 3, 6, 4);
        assert!(SubwordModel::new(args, vec!["a".into()], vec![0.0; 4]).is_err());
    }

    #[test]
    fn save_and_load_preserve_vectors() {
        let model = tiny();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tiny.bin");
        model.save(&path).unwrap();

        let loaded = SubwordModel::load(&path).unwrap();
        assert_eq!(loaded.args(), model.args());
        assert_eq!(loaded.words(), model.words());
        assert_eq!(loaded.model_name(), "tiny");
        for word in ["red", "blue", "reed", "bleu"] {
            assert_eq!(loaded.word_vector(word), model.word_vector(word));
        }
    }

    #[test]
    fn rejects_garbage_and_truncation() {
        let mut junk: &[u8] = b"not a model at all";
        assert!(SubwordModel::read_from(&mut junk).is_err());

        let mut bytes = Vec::new();
        tiny().write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() / 2);
        let mut slice = bytes.as_slice();
        let err = SubwordModel::read_from(&mut slice).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    /// Serialized `tiny()` with `bytes` written at `offset`.
    fn patched(offset: usize, bytes: &[u8]) -> Vec<u8> {
        let mut model = Vec::new();
        tiny().write_to(&mut model).unwrap();
        model[offset..offset + bytes.len()].copy_from_slice(bytes);
        model
    }

    // Dictionary header offsets: size, nwords, prune size.
    const SIZE_AT: usize = 64;
    const NWORDS_AT: usize = 68;
    const PRUNE_AT: usize = 84;

    #[test]
    fn oversized_header_counts_fail_cleanly() {
        let mut bytes = patched(SIZE_AT, &i32::MAX.to_le_bytes());
        bytes[NWORDS_AT..NWORDS_AT + 4].copy_from_slice(&i32::MAX.to_le_bytes());
        let err = SubwordModel::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, EmbeddingError::Resource(_)));

        let bytes = patched(PRUNE_AT, &i64::MAX.to_le_bytes());
        let err = SubwordModel::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("prune index size"));

        let bytes = patched(PRUNE_AT, &i64::from(i32::MAX).to_le_bytes());
        let err = SubwordModel::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn oversized_matrix_fails_cleanly() {
        let mut model = Vec::new();
        tiny().write_to(&mut model).unwrap();
        // Input matrix header sits after the quantization flag.
        let rows_at = model.len() - (1 + 8 + 8) - (8 + 8 + 6 * 2 * 4);

        let bytes = patched(rows_at, &i64::MAX.to_le_bytes());
        let err = SubwordModel::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let bytes = patched(rows_at, &(i64::MAX / 4).to_le_bytes());
        let err = SubwordModel::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn rejects_quantized_models() {
        let mut bytes = Vec::new();
        tiny().write_to(&mut bytes).unwrap();
        // The quantization flag directly follows the dictionary.
        let dict_end = bytes.len() - (1 + 8 + 8 + 6 * 2 * 4) - (1 + 8 + 8);
        bytes[dict_end] = 1;
        let mut slice = bytes.as_slice();
        let err = SubwordModel::read_from(&mut slice).unwrap_err();
        assert!(err.to_string().contains("quantized"));
    }
}
