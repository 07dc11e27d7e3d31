//! Lexical vector tables (word → vector), loaded from word2vec text files.

use crate::normalize::{add_into, scale_mean};
use crate::source::{file_in, read_resource, LoadResource};
use crate::tokenize::lexical_tokens;
use crate::{Embedder, EmbeddingError, EmbeddingResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// File looked up when a table is loaded from a directory.
pub const VECTORS_FILE: &str = "vectors.txt";

/// A dense table of fixed-width vectors keyed by string.
///
/// Row order is the order keys were first inserted (file order when loaded),
/// which frequency-sorted tables rely on.
///
/// # Example
///
/// ```rust
/// use langvec_embeddings::{Embedder, VectorTable};
///
/// let table = VectorTable::from_pairs(vec![
///     ("red", vec![1.0, 0.0]),
///     ("blue", vec![0.0, 1.0]),
/// ]).unwrap();
/// assert_eq!(table.embed("red blue").unwrap(), vec![0.5, 0.5]);
/// ```
#[derive(Debug, Clone)]
pub struct VectorTable {
    name: String,
    dimension: usize,
    keys: Vec<String>,
    index: HashMap<String, usize>,
    data: Vec<f32>,
}

impl VectorTable {
    /// Create an empty table of the given width.
    pub fn new(dimension: usize) -> Self {
        Self {
            name: "in-memory".to_string(),
            dimension,
            keys: Vec::new(),
            index: HashMap::new(),
            data: Vec::new(),
        }
    }

    /// Build a table from `(key, vector)` pairs. All vectors must share a
    /// width and at least one pair is required.
    pub fn from_pairs<I, K>(pairs: I) -> EmbeddingResult<Self>
    where
        I: IntoIterator<Item = (K, Vec<f32>)>,
        K: Into<String>,
    {
        let mut pairs = pairs.into_iter().peekable();
        let dimension = pairs
            .peek()
            .map(|(_, v)| v.len())
            .ok_or_else(|| EmbeddingError::Resource("Vector table has no entries".to_string()))?;
        let mut table = Self::new(dimension);
        for (key, vector) in pairs {
            table.insert(key, vector)?;
        }
        Ok(table)
    }

    /// Set the display name reported by [`Embedder::model_name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Insert or overwrite a vector.
    pub fn insert(&mut self, key: impl Into<String>, vector: Vec<f32>) -> EmbeddingResult<()> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let key = key.into();
        match self.index.get(&key) {
            Some(&row) => {
                let start = row * self.dimension;
                self.data[start..start + self.dimension].copy_from_slice(&vector);
            }
            None => {
                self.index.insert(key.clone(), self.keys.len());
                self.keys.push(key);
                self.data.extend(vector);
            }
        }
        Ok(())
    }

    /// Vector for an exact key.
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.index.get(key).map(|&row| self.row(row))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Exact key, then its lowercase form.
    pub fn get_folded(&self, key: &str) -> Option<&[f32]> {
        self.get(key).or_else(|| {
            let lower = key.to_lowercase();
            if lower != key {
                self.get(&lower)
            } else {
                None
            }
        })
    }

    fn row(&self, row: usize) -> &[f32] {
        let start = row * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Keys in row order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Parse word2vec text format: an optional `count dim` header, then one
    /// `key v1 .. vd` line per entry.
    ///
    /// A first line of two integers is only a header when the line after it
    /// holds `dim` values; otherwise it is a one-dimensional entry.
    pub fn parse(content: &str) -> EmbeddingResult<Self> {
        let lines: Vec<(usize, &str)> = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .collect();

        let mut body = lines.as_slice();
        let mut declared: Option<(usize, usize)> = None;
        if let [(_, first), rest @ ..] = body {
            if let Some((count, dim)) = parse_header(first) {
                let fits = rest
                    .first()
                    .map_or(true, |(_, next)| next.split_whitespace().count() == dim + 1);
                if fits {
                    declared = Some((count, dim));
                    body = rest;
                }
            }
        }

        let mut table: Option<VectorTable> = None;
        for &(lineno, line) in body {
            let mut fields = line.split_whitespace();
            let key = fields.next().unwrap_or_default();
            let vector = fields
                .map(|f| f.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| {
                    EmbeddingError::Resource(format!("line {}: bad float: {}", lineno + 1, e))
                })?;

            let table = table.get_or_insert_with(|| {
                VectorTable::new(declared.map(|(_, d)| d).unwrap_or(vector.len()))
            });
            if vector.len() != table.dimension {
                return Err(EmbeddingError::Resource(format!(
                    "line {}: expected {} values for {:?}, found {}",
                    lineno + 1,
                    table.dimension,
                    key,
                    vector.len()
                )));
            }
            table.insert(key, vector)?;
        }

        let table = table
            .filter(|t| t.dimension > 0)
            .ok_or_else(|| EmbeddingError::Resource("Vector file has no entries".to_string()))?;
        if let Some((count, _)) = declared {
            if count != table.len() {
                warn!(declared = count, found = table.len(), "vector file header count mismatch");
            }
        }
        Ok(table)
    }

    /// Mean of the vectors of every lexical token in `text`.
    fn mean_of_tokens(&self, text: &str) -> Vec<f32> {
        let tokens = lexical_tokens(text);
        let mut acc = vec![0.0f32; self.dimension];
        for token in &tokens {
            if let Some(v) = self.get_folded(token) {
                add_into(&mut acc, v);
            }
        }
        scale_mean(&mut acc, tokens.len());
        acc
    }
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        [count, dim] => Some((count.parse().ok()?, dim.parse().ok()?)),
        _ => None,
    }
}

impl LoadResource for VectorTable {
    const KIND: &'static str = "vector table";

    fn load(path: &Path) -> EmbeddingResult<Self> {
        let file = file_in(path, VECTORS_FILE);
        let content = read_resource(&file)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vectors".to_string());
        let table = Self::parse(&content)
            .map_err(|e| EmbeddingError::Resource(format!("{}: {}", file.display(), e)))?
            .with_name(name);
        debug!(entries = table.len(), dimension = table.dimension, "loaded vector table");
        Ok(table)
    }
}

impl Embedder for VectorTable {
    /// Document vector: the mean over all tokens, with out-of-vocabulary
    /// tokens counted as zero vectors. Text without tokens maps to zeros.
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.mean_of_tokens(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> VectorTable {
        VectorTable::from_pairs(vec![
            ("red", vec![1.0, 0.0]),
            ("green", vec![0.5, 0.5]),
            ("blue", vec![0.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_and_fold() {
        let table = colors();
        assert_eq!(table.get("red"), Some(&[1.0, 0.0][..]));
        assert_eq!(table.get("Red"), None);
        assert_eq!(table.get_folded("Red"), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn oov_tokens_count_as_zero() {
        let table = colors();
        assert_eq!(table.embed("red dog").unwrap(), vec![0.5, 0.0]);
        assert_eq!(table.embed("dog cat").unwrap(), vec![0.0, 0.0]);
        assert_eq!(table.embed("").unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn parse_with_and_without_header() {
        let with = VectorTable::parse("2 3\nred 1 0 0\nblue 0 0 1\n").unwrap();
        assert_eq!(with.len(), 2);
        assert_eq!(with.dimension(), 3);

        let without = VectorTable::parse("red 1 0\nblue 0 1\n").unwrap();
        assert_eq!(without.dimension(), 2);
        assert_eq!(without.keys(), &["red".to_string(), "blue".to_string()]);
    }

    #[test]
    fn integer_first_row_is_not_always_a_header() {
        let one_d = VectorTable::parse("7 2\n8 3\n").unwrap();
        assert_eq!(one_d.dimension(), 1);
        assert_eq!(one_d.keys(), &["7".to_string(), "8".to_string()]);
        assert_eq!(one_d.get("7"), Some(&[2.0][..]));

        let headed = VectorTable::parse("1 1\n7 2\n").unwrap();
        assert_eq!(headed.keys(), &["7".to_string()]);

        assert!(VectorTable::parse("4 2\n").is_err());
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = VectorTable::parse("red 1 0\nblue 0 1 1\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn parse_rejects_bad_floats_and_empty() {
        assert!(VectorTable::parse("red 1 x\n").is_err());
        assert!(VectorTable::parse("\n\n").is_err());
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut table = colors();
        table.insert("red", vec![0.25, 0.75]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("red"), Some(&[0.25, 0.75][..]));
        assert!(table.insert("red", vec![1.0]).is_err());
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(VECTORS_FILE), "red 1 0\nblue 0 1\n").unwrap();
        let table = VectorTable::load(dir.path()).unwrap();
        assert_eq!(table.len(), 2);
    }
}
