//! Text input shapes accepted by `fit` and `transform`.
//!
//! Adapters only accept a 1-D column of strings. A bare string (0-D) or a
//! table of strings (2-D) is representable so it can be rejected with a
//! typed error instead of being silently reinterpreted.

use crate::{EmbeddingError, EmbeddingResult};

/// A batch of text handed to an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput<'a> {
    /// A single raw string (0-D).
    Text(&'a str),
    /// A sequence of strings (1-D).
    Column(Vec<&'a str>),
    /// Rows of strings (2-D).
    Table(Vec<Vec<&'a str>>),
}

impl<'a> TextInput<'a> {
    /// Build 2-D input from rows.
    pub fn table<R, S>(rows: &'a [R]) -> Self
    where
        R: AsRef<[S]>,
        S: AsRef<str> + 'a,
    {
        TextInput::Table(
            rows.iter()
                .map(|row| row.as_ref().iter().map(|s| s.as_ref()).collect())
                .collect(),
        )
    }

    /// Number of samples, regardless of shape validity.
    pub fn len(&self) -> usize {
        match self {
            TextInput::Text(_) => 1,
            TextInput::Column(items) => items.len(),
            TextInput::Table(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The 1-D view of this input, or `InputShape` for anything else.
    pub fn column(&self) -> EmbeddingResult<&[&'a str]> {
        match self {
            TextInput::Column(items) => Ok(items),
            TextInput::Text(text) => Err(EmbeddingError::InputShape(format!(
                "Expected a 1D sequence of strings, got a scalar string {:?}. \
                 Wrap it in a slice if it is a single sample.",
                truncate(text)
            ))),
            TextInput::Table(rows) => {
                let width = rows.first().map(|r| r.len()).unwrap_or(0);
                Err(EmbeddingError::InputShape(format!(
                    "Expected a 1D sequence of strings, got 2D input with shape ({}, {})",
                    rows.len(),
                    width
                )))
            }
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(32).collect()
}

impl<'a> From<&'a str> for TextInput<'a> {
    fn from(text: &'a str) -> Self {
        TextInput::Text(text)
    }
}

impl<'a> From<&'a String> for TextInput<'a> {
    fn from(text: &'a String) -> Self {
        TextInput::Text(text.as_str())
    }
}

impl<'a, S: AsRef<str>> From<&'a [S]> for TextInput<'a> {
    fn from(items: &'a [S]) -> Self {
        TextInput::Column(items.iter().map(|s| s.as_ref()).collect())
    }
}

impl<'a, S: AsRef<str>, const N: usize> From<&'a [S; N]> for TextInput<'a> {
    fn from(items: &'a [S; N]) -> Self {
        TextInput::Column(items.iter().map(|s| s.as_ref()).collect())
    }
}

impl<'a, S: AsRef<str>> From<&'a Vec<S>> for TextInput<'a> {
    fn from(items: &'a Vec<S>) -> Self {
        TextInput::Column(items.iter().map(|s| s.as_ref()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_from_slices() {
        let owned = vec!["red".to_string(), "green".to_string()];
        let input = TextInput::from(&owned);
        assert_eq!(input.column().unwrap(), &["red", "green"]);

        let input = TextInput::from(&["a", "b", "c"]);
        assert_eq!(input.len(), 3);
    }

    #[test]
    fn scalar_is_rejected() {
        let input = TextInput::from("red green");
        let err = input.column().unwrap_err();
        assert!(matches!(err, EmbeddingError::InputShape(_)));
    }

    #[test]
    fn table_is_rejected() {
        let rows = vec![vec!["a", "b"], vec!["c", "d"]];
        let input = TextInput::table(&rows);
        let err = input.column().unwrap_err();
        assert!(err.to_string().contains("(2, 2)"));
    }

    #[test]
    fn empty_column_is_valid() {
        let empty: Vec<String> = Vec::new();
        let input = TextInput::from(&empty);
        assert!(input.column().unwrap().is_empty());
    }
}
