//! [`Corpus`]: the raw training text.

use std::fmt;

use super::DataError;

/// The full training text, guaranteed non-empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Corpus(String);

impl Corpus {
    /// Wraps `text` as a corpus.
    ///
    /// # Errors
    ///
    /// - [`DataError::EmptyCorpus`] when `text` is empty.
    pub fn new(text: impl Into<String>) -> Result<Self, DataError> {
        let text = text.into();
        if text.is_empty() {
            return Err(DataError::EmptyCorpus);
        }
        Ok(Corpus(text))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters (not bytes).
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
