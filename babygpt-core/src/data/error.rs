//! Errors produced when loading the corpus or preparing training data.
//!
//! All errors from the data module use [`DataError`]; the crate-level
//! [`Error`](crate::Error) wraps it.

use thiserror::Error;

/// Errors produced by the data module.
///
/// # Variants
///
/// - **Io**: Failed to read the corpus (e.g. file not found, permission denied, invalid UTF-8).
///   *When*: Reading the path in [`PathLoader`](super::PathLoader) or [`load_corpus`](super::load_corpus).
///   *Recovery*: Ensure the path exists, is readable, and contains valid UTF-8.
///
/// - **EmptyCorpus**: The file was read successfully but contains no text.
///   *When*: Building a [`Corpus`](super::Corpus) from an empty string.
///   *Recovery*: Provide a non-empty corpus.
///
/// - **InsufficientData**: A train or validation split holds fewer than `context_length + 1` tokens,
///   so not a single (context, target) pair can be cut from it.
///   *When*: In [`Dataset::split`](super::Dataset::split).
///   *Recovery*: Use a larger corpus, a smaller `context_length`, or a different `train_split`.
#[derive(Debug, Error)]
pub enum DataError {
    /// I/O error while reading the corpus file.
    #[error("data io: {0}")]
    Io(#[from] std::io::Error),

    /// The corpus contains no characters.
    #[error("data: corpus is empty")]
    EmptyCorpus,

    /// A split is too short for one training example.
    #[error("data: {split} split has {available} tokens, needs at least {needed}")]
    InsufficientData {
        split: &'static str,
        needed: usize,
        available: usize,
    },
}
