//! Errors produced by the language model.

use thiserror::Error;

use crate::config::ConfigError;
use crate::tokenizer::TokenizerError;

/// Errors produced when building the model, running a forward pass or generating.
///
/// # Variants
///
/// - **SequenceTooLong**: A sequence is longer than `context_length`.
///   *Recovery*: Crop the input to the last `context_length` ids ([`generate`](super::LanguageModel::generate) does this).
///
/// - **TokenOutOfRange**: An input or target id is `>= vocab_size`.
///
/// - **ShapeMismatch**: `ids` cannot be divided into `batch_size` equal sequences, or
///   `targets` has a different length than `ids`.
///
/// - **EmptyInput**: No ids were given (or `batch_size` is zero).
///
/// - **InvalidConfig**: The configuration passed to [`LanguageModel::new`](super::LanguageModel::new) failed validation.
///
/// - **InvalidTemperature**: Sampling temperature is not a positive number.
///
/// - **Sampling**: The next-token distribution could not be sampled (e.g. non-finite probabilities
///   from a diverged model).
///
/// - **Tokenizer**: Encoding the seed text or decoding the result failed in [`generate_text`](super::generate_text).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model: sequence of {len} tokens exceeds context length {max}")]
    SequenceTooLong { len: usize, max: usize },

    #[error("model: token id {id} out of range for vocabulary of {vocab_size}")]
    TokenOutOfRange { id: usize, vocab_size: usize },

    #[error("model: shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("model: empty input")]
    EmptyInput,

    #[error("model: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("model: temperature must be positive, got {0}")]
    InvalidTemperature(f64),

    #[error("model: cannot sample next token: {0}")]
    Sampling(String),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}
