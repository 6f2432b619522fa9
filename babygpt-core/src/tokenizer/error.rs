//! Errors produced when encoding or decoding with a tokenizer.
//!
//! All errors from the tokenizer module use [`TokenizerError`].

use thiserror::Error;

/// Errors produced by the tokenizer module.
///
/// # Variants
///
/// - **UnknownSymbol**: A character was encountered that is not in the vocabulary.
///   *When*: During [`encode`](super::Tokenizer::encode) when the input contains a character the
///   corpus never contained (e.g. a generation prompt typed by the user).
///   *Recovery*: Restrict the input to characters of the training corpus.
///
/// - **InvalidId**: A token id is out of range for the vocabulary.
///   *When*: During [`decode`](super::Tokenizer::decode) when an id is not in `[0, vocab_size)`.
///   *Recovery*: Ensure the ids were produced by this tokenizer or by a model built for its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizerError {
    /// A symbol not in the vocabulary was encountered during encode.
    #[error("tokenizer: unknown symbol {0:?}")]
    UnknownSymbol(String),

    /// A token id is out of range during decode.
    #[error("tokenizer: invalid id {0}")]
    InvalidId(usize),
}
