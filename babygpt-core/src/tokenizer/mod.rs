//! Tokenization: encode text to token ids and decode back.
//!
//! This module defines the **trait** ([`Tokenizer`]) and **error** ([`TokenizerError`]).
//! Implementations live in the `impls` submodule ([`CharTokenizer`] for character-level).

mod error;
mod impls;
mod vocab;

pub use error::TokenizerError;
pub use impls::CharTokenizer;
pub use vocab::Vocab;

/// Trait for tokenizers: encode text to ids and decode ids to text.
pub trait Tokenizer {
    /// Encodes a string into a sequence of token ids.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::UnknownSymbol`] if a character is not in the vocabulary.
    fn encode(&self, s: &str) -> Result<Vec<usize>, TokenizerError>;

    /// Decodes a sequence of token ids into a string.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::InvalidId`] if an id is out of range.
    fn decode(&self, ids: &[usize]) -> Result<String, TokenizerError>;

    /// Vocabulary size (number of distinct tokens).
    fn vocab_size(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_tokenizer_vocab_of_repeated_words() {
        let t = CharTokenizer::from_corpus("abc abc");
        assert_eq!(t.vocab_size(), 4, "space, a, b, c");
        let ids = t.encode("abc").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(t.decode(&ids).unwrap(), "abc");
    }

    #[test]
    fn char_tokenizer_ids_follow_sorted_characters() {
        let t = CharTokenizer::from_corpus("cab a");
        assert_eq!(t.symbols(), &[' ', 'a', 'b', 'c']);
        assert_eq!(t.encode(" abc").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn char_tokenizer_is_deterministic_across_builds() {
        let a = CharTokenizer::from_corpus("hello world");
        let b = CharTokenizer::from_corpus("dlrow olleh");
        assert_eq!(a.symbols(), b.symbols());
        assert_eq!(a.encode("hello").unwrap(), b.encode("hello").unwrap());
    }

    #[test]
    fn char_tokenizer_encode_decode_round_trip() {
        let corpus = "First Citizen:\nBefore we proceed any further, hear me speak.";
        let t = CharTokenizer::from_corpus(corpus);
        let ids = t.encode(corpus).unwrap();
        assert_eq!(ids.len(), corpus.chars().count());
        assert_eq!(t.decode(&ids).unwrap(), corpus);
    }

    #[test]
    fn char_tokenizer_handles_multibyte_characters() {
        let t = CharTokenizer::from_corpus("héllo ✓");
        let ids = t.encode("✓é").unwrap();
        assert_eq!(t.decode(&ids).unwrap(), "✓é");
    }

    #[test]
    fn char_tokenizer_unknown_char_returns_error() {
        let t = CharTokenizer::from_corpus("ab");
        let result = t.encode("abc");
        assert_eq!(result, Err(TokenizerError::UnknownSymbol("c".to_string())));
    }

    #[test]
    fn char_tokenizer_decode_invalid_id_returns_error() {
        let t = CharTokenizer::from_corpus("a");
        let result = t.decode(&[0, 100]);
        assert!(matches!(result, Err(TokenizerError::InvalidId(100))));
    }

    #[test]
    fn char_tokenizer_rebuilds_from_symbols() {
        let t = CharTokenizer::from_corpus("the quick brown fox");
        let rebuilt = CharTokenizer::from_symbols(t.symbols());
        assert_eq!(rebuilt.symbols(), t.symbols());
        assert_eq!(rebuilt.encode("fox").unwrap(), t.encode("fox").unwrap());
    }

    #[test]
    fn empty_corpus_gives_empty_vocab() {
        let t = CharTokenizer::from_corpus("");
        assert_eq!(t.vocab_size(), 0);
        assert_eq!(t.decode(&[]).unwrap(), "");
    }

    #[test]
    fn vocab_collapses_duplicates() {
        let v = Vocab::new("banana".chars());
        assert_eq!(v.len(), 3);
        assert_eq!(v.get_id('a'), Some(0));
        assert_eq!(v.get_symbol(2), Some('n'));
        assert_eq!(v.get_id('z'), None);
        assert!(!v.is_empty());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            TokenizerError::UnknownSymbol("x".into()).to_string(),
            "tokenizer: unknown symbol \"x\""
        );
        assert_eq!(TokenizerError::InvalidId(7).to_string(), "tokenizer: invalid id 7");
    }
}
