//! Character-level tokenizer: one token per character, vocab built from the corpus's distinct characters.

use super::super::Vocab;
use super::super::{Tokenizer, TokenizerError};

/// Character-level tokenizer. Ids follow the sorted order of the distinct corpus characters,
/// so two tokenizers built from corpora with the same character set are identical.
#[derive(Clone, Debug)]
pub struct CharTokenizer {
    vocab: Vocab,
}

impl CharTokenizer {
    /// Builds a char tokenizer from a corpus string. An empty corpus gives an empty vocab.
    #[must_use]
    pub fn from_corpus(corpus: &str) -> Self {
        CharTokenizer {
            vocab: Vocab::new(corpus.chars()),
        }
    }

    /// Rebuilds a tokenizer from a symbol list previously returned by [`symbols`](Self::symbols)
    /// (e.g. one stored in a checkpoint).
    #[must_use]
    pub fn from_symbols(symbols: &[char]) -> Self {
        CharTokenizer {
            vocab: Vocab::new(symbols.iter().copied()),
        }
    }

    /// The vocabulary characters in id order.
    #[must_use]
    pub fn symbols(&self) -> &[char] {
        self.vocab.symbols()
    }
}

impl Tokenizer for CharTokenizer {
    fn encode(&self, s: &str) -> Result<Vec<usize>, TokenizerError> {
        s.chars()
            .map(|ch| {
                self.vocab
                    .get_id(ch)
                    .ok_or_else(|| TokenizerError::UnknownSymbol(ch.to_string()))
            })
            .collect()
    }

    fn decode(&self, ids: &[usize]) -> Result<String, TokenizerError> {
        let mut s = String::with_capacity(ids.len());
        for &id in ids {
            let ch = self
                .vocab
                .get_symbol(id)
                .ok_or(TokenizerError::InvalidId(id))?;
            s.push(ch);
        }
        Ok(s)
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}
