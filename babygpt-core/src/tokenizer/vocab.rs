//! Vocabulary: bijection between token ids and single-character symbols.

use std::collections::{BTreeSet, HashMap};

/// Maps token ids to characters and back. Ids are contiguous from `0` to `len - 1`
/// and follow the sorted (Unicode scalar) order of the characters.
#[derive(Clone, Debug)]
pub struct Vocab {
    id_to_sym: Vec<char>,
    sym_to_id: HashMap<char, usize>,
}

impl Vocab {
    /// Builds a vocab from every distinct character of `symbols`, sorted.
    /// Duplicates collapse to one entry, so the result only depends on the set of characters.
    #[must_use]
    pub fn new(symbols: impl IntoIterator<Item = char>) -> Self {
        let sorted: BTreeSet<char> = symbols.into_iter().collect();
        let id_to_sym: Vec<char> = sorted.into_iter().collect();
        let sym_to_id = id_to_sym
            .iter()
            .enumerate()
            .map(|(id, &ch)| (ch, id))
            .collect();
        Vocab {
            id_to_sym,
            sym_to_id,
        }
    }

    /// Returns the number of symbols (vocab size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_sym.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_sym.is_empty()
    }

    /// Returns the character for `id`, or `None` if out of range.
    #[must_use]
    pub fn get_symbol(&self, id: usize) -> Option<char> {
        self.id_to_sym.get(id).copied()
    }

    /// Returns the id for `symbol`, or `None` if not in vocab.
    #[must_use]
    pub fn get_id(&self, symbol: char) -> Option<usize> {
        self.sym_to_id.get(&symbol).copied()
    }

    /// All symbols in id order.
    #[must_use]
    pub fn symbols(&self) -> &[char] {
        &self.id_to_sym
    }
}
