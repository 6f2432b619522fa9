//! Train/validation split of the encoded corpus.

use log::warn;

use super::DataError;

/// Which part of the dataset to read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Split {
    Train,
    Validation,
}

impl Split {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
        }
    }
}

/// Encoded corpus split into a leading training part and a trailing validation part.
///
/// Every present split holds at least `context_length + 1` tokens, so a batch can
/// always be sampled from it.
#[derive(Clone, Debug)]
pub struct Dataset {
    train: Vec<usize>,
    validation: Option<Vec<usize>>,
}

impl Dataset {
    /// Splits `tokens` at `floor(len * train_split)`: the first part trains, the rest validates.
    /// With `train_split >= 1.0` there is no validation split.
    ///
    /// # Errors
    ///
    /// - [`DataError::InsufficientData`] when a split has fewer than `context_length + 1` tokens.
    pub fn split(
        mut tokens: Vec<usize>,
        train_split: f64,
        context_length: usize,
    ) -> Result<Self, DataError> {
        let needed = context_length + 1;
        let validation = if train_split >= 1.0 {
            warn!("train_split is 1.0; validation loss will not be reported");
            None
        } else {
            let cut = ((tokens.len() as f64) * train_split).floor() as usize;
            let validation = tokens.split_off(cut.min(tokens.len()));
            if validation.len() < needed {
                return Err(DataError::InsufficientData {
                    split: Split::Validation.name(),
                    needed,
                    available: validation.len(),
                });
            }
            Some(validation)
        };
        if tokens.len() < needed {
            return Err(DataError::InsufficientData {
                split: Split::Train.name(),
                needed,
                available: tokens.len(),
            });
        }
        Ok(Dataset {
            train: tokens,
            validation,
        })
    }

    #[must_use]
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    #[must_use]
    pub fn validation(&self) -> Option<&[usize]> {
        self.validation.as_deref()
    }

    /// Tokens of `split`, or `None` for a disabled validation split.
    #[must_use]
    pub fn tokens(&self, split: Split) -> Option<&[usize]> {
        match split {
            Split::Train => Some(self.train()),
            Split::Validation => self.validation(),
        }
    }
}
