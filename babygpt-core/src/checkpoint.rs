//! JSON checkpoints: model dimensions, vocabulary and every named parameter.
//!
//! The vocabulary travels with the weights, so a reloaded model decodes with
//! exactly the tokenizer it was trained with.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::model::{LanguageModel, ModelError};
use crate::tokenizer::{CharTokenizer, Tokenizer};

/// Version written by [`Checkpoint::from_model`]; other versions are rejected on load.
pub const FORMAT_VERSION: u32 = 1;

/// Errors produced when saving or loading a checkpoint.
///
/// # Variants
///
/// - **Io**: The file could not be read or written.
/// - **Json**: The file is not a valid checkpoint document.
/// - **UnsupportedVersion**: The document was written by an incompatible format version.
/// - **InvalidVocab**: The stored vocabulary is not in strictly increasing character order.
/// - **MissingParameter**: A parameter the model needs is absent from the document.
/// - **ShapeMismatch**: A stored parameter's shape differs from the model built from the stored dimensions.
/// - **Model**: The stored dimensions do not form a valid model.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checkpoint: unsupported format version {found} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },

    #[error("checkpoint: vocabulary is not sorted and distinct at index {index}")]
    InvalidVocab { index: usize },

    #[error("checkpoint: missing parameter {0}")]
    MissingParameter(String),

    #[error("checkpoint: parameter {name} is {found:?}, model expects {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Architecture hyperparameters needed to rebuild the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDims {
    pub context_length: usize,
    pub model_width: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub dropout_rate: f64,
    pub layer_norm_eps: f64,
}

impl ModelDims {
    fn from_config(config: &Config) -> Self {
        ModelDims {
            context_length: config.context_length,
            model_width: config.model_width,
            num_heads: config.num_heads,
            num_layers: config.num_layers,
            dropout_rate: config.dropout_rate,
            layer_norm_eps: config.layer_norm_eps,
        }
    }

    fn to_config(&self) -> Config {
        Config {
            context_length: self.context_length,
            model_width: self.model_width,
            num_heads: self.num_heads,
            num_layers: self.num_layers,
            dropout_rate: self.dropout_rate,
            layer_norm_eps: self.layer_norm_eps,
            ..Config::default()
        }
    }
}

/// One parameter matrix, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredTensor {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

/// The serialized form of a trained model and its vocabulary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub dims: ModelDims,
    /// Vocabulary characters in id order.
    pub vocab: Vec<char>,
    pub parameters: Vec<StoredTensor>,
}

impl Checkpoint {
    /// Snapshot of `model`'s parameters and `tokenizer`'s vocabulary.
    #[must_use]
    pub fn from_model(model: &LanguageModel, tokenizer: &CharTokenizer) -> Self {
        let parameters = model
            .named_parameters()
            .into_iter()
            .map(|(name, t)| {
                let (rows, cols) = t.shape();
                StoredTensor {
                    name,
                    rows,
                    cols,
                    values: t.data(),
                }
            })
            .collect();
        Checkpoint {
            version: FORMAT_VERSION,
            dims: ModelDims::from_config(model.config()),
            vocab: tokenizer.symbols().to_vec(),
            parameters,
        }
    }

    /// Rebuilds the model and tokenizer.
    ///
    /// # Errors
    ///
    /// - [`CheckpointError::UnsupportedVersion`] for a foreign format version.
    /// - [`CheckpointError::InvalidVocab`] when the vocabulary has duplicates or is out of order.
    /// - [`CheckpointError::Model`] when the dimensions are invalid.
    /// - [`CheckpointError::MissingParameter`] / [`CheckpointError::ShapeMismatch`] when the
    ///   stored parameters do not fit the model.
    pub fn into_model(self) -> Result<(LanguageModel, CharTokenizer), CheckpointError> {
        if self.version != FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
            });
        }
        // ids are positions in this list, so it must already be the tokenizer's order
        if let Some(index) = self.vocab.windows(2).position(|w| w[0] >= w[1]) {
            return Err(CheckpointError::InvalidVocab { index: index + 1 });
        }
        let tokenizer = CharTokenizer::from_symbols(&self.vocab);
        let config = self.dims.to_config();
        // every parameter is overwritten below, the init draws are discarded
        let mut rng = StdRng::seed_from_u64(config.seed);
        let model = LanguageModel::new(&config, tokenizer.vocab_size(), &mut rng)?;

        let mut stored: HashMap<String, StoredTensor> = self
            .parameters
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        for (name, tensor) in model.named_parameters() {
            let p = stored
                .remove(&name)
                .ok_or_else(|| CheckpointError::MissingParameter(name.clone()))?;
            let expected = tensor.shape();
            if (p.rows, p.cols) != expected || p.values.len() != p.rows * p.cols {
                return Err(CheckpointError::ShapeMismatch {
                    name,
                    expected,
                    found: (p.rows, p.cols),
                });
            }
            tensor.set_data(p.values);
        }
        for name in stored.keys() {
            warn!("checkpoint: ignoring unknown parameter {name}");
        }
        Ok((model, tokenizer))
    }
}

/// Writes `model` and `tokenizer` to `path` as JSON.
///
/// # Errors
///
/// [`CheckpointError::Io`] or [`CheckpointError::Json`] (e.g. non-finite weights).
pub fn save(
    path: impl AsRef<Path>,
    model: &LanguageModel,
    tokenizer: &CharTokenizer,
) -> Result<(), CheckpointError> {
    let path = path.as_ref();
    let checkpoint = Checkpoint::from_model(model, tokenizer);
    let json = serde_json::to_string(&checkpoint)?;
    fs::write(path, json)?;
    info!(
        "saved {} parameter tensors to {}",
        checkpoint.parameters.len(),
        path.display()
    );
    Ok(())
}

/// Reads a checkpoint written by [`save`].
///
/// # Errors
///
/// Any [`CheckpointError`].
pub fn load(path: impl AsRef<Path>) -> Result<(LanguageModel, CharTokenizer), CheckpointError> {
    let json = fs::read_to_string(path)?;
    let checkpoint: Checkpoint = serde_json::from_str(&json)?;
    checkpoint.into_model()
}
