//! Crate-level error wrapping every module error, for callers that mix modules.

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::data::DataError;
use crate::model::ModelError;
use crate::tokenizer::TokenizerError;
use crate::train::TrainError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
