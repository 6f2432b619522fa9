//! Training errors.

use thiserror::Error;

use crate::model::ModelError;

/// Errors that stop [`Trainer::train`](super::Trainer::train).
///
/// - **Diverged**: The training loss became NaN or infinite. Parameters are left as they
///   were before the failing update. *Recovery*: lower `learning_rate` or enable `grad_clip`.
/// - **Model**: A forward pass rejected its input (indicates a bug in batch construction).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("train: loss diverged to {loss} at step {step}")]
    Diverged { step: usize, loss: f64 },

    #[error(transparent)]
    Model(#[from] ModelError),
}
