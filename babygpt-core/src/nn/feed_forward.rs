//! Position-wise feed-forward block.

use rand::rngs::StdRng;
use rand_distr::Normal;

use super::{join, Dropout, Linear, Mode, Module};
use crate::autograd::Tensor;

/// Hidden width relative to the model width.
pub const EXPANSION: usize = 4;

/// `Linear(w → 4w) → ReLU → Linear(4w → w) → Dropout`, applied to every position independently.
#[derive(Debug)]
pub struct FeedForward {
    expand: Linear,
    project: Linear,
    dropout: Dropout,
}

impl FeedForward {
    #[must_use]
    pub fn new(model_width: usize, dropout_rate: f64, init: &Normal<f64>, rng: &mut StdRng) -> Self {
        let hidden = EXPANSION * model_width;
        FeedForward {
            expand: Linear::new(model_width, hidden, true, init, rng),
            project: Linear::new(hidden, model_width, true, init, rng),
            dropout: Dropout::new(dropout_rate),
        }
    }

    #[must_use]
    pub fn forward(&self, x: &Tensor, mode: Mode, rng: &mut StdRng) -> Tensor {
        let hidden = self.expand.forward(x).relu();
        self.dropout.forward(&self.project.forward(&hidden), mode, rng)
    }
}

impl Module for FeedForward {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = self.expand.named_parameters(&join(prefix, "expand"));
        params.extend(self.project.named_parameters(&join(prefix, "project")));
        params
    }
}
