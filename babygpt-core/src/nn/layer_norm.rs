//! Per-position layer normalization with learned gain and bias.

use super::{join, Module};
use crate::autograd::Tensor;

/// Normalizes each row to zero mean and unit (biased) variance, then scales by
/// `gain` (init 1) and shifts by `bias` (init 0).
#[derive(Debug)]
pub struct LayerNorm {
    gain: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    #[must_use]
    pub fn new(width: usize, eps: f64) -> Self {
        LayerNorm {
            gain: Tensor::full(1, width, 1.0),
            bias: Tensor::zeros(1, width),
            eps,
        }
    }

    #[must_use]
    pub fn forward(&self, x: &Tensor) -> Tensor {
        x.layer_norm(&self.gain, &self.bias, self.eps)
    }
}

impl Module for LayerNorm {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (join(prefix, "gain"), self.gain.clone()),
            (join(prefix, "bias"), self.bias.clone()),
        ]
    }
}
