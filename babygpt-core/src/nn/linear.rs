//! Fully connected layer.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use super::{join, Module};
use crate::autograd::Tensor;

/// `y = x · W + b` with `W` stored `in_features × out_features`.
#[derive(Debug)]
pub struct Linear {
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    /// Weights drawn from `init`, bias (when present) zero.
    #[must_use]
    pub fn new(
        in_features: usize,
        out_features: usize,
        bias: bool,
        init: &Normal<f64>,
        rng: &mut StdRng,
    ) -> Self {
        let weight = Tensor::from_fn(in_features, out_features, |_, _| init.sample(rng));
        Linear {
            weight,
            bias: bias.then(|| Tensor::zeros(1, out_features)),
        }
    }

    #[must_use]
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    #[must_use]
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let y = x.matmul(&self.weight);
        match &self.bias {
            Some(b) => y.add_row(b),
            None => y,
        }
    }
}

impl Module for Linear {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = vec![(join(prefix, "weight"), self.weight.clone())];
        if let Some(b) = &self.bias {
            params.push((join(prefix, "bias"), b.clone()));
        }
        params
    }
}
