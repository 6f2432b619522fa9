//! Learned lookup table from ids to vectors.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use super::{join, Module};
use crate::autograd::Tensor;

#[derive(Debug)]
pub struct Embedding {
    weight: Tensor,
}

impl Embedding {
    /// `count × width` table drawn from `init`.
    #[must_use]
    pub fn new(count: usize, width: usize, init: &Normal<f64>, rng: &mut StdRng) -> Self {
        Embedding {
            weight: Tensor::from_fn(count, width, |_, _| init.sample(rng)),
        }
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn count(&self) -> usize {
        self.weight.rows()
    }

    /// One output row per id.
    ///
    /// # Panics
    ///
    /// Panics if an id is out of range; the model checks ids before calling.
    #[must_use]
    pub fn forward(&self, ids: &[usize]) -> Tensor {
        self.weight.gather_rows(ids)
    }
}

impl Module for Embedding {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![(join(prefix, "weight"), self.weight.clone())]
    }
}
