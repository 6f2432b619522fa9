//! Inverted dropout.

use rand::rngs::StdRng;
use rand::Rng;

use super::Mode;
use crate::autograd::Tensor;

/// Zeroes each element with probability `rate` in [`Mode::Training`] and scales
/// survivors by `1 / (1 - rate)`. Identity in [`Mode::Inference`].
#[derive(Clone, Copy, Debug)]
pub struct Dropout {
    rate: f64,
}

impl Dropout {
    /// # Panics
    ///
    /// Panics if `rate` is outside `[0, 1)`.
    #[must_use]
    pub fn new(rate: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&rate),
            "dropout: rate {rate} outside [0, 1)"
        );
        Dropout { rate }
    }

    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[must_use]
    pub fn forward(&self, x: &Tensor, mode: Mode, rng: &mut StdRng) -> Tensor {
        if mode == Mode::Inference || self.rate == 0.0 {
            return x.clone();
        }
        let keep = 1.0 - self.rate;
        let scale = 1.0 / keep;
        let factors = (0..x.len())
            .map(|_| if rng.random_bool(keep) { scale } else { 0.0 })
            .collect();
        x.mul_const(factors)
    }
}
