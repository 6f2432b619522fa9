//! Pre-norm transformer block.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand_distr::Normal;

use super::{join, CausalMask, FeedForward, LayerNorm, Mode, Module, MultiHeadAttention};
use crate::autograd::Tensor;
use crate::config::Config;

/// `x + attention(ln_1(x))`, then `x + feed_forward(ln_2(x))`.
#[derive(Debug)]
pub struct TransformerBlock {
    ln_1: LayerNorm,
    attention: MultiHeadAttention,
    ln_2: LayerNorm,
    feed_forward: FeedForward,
}

impl TransformerBlock {
    #[must_use]
    pub fn new(
        config: &Config,
        mask: &Rc<CausalMask>,
        init: &Normal<f64>,
        rng: &mut StdRng,
    ) -> Self {
        let width = config.model_width;
        TransformerBlock {
            ln_1: LayerNorm::new(width, config.layer_norm_eps),
            attention: MultiHeadAttention::new(
                width,
                config.num_heads,
                mask,
                config.dropout_rate,
                init,
                rng,
            ),
            ln_2: LayerNorm::new(width, config.layer_norm_eps),
            feed_forward: FeedForward::new(width, config.dropout_rate, init, rng),
        }
    }

    #[must_use]
    pub fn attention(&self) -> &MultiHeadAttention {
        &self.attention
    }

    #[must_use]
    pub fn forward(&self, x: &Tensor, batch_size: usize, mode: Mode, rng: &mut StdRng) -> Tensor {
        let x = x + &self.attention.forward(&self.ln_1.forward(x), batch_size, mode, rng);
        let ff = self.feed_forward.forward(&self.ln_2.forward(&x), mode, rng);
        &x + &ff
    }
}

impl Module for TransformerBlock {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = self.ln_1.named_parameters(&join(prefix, "ln_1"));
        params.extend(self.attention.named_parameters(&join(prefix, "attention")));
        params.extend(self.ln_2.named_parameters(&join(prefix, "ln_2")));
        params.extend(self.feed_forward.named_parameters(&join(prefix, "feed_forward")));
        params
    }
}
