//! Neural network layers built on [`Tensor`](crate::autograd::Tensor).
//!
//! Every layer exposes its learnable tensors through the [`Module`] trait so the
//! model, optimizer and checkpoint code can enumerate them by dotted name.
//! Stochastic layers take the [`Mode`] and the RNG explicitly on every call.

mod attention;
mod block;
mod dropout;
mod embedding;
mod feed_forward;
mod layer_norm;
mod linear;

pub use attention::{AttentionHead, CausalMask, MultiHeadAttention};
pub use block::TransformerBlock;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use feed_forward::{FeedForward, EXPANSION};
pub use layer_norm::LayerNorm;
pub use linear::Linear;

use crate::autograd::Tensor;

/// Whether a forward pass is part of training (dropout active) or not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// A layer or model owning learnable tensors.
pub trait Module {
    /// Parameters with names relative to `prefix` (e.g. `blocks.0.ln_1.gain`), in a stable order.
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)>;

    fn parameters(&self) -> Vec<Tensor> {
        self.named_parameters("")
            .into_iter()
            .map(|(_, t)| t)
            .collect()
    }

    /// Total number of learnable scalars.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(Tensor::len).sum()
    }
}

/// `prefix.name`, or just `name` at the root.
pub(crate) fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
