//! Random (context, target) batches cut from a token sequence.

use rand::Rng;

/// `batch_size` windows of `context_length` tokens, stored row-major.
///
/// `targets[i * context_length + t]` is the token that follows
/// `inputs[i * context_length + t]` in the source sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    pub inputs: Vec<usize>,
    pub targets: Vec<usize>,
    pub batch_size: usize,
    pub context_length: usize,
}

/// Samples `batch_size` windows with offsets drawn uniformly from
/// `0..=tokens.len() - context_length - 1`.
///
/// # Panics
///
/// Panics if `tokens` holds fewer than `context_length + 1` tokens
/// ([`Dataset`](super::Dataset) guarantees this for both splits).
pub fn sample_batch<R: Rng + ?Sized>(
    tokens: &[usize],
    batch_size: usize,
    context_length: usize,
    rng: &mut R,
) -> Batch {
    assert!(
        tokens.len() > context_length,
        "sample_batch: {} tokens cannot fill a window of {context_length} plus target",
        tokens.len()
    );
    let mut inputs = Vec::with_capacity(batch_size * context_length);
    let mut targets = Vec::with_capacity(batch_size * context_length);
    for _ in 0..batch_size {
        let offset = rng.random_range(0..tokens.len() - context_length);
        inputs.extend_from_slice(&tokens[offset..offset + context_length]);
        targets.extend_from_slice(&tokens[offset + 1..offset + context_length + 1]);
    }
    Batch {
        inputs,
        targets,
        batch_size,
        context_length,
    }
}
