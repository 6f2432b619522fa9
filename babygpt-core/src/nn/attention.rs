//! Causal self-attention: the shared mask, one head, and the multi-head layer.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand_distr::Normal;

use super::{join, Dropout, Linear, Mode, Module};
use crate::autograd::Tensor;

/// Lower-triangular `size × size` mask, built once and shared by every head.
/// Entry `(i, j)` is blocked when key position `j` is after query position `i`.
#[derive(Clone, Debug)]
pub struct CausalMask {
    blocked: Rc<[bool]>,
    size: usize,
}

impl CausalMask {
    #[must_use]
    pub fn new(size: usize) -> Self {
        let blocked: Vec<bool> = (0..size)
            .flat_map(|i| (0..size).map(move |j| j > i))
            .collect();
        CausalMask {
            blocked: blocked.into(),
            size,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_blocked(&self, query: usize, key: usize) -> bool {
        self.blocked[query * self.size + key]
    }

    /// Sets blocked entries of a `t × t` score matrix (`t <= size`) to `-inf`.
    #[must_use]
    pub fn apply(&self, scores: &Tensor) -> Tensor {
        scores.masked_fill(&self.blocked, self.size, f64::NEG_INFINITY)
    }
}

/// One attention head: bias-free key, query and value projections to `head_width`.
#[derive(Debug)]
pub struct AttentionHead {
    key: Linear,
    query: Linear,
    value: Linear,
    mask: Rc<CausalMask>,
    dropout: Dropout,
    scale: f64,
}

impl AttentionHead {
    #[must_use]
    pub fn new(
        model_width: usize,
        head_width: usize,
        mask: Rc<CausalMask>,
        dropout_rate: f64,
        init: &Normal<f64>,
        rng: &mut StdRng,
    ) -> Self {
        AttentionHead {
            key: Linear::new(model_width, head_width, false, init, rng),
            query: Linear::new(model_width, head_width, false, init, rng),
            value: Linear::new(model_width, head_width, false, init, rng),
            mask,
            dropout: Dropout::new(dropout_rate),
            scale: 1.0 / (head_width as f64).sqrt(),
        }
    }

    /// Softmax attention weights per sequence, before dropout.
    ///
    /// `x` is `(batch_size · t) × model_width` with the sequences stacked; each
    /// returned tensor is `t × t` with exact zeros above the diagonal.
    #[must_use]
    pub fn attention_weights(&self, x: &Tensor, batch_size: usize) -> Vec<Tensor> {
        let q = self.query.forward(x);
        let k = self.key.forward(x);
        let t = x.rows() / batch_size;
        (0..batch_size)
            .map(|b| self.weights(&q.slice_rows(b * t, t), &k.slice_rows(b * t, t)))
            .collect()
    }

    fn weights(&self, q: &Tensor, k: &Tensor) -> Tensor {
        let scores = q.matmul(&k.transpose()).scale(self.scale);
        self.mask.apply(&scores).softmax_rows()
    }

    /// `(batch_size · t) × model_width` → `(batch_size · t) × head_width`.
    #[must_use]
    pub fn forward(&self, x: &Tensor, batch_size: usize, mode: Mode, rng: &mut StdRng) -> Tensor {
        let q = self.query.forward(x);
        let k = self.key.forward(x);
        let v = self.value.forward(x);
        let t = x.rows() / batch_size;
        let outputs: Vec<Tensor> = (0..batch_size)
            .map(|b| {
                let start = b * t;
                let weights = self.weights(&q.slice_rows(start, t), &k.slice_rows(start, t));
                self.dropout
                    .forward(&weights, mode, rng)
                    .matmul(&v.slice_rows(start, t))
            })
            .collect();
        Tensor::concat_rows(&outputs)
    }
}

impl Module for AttentionHead {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = self.key.named_parameters(&join(prefix, "key"));
        params.extend(self.query.named_parameters(&join(prefix, "query")));
        params.extend(self.value.named_parameters(&join(prefix, "value")));
        params
    }
}

/// Parallel heads whose outputs are concatenated and projected back to `model_width`.
#[derive(Debug)]
pub struct MultiHeadAttention {
    heads: Vec<AttentionHead>,
    proj: Linear,
    dropout: Dropout,
}

impl MultiHeadAttention {
    #[must_use]
    pub fn new(
        model_width: usize,
        num_heads: usize,
        mask: &Rc<CausalMask>,
        dropout_rate: f64,
        init: &Normal<f64>,
        rng: &mut StdRng,
    ) -> Self {
        let head_width = model_width / num_heads;
        let heads = (0..num_heads)
            .map(|_| {
                AttentionHead::new(
                    model_width,
                    head_width,
                    Rc::clone(mask),
                    dropout_rate,
                    init,
                    rng,
                )
            })
            .collect();
        MultiHeadAttention {
            heads,
            proj: Linear::new(model_width, model_width, true, init, rng),
            dropout: Dropout::new(dropout_rate),
        }
    }

    #[must_use]
    pub fn heads(&self) -> &[AttentionHead] {
        &self.heads
    }

    #[must_use]
    pub fn forward(&self, x: &Tensor, batch_size: usize, mode: Mode, rng: &mut StdRng) -> Tensor {
        let outputs: Vec<Tensor> = self
            .heads
            .iter()
            .map(|h| h.forward(x, batch_size, mode, rng))
            .collect();
        let projected = self.proj.forward(&Tensor::concat_cols(&outputs));
        self.dropout.forward(&projected, mode, rng)
    }
}

impl Module for MultiHeadAttention {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = Vec::new();
        for (h, head) in self.heads.iter().enumerate() {
            params.extend(head.named_parameters(&join(prefix, &format!("heads.{h}"))));
        }
        params.extend(self.proj.named_parameters(&join(prefix, "proj")));
        params
    }
}
