//! AdamW optimizer and global gradient-norm clipping.

use crate::autograd::Tensor;
use crate::config::Config;

/// Adam with bias correction and decoupled weight decay.
///
/// Holds the parameter handles it updates plus one first/second moment buffer per
/// parameter (indexed like the parameter list).
#[derive(Debug)]
pub struct AdamW {
    params: Vec<Tensor>,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
    steps: usize,
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    weight_decay: f64,
}

impl AdamW {
    /// Optimizer over `params` with the hyperparameters of `config`.
    #[must_use]
    pub fn new(params: Vec<Tensor>, config: &Config) -> Self {
        let m = params.iter().map(|p| vec![0.0; p.len()]).collect();
        let v = params.iter().map(|p| vec![0.0; p.len()]).collect();
        AdamW {
            params,
            m,
            v,
            steps: 0,
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            weight_decay: config.weight_decay,
        }
    }

    #[must_use]
    pub fn params(&self) -> &[Tensor] {
        &self.params
    }

    /// Number of updates applied so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Applies one update from the current gradients. Gradients are left untouched.
    pub fn step(&mut self) {
        self.steps += 1;
        // beta^t has long underflowed to zero once t no longer fits an i32
        let t = i32::try_from(self.steps).unwrap_or(i32::MAX);
        let (b1, b2) = (self.beta1, self.beta2);
        let bias1 = 1.0 - b1.powi(t);
        let bias2 = 1.0 - b2.powi(t);
        let lr = self.learning_rate;
        let decay = 1.0 - lr * self.weight_decay;
        let eps = self.epsilon;
        for ((p, m), v) in self.params.iter().zip(&mut self.m).zip(&mut self.v) {
            p.update_data(|data, grad| {
                for i in 0..data.len() {
                    let g = grad[i];
                    m[i] = b1 * m[i] + (1.0 - b1) * g;
                    v[i] = b2 * v[i] + (1.0 - b2) * g * g;
                    let m_hat = m[i] / bias1;
                    let v_hat = v[i] / bias2;
                    data[i] = data[i] * decay - lr * m_hat / (v_hat.sqrt() + eps);
                }
            });
        }
    }

    pub fn zero_grad(&self) {
        for p in &self.params {
            p.zero_grad();
        }
    }
}

/// L2 norm of all gradients taken together.
#[must_use]
pub fn grad_norm(params: &[Tensor]) -> f64 {
    params
        .iter()
        .flat_map(|p| p.grad())
        .map(|g| g * g)
        .sum::<f64>()
        .sqrt()
}

/// Rescales all gradients so their global norm is at most `max_norm`; `max_norm <= 0`
/// disables clipping. Returns the norm before clipping.
pub fn clip_grad_norm(params: &[Tensor], max_norm: f64) -> f64 {
    let norm = grad_norm(params);
    if max_norm > 0.0 && norm > max_norm {
        let factor = max_norm / norm;
        for p in params {
            p.scale_grad(factor);
        }
    }
    norm
}
