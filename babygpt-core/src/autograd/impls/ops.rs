//! Differentiable ops on [`Tensor`]: forward kernels plus the matching backward rule for each.

use std::rc::Rc;

use super::tensor::Tensor;

/// Op that produced a node, holding its inputs and whatever the backward rule needs.
pub(crate) enum Op {
    Leaf,
    Add(Tensor, Tensor),
    /// Adds a `1 × cols` row to every row of the first input.
    AddRow(Tensor, Tensor),
    MatMul(Tensor, Tensor),
    Transpose(Tensor),
    Scale(Tensor, f64),
    Relu(Tensor),
    /// Entries whose mask bit is set were overwritten by a constant; mask is indexed `r * stride + c`.
    MaskedFill {
        input: Tensor,
        mask: Rc<[bool]>,
        stride: usize,
    },
    SoftmaxRows(Tensor),
    /// Elementwise product with a constant matrix.
    MulConst(Tensor, Vec<f64>),
    LayerNorm {
        input: Tensor,
        gain: Tensor,
        bias: Tensor,
        normalized: Vec<f64>,
        inv_std: Vec<f64>,
    },
    GatherRows(Tensor, Vec<usize>),
    ConcatCols(Vec<Tensor>),
    ConcatRows(Vec<Tensor>),
    SliceRows(Tensor, usize),
    CrossEntropy {
        logits: Tensor,
        targets: Vec<usize>,
        probs: Vec<f64>,
    },
}

impl Op {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Op::Leaf => "leaf",
            Op::Add(..) => "add",
            Op::AddRow(..) => "add_row",
            Op::MatMul(..) => "matmul",
            Op::Transpose(..) => "transpose",
            Op::Scale(..) => "scale",
            Op::Relu(..) => "relu",
            Op::MaskedFill { .. } => "masked_fill",
            Op::SoftmaxRows(..) => "softmax_rows",
            Op::MulConst(..) => "mul_const",
            Op::LayerNorm { .. } => "layer_norm",
            Op::GatherRows(..) => "gather_rows",
            Op::ConcatCols(..) => "concat_cols",
            Op::ConcatRows(..) => "concat_rows",
            Op::SliceRows(..) => "slice_rows",
            Op::CrossEntropy { .. } => "cross_entropy",
        }
    }

    pub(crate) fn parents(&self) -> Vec<&Tensor> {
        match self {
            Op::Leaf => Vec::new(),
            Op::Add(a, b) | Op::AddRow(a, b) | Op::MatMul(a, b) => vec![a, b],
            Op::Transpose(a)
            | Op::Scale(a, _)
            | Op::Relu(a)
            | Op::SoftmaxRows(a)
            | Op::MulConst(a, _)
            | Op::GatherRows(a, _)
            | Op::SliceRows(a, _) => vec![a],
            Op::MaskedFill { input, .. } => vec![input],
            Op::LayerNorm {
                input, gain, bias, ..
            } => vec![input, gain, bias],
            Op::ConcatCols(parts) | Op::ConcatRows(parts) => parts.iter().collect(),
            Op::CrossEntropy { logits, .. } => vec![logits],
        }
    }

    /// Pushes this node's gradient `grad` into its inputs' gradients.
    pub(crate) fn propagate(&self, out: &[f64], grad: &[f64], rows: usize, cols: usize) {
        match self {
            Op::Leaf => {}
            Op::Add(a, b) => {
                a.accumulate(grad);
                b.accumulate(grad);
            }
            Op::AddRow(a, bias) => {
                a.accumulate(grad);
                let mut g_bias = vec![0.0; cols];
                for row in grad.chunks_exact(cols) {
                    for (acc, g) in g_bias.iter_mut().zip(row) {
                        *acc += g;
                    }
                }
                bias.accumulate(&g_bias);
            }
            Op::MatMul(a, b) => {
                let (m, k) = a.shape();
                let n = cols;
                let a_data = a.0.borrow().data.clone();
                let b_data = b.0.borrow().data.clone();
                // dA = G · Bᵀ
                let mut g_a = vec![0.0; m * k];
                for i in 0..m {
                    let g_row = &grad[i * n..(i + 1) * n];
                    for p in 0..k {
                        let b_row = &b_data[p * n..(p + 1) * n];
                        g_a[i * k + p] = dot(g_row, b_row);
                    }
                }
                // dB = Aᵀ · G
                let mut g_b = vec![0.0; k * n];
                for i in 0..m {
                    let g_row = &grad[i * n..(i + 1) * n];
                    for p in 0..k {
                        let a_ip = a_data[i * k + p];
                        if a_ip == 0.0 {
                            continue;
                        }
                        for (acc, g) in g_b[p * n..(p + 1) * n].iter_mut().zip(g_row) {
                            *acc += a_ip * g;
                        }
                    }
                }
                a.accumulate(&g_a);
                b.accumulate(&g_b);
            }
            Op::Transpose(a) => a.accumulate(&transpose(grad, rows, cols)),
            Op::Scale(a, s) => {
                let g: Vec<f64> = grad.iter().map(|g| g * s).collect();
                a.accumulate(&g);
            }
            Op::Relu(a) => {
                // out > 0 exactly where the input was positive
                let g: Vec<f64> = grad
                    .iter()
                    .zip(out)
                    .map(|(g, y)| if *y > 0.0 { *g } else { 0.0 })
                    .collect();
                a.accumulate(&g);
            }
            Op::MaskedFill {
                input,
                mask,
                stride,
            } => {
                let mut g = grad.to_vec();
                for r in 0..rows {
                    for c in 0..cols {
                        if mask[r * stride + c] {
                            g[r * cols + c] = 0.0;
                        }
                    }
                }
                input.accumulate(&g);
            }
            Op::SoftmaxRows(a) => {
                let mut g = vec![0.0; rows * cols];
                for r in 0..rows {
                    let y = &out[r * cols..(r + 1) * cols];
                    let dy = &grad[r * cols..(r + 1) * cols];
                    let inner = dot(y, dy);
                    for c in 0..cols {
                        g[r * cols + c] = y[c] * (dy[c] - inner);
                    }
                }
                a.accumulate(&g);
            }
            Op::MulConst(a, factors) => {
                let g: Vec<f64> = grad.iter().zip(factors).map(|(g, f)| g * f).collect();
                a.accumulate(&g);
            }
            Op::LayerNorm {
                input,
                gain,
                bias,
                normalized,
                inv_std,
            } => {
                let gain_data = gain.0.borrow().data.clone();
                let mut g_input = vec![0.0; rows * cols];
                let mut g_gain = vec![0.0; cols];
                let mut g_bias = vec![0.0; cols];
                let n = cols as f64;
                for r in 0..rows {
                    let xhat = &normalized[r * cols..(r + 1) * cols];
                    let dy = &grad[r * cols..(r + 1) * cols];
                    let mut dxhat = vec![0.0; cols];
                    for c in 0..cols {
                        g_gain[c] += dy[c] * xhat[c];
                        g_bias[c] += dy[c];
                        dxhat[c] = dy[c] * gain_data[c];
                    }
                    let mean_dxhat = dxhat.iter().sum::<f64>() / n;
                    let mean_dxhat_xhat = dot(&dxhat, xhat) / n;
                    for c in 0..cols {
                        g_input[r * cols + c] =
                            inv_std[r] * (dxhat[c] - mean_dxhat - xhat[c] * mean_dxhat_xhat);
                    }
                }
                input.accumulate(&g_input);
                gain.accumulate(&g_gain);
                bias.accumulate(&g_bias);
            }
            Op::GatherRows(table, ids) => {
                let mut g = vec![0.0; table.len()];
                for (r, &id) in ids.iter().enumerate() {
                    for c in 0..cols {
                        g[id * cols + c] += grad[r * cols + c];
                    }
                }
                table.accumulate(&g);
            }
            Op::ConcatCols(parts) => {
                let mut offset = 0;
                for part in parts {
                    let part_cols = part.cols();
                    let mut g = Vec::with_capacity(rows * part_cols);
                    for r in 0..rows {
                        let start = r * cols + offset;
                        g.extend_from_slice(&grad[start..start + part_cols]);
                    }
                    part.accumulate(&g);
                    offset += part_cols;
                }
            }
            Op::ConcatRows(parts) => {
                let mut offset = 0;
                for part in parts {
                    let n = part.len();
                    part.accumulate(&grad[offset..offset + n]);
                    offset += n;
                }
            }
            Op::SliceRows(a, start) => {
                let mut g = vec![0.0; a.len()];
                let begin = start * cols;
                g[begin..begin + grad.len()].copy_from_slice(grad);
                a.accumulate(&g);
            }
            Op::CrossEntropy {
                logits,
                targets,
                probs,
            } => {
                let upstream = grad[0];
                let vocab = logits.cols();
                let n = targets.len() as f64;
                let mut g: Vec<f64> = probs.iter().map(|p| p * upstream / n).collect();
                for (r, &t) in targets.iter().enumerate() {
                    g[r * vocab + t] -= upstream / n;
                }
                logits.accumulate(&g);
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn transpose(data: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

/// Numerically stable softmax of one row, written into `out`.
fn softmax_into(row: &[f64], out: &mut [f64]) {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for (o, x) in out.iter_mut().zip(row) {
        *o = (x - max).exp();
        total += *o;
    }
    for o in out.iter_mut() {
        *o /= total;
    }
}

/// Softmax over a plain slice of logits (no graph). Used when sampling.
#[must_use]
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; logits.len()];
    softmax_into(logits, &mut out);
    out
}

impl Tensor {
    /// Elementwise `self + other`.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    #[must_use]
    pub fn add_tensor(&self, other: &Tensor) -> Tensor {
        let (rows, cols) = self.shape();
        assert_eq!(
            (rows, cols),
            other.shape(),
            "add: shape mismatch {:?} vs {:?}",
            self.shape(),
            other.shape()
        );
        let data: Vec<f64> = {
            let a = self.0.borrow();
            let b = other.0.borrow();
            a.data.iter().zip(&b.data).map(|(x, y)| x + y).collect()
        };
        Tensor::from_op(data, rows, cols, Op::Add(self.clone(), other.clone()))
    }

    /// Adds the `1 × cols` tensor `bias` to every row.
    #[must_use]
    pub fn add_row(&self, bias: &Tensor) -> Tensor {
        let (rows, cols) = self.shape();
        assert_eq!(
            bias.shape(),
            (1, cols),
            "add_row: bias must be 1x{cols}, got {:?}",
            bias.shape()
        );
        let data: Vec<f64> = {
            let a = self.0.borrow();
            let b = bias.0.borrow();
            a.data
                .chunks_exact(cols)
                .flat_map(|row| row.iter().zip(&b.data).map(|(x, y)| x + y))
                .collect()
        };
        Tensor::from_op(data, rows, cols, Op::AddRow(self.clone(), bias.clone()))
    }

    /// Matrix product `self · other`.
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        let (m, k) = self.shape();
        let (k2, n) = other.shape();
        assert_eq!(k, k2, "matmul: inner dimensions differ ({m}x{k} · {k2}x{n})");
        let mut data = vec![0.0; m * n];
        {
            let a = self.0.borrow();
            let b = other.0.borrow();
            for i in 0..m {
                let out_row = &mut data[i * n..(i + 1) * n];
                for p in 0..k {
                    let a_ip = a.data[i * k + p];
                    if a_ip == 0.0 {
                        continue;
                    }
                    for (o, b_pj) in out_row.iter_mut().zip(&b.data[p * n..(p + 1) * n]) {
                        *o += a_ip * b_pj;
                    }
                }
            }
        }
        Tensor::from_op(data, m, n, Op::MatMul(self.clone(), other.clone()))
    }

    #[must_use]
    pub fn transpose(&self) -> Tensor {
        let (rows, cols) = self.shape();
        let data = transpose(&self.0.borrow().data, rows, cols);
        Tensor::from_op(data, cols, rows, Op::Transpose(self.clone()))
    }

    /// Multiplies every element by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Tensor {
        let (rows, cols) = self.shape();
        let data = self.0.borrow().data.iter().map(|x| x * factor).collect();
        Tensor::from_op(data, rows, cols, Op::Scale(self.clone(), factor))
    }

    /// `max(0, x)` elementwise.
    #[must_use]
    pub fn relu(&self) -> Tensor {
        let (rows, cols) = self.shape();
        let data = self.0.borrow().data.iter().map(|x| x.max(0.0)).collect();
        Tensor::from_op(data, rows, cols, Op::Relu(self.clone()))
    }

    /// Replaces element `(r, c)` with `value` wherever `mask[r * stride + c]` is set.
    ///
    /// `stride` lets a window of a larger shared mask be used without copying it.
    #[must_use]
    pub fn masked_fill(&self, mask: &Rc<[bool]>, stride: usize, value: f64) -> Tensor {
        let (rows, cols) = self.shape();
        assert!(cols <= stride, "masked_fill: {cols} columns exceed mask stride {stride}");
        assert!(
            rows == 0 || (rows - 1) * stride + cols <= mask.len(),
            "masked_fill: {rows}x{cols} window does not fit the mask"
        );
        let mut data = self.data();
        for r in 0..rows {
            for c in 0..cols {
                if mask[r * stride + c] {
                    data[r * cols + c] = value;
                }
            }
        }
        Tensor::from_op(
            data,
            rows,
            cols,
            Op::MaskedFill {
                input: self.clone(),
                mask: Rc::clone(mask),
                stride,
            },
        )
    }

    /// Softmax over each row. `-inf` entries get exactly zero weight.
    #[must_use]
    pub fn softmax_rows(&self) -> Tensor {
        let (rows, cols) = self.shape();
        let mut data = vec![0.0; rows * cols];
        {
            let a = self.0.borrow();
            for (row, out) in a.data.chunks_exact(cols).zip(data.chunks_exact_mut(cols)) {
                softmax_into(row, out);
            }
        }
        Tensor::from_op(data, rows, cols, Op::SoftmaxRows(self.clone()))
    }

    /// Elementwise product with a constant (non-differentiable) matrix.
    #[must_use]
    pub fn mul_const(&self, factors: Vec<f64>) -> Tensor {
        let (rows, cols) = self.shape();
        assert_eq!(factors.len(), rows * cols, "mul_const: factor length mismatch");
        let data = self
            .0
            .borrow()
            .data
            .iter()
            .zip(&factors)
            .map(|(x, f)| x * f)
            .collect();
        Tensor::from_op(data, rows, cols, Op::MulConst(self.clone(), factors))
    }

    /// Normalizes each row to zero mean and unit variance, then applies `gain` and `bias`
    /// (both `1 × cols`).
    #[must_use]
    pub fn layer_norm(&self, gain: &Tensor, bias: &Tensor, eps: f64) -> Tensor {
        let (rows, cols) = self.shape();
        assert_eq!(gain.shape(), (1, cols), "layer_norm: gain must be 1x{cols}");
        assert_eq!(bias.shape(), (1, cols), "layer_norm: bias must be 1x{cols}");
        let mut normalized = vec![0.0; rows * cols];
        let mut inv_std = vec![0.0; rows];
        let mut data = vec![0.0; rows * cols];
        {
            let a = self.0.borrow();
            let g = gain.0.borrow();
            let b = bias.0.borrow();
            let n = cols as f64;
            for r in 0..rows {
                let x = &a.data[r * cols..(r + 1) * cols];
                let mean = x.iter().sum::<f64>() / n;
                let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let rstd = 1.0 / (var + eps).sqrt();
                inv_std[r] = rstd;
                for c in 0..cols {
                    let xhat = (x[c] - mean) * rstd;
                    normalized[r * cols + c] = xhat;
                    data[r * cols + c] = xhat * g.data[c] + b.data[c];
                }
            }
        }
        Tensor::from_op(
            data,
            rows,
            cols,
            Op::LayerNorm {
                input: self.clone(),
                gain: gain.clone(),
                bias: bias.clone(),
                normalized,
                inv_std,
            },
        )
    }

    /// Picks row `ids[i]` of `self` as output row `i` (embedding lookup).
    #[must_use]
    pub fn gather_rows(&self, ids: &[usize]) -> Tensor {
        let (rows, cols) = self.shape();
        let mut data = Vec::with_capacity(ids.len() * cols);
        {
            let a = self.0.borrow();
            for &id in ids {
                assert!(id < rows, "gather_rows: id {id} out of {rows} rows");
                data.extend_from_slice(&a.data[id * cols..(id + 1) * cols]);
            }
        }
        Tensor::from_op(data, ids.len(), cols, Op::GatherRows(self.clone(), ids.to_vec()))
    }

    /// Concatenates along the feature (column) axis.
    #[must_use]
    pub fn concat_cols(parts: &[Tensor]) -> Tensor {
        assert!(!parts.is_empty(), "concat_cols: no inputs");
        let rows = parts[0].rows();
        assert!(
            parts.iter().all(|p| p.rows() == rows),
            "concat_cols: row counts differ"
        );
        let cols: usize = parts.iter().map(Tensor::cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        let borrowed: Vec<_> = parts.iter().map(|p| p.0.borrow()).collect();
        for r in 0..rows {
            for node in &borrowed {
                data.extend_from_slice(&node.data[r * node.cols..(r + 1) * node.cols]);
            }
        }
        drop(borrowed);
        Tensor::from_op(data, rows, cols, Op::ConcatCols(parts.to_vec()))
    }

    /// Stacks along the row axis.
    #[must_use]
    pub fn concat_rows(parts: &[Tensor]) -> Tensor {
        assert!(!parts.is_empty(), "concat_rows: no inputs");
        let cols = parts[0].cols();
        assert!(
            parts.iter().all(|p| p.cols() == cols),
            "concat_rows: column counts differ"
        );
        let mut data = Vec::new();
        for part in parts {
            data.extend_from_slice(&part.0.borrow().data);
        }
        let rows = data.len() / cols.max(1);
        Tensor::from_op(data, rows, cols, Op::ConcatRows(parts.to_vec()))
    }

    /// Rows `start..start + count`.
    #[must_use]
    pub fn slice_rows(&self, start: usize, count: usize) -> Tensor {
        let (rows, cols) = self.shape();
        assert!(
            start + count <= rows,
            "slice_rows: {start}..{} out of {rows} rows",
            start + count
        );
        let data = self.0.borrow().data[start * cols..(start + count) * cols].to_vec();
        Tensor::from_op(data, count, cols, Op::SliceRows(self.clone(), start))
    }

    /// Mean categorical cross-entropy of each row's logits against `targets[row]`.
    /// Returns a `1 × 1` tensor.
    #[must_use]
    pub fn cross_entropy(&self, targets: &[usize]) -> Tensor {
        let (rows, cols) = self.shape();
        assert_eq!(
            targets.len(),
            rows,
            "cross_entropy: {} targets for {rows} rows",
            targets.len()
        );
        let mut probs = vec![0.0; rows * cols];
        let mut total = 0.0;
        {
            let a = self.0.borrow();
            for (r, &t) in targets.iter().enumerate() {
                assert!(t < cols, "cross_entropy: target {t} out of {cols} classes");
                let row = &a.data[r * cols..(r + 1) * cols];
                let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let sum_exp: f64 = row.iter().map(|x| (x - max).exp()).sum();
                let log_sum_exp = max + sum_exp.ln();
                total += log_sum_exp - row[t];
                softmax_into(row, &mut probs[r * cols..(r + 1) * cols]);
            }
        }
        let loss = total / rows as f64;
        Tensor::from_op(
            vec![loss],
            1,
            1,
            Op::CrossEntropy {
                logits: self.clone(),
                targets: targets.to_vec(),
                probs,
            },
        )
    }
}
