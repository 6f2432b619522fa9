//! Tensor autograd: computation graph of dense row-major matrices with backpropagation.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::Add;
use std::rc::Rc;

use super::ops::Op;

/// Internal matrix node: forward values, gradient, shape and the op that produced it.
pub(crate) struct Node {
    /// Forward pass values, row-major.
    pub(crate) data: Vec<f64>,
    /// Gradient of the loss with respect to each value; filled in backward.
    pub(crate) grad: Vec<f64>,
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    /// Producing op; [`Op::Leaf`] for parameters and constants.
    pub(crate) op: Op,
}

/// Handle to a matrix node in the autograd computation graph.
///
/// Cloning is cheap (reference-counted) and every clone refers to the same
/// values and gradient. Leaves created with [`Tensor::new`] are what the model
/// stores as parameters; every op returns a fresh non-leaf node that remembers
/// its inputs so [`Tensor::backward`] can walk the graph.
#[derive(Clone)]
pub struct Tensor(pub(crate) Rc<RefCell<Node>>);

impl Tensor {
    /// Creates a leaf `rows × cols` tensor from row-major values.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    #[must_use]
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "tensor: {} values do not fill a {rows}x{cols} matrix",
            data.len()
        );
        Tensor::from_op(data, rows, cols, Op::Leaf)
    }

    /// Leaf tensor filled with zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Tensor::full(rows, cols, 0.0)
    }

    /// Leaf tensor filled with `value`.
    #[must_use]
    pub fn full(rows: usize, cols: usize, value: f64) -> Self {
        Tensor::new(vec![value; rows * cols], rows, cols)
    }

    /// Leaf tensor whose element `(r, c)` is `f(r, c)`.
    #[must_use]
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Tensor::new(data, rows, cols)
    }

    pub(crate) fn from_op(data: Vec<f64>, rows: usize, cols: usize, op: Op) -> Self {
        let grad = vec![0.0; data.len()];
        Tensor(Rc::new(RefCell::new(Node {
            data,
            grad,
            rows,
            cols,
            op,
        })))
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        let node = self.0.borrow();
        (node.rows, node.cols)
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.0.borrow().rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.0.borrow().cols
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forward values, row-major.
    #[must_use]
    pub fn data(&self) -> Vec<f64> {
        self.0.borrow().data.clone()
    }

    /// Gradients (after [`backward`](Tensor::backward)), row-major.
    #[must_use]
    pub fn grad(&self) -> Vec<f64> {
        self.0.borrow().grad.clone()
    }

    /// Values of row `r`.
    #[must_use]
    pub fn row(&self, r: usize) -> Vec<f64> {
        let node = self.0.borrow();
        assert!(r < node.rows, "tensor: row {r} out of {} rows", node.rows);
        node.data[r * node.cols..(r + 1) * node.cols].to_vec()
    }

    /// Value at `(r, c)`.
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let node = self.0.borrow();
        assert!(
            r < node.rows && c < node.cols,
            "tensor: index ({r}, {c}) out of a {}x{} matrix",
            node.rows,
            node.cols
        );
        node.data[r * node.cols + c]
    }

    /// The single value of a `1 × 1` tensor (e.g. a loss).
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not `1 × 1`.
    #[must_use]
    pub fn item(&self) -> f64 {
        let node = self.0.borrow();
        assert!(
            node.rows == 1 && node.cols == 1,
            "tensor: item() on a {}x{} matrix",
            node.rows,
            node.cols
        );
        node.data[0]
    }

    /// Returns `true` if this tensor was not produced by an op.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.0.borrow().op, Op::Leaf)
    }

    /// Overwrites the values in place, keeping the shape.
    ///
    /// # Panics
    ///
    /// Panics if `data` has a different length.
    pub fn set_data(&self, data: Vec<f64>) {
        let mut node = self.0.borrow_mut();
        assert_eq!(
            data.len(),
            node.data.len(),
            "tensor: set_data length mismatch"
        );
        node.data = data;
    }

    /// Mutates values in place with access to the current gradient (optimizer updates).
    pub fn update_data(&self, f: impl FnOnce(&mut [f64], &[f64])) {
        let mut node = self.0.borrow_mut();
        let Node { data, grad, .. } = &mut *node;
        f(data, grad);
    }

    /// Multiplies the gradient in place by `factor` (gradient clipping).
    pub fn scale_grad(&self, factor: f64) {
        for g in &mut self.0.borrow_mut().grad {
            *g *= factor;
        }
    }

    /// Adds `g` elementwise to this node's gradient.
    pub(crate) fn accumulate(&self, g: &[f64]) {
        let mut node = self.0.borrow_mut();
        debug_assert_eq!(node.grad.len(), g.len());
        for (acc, x) in node.grad.iter_mut().zip(g) {
            *acc += x;
        }
    }

    /// Sets the gradient to zero (e.g. after an optimizer step).
    pub fn zero_grad(&self) {
        self.0.borrow_mut().grad.fill(0.0);
    }

    /// Runs backprop from this node: seeds its gradient with ones, then applies
    /// the chain rule to every reachable node in reverse topological order.
    pub fn backward(&self) {
        let mut topo = Vec::new();
        let mut visited = HashSet::new();
        fn build_topo(
            t: &Tensor,
            visited: &mut HashSet<*const RefCell<Node>>,
            topo: &mut Vec<Tensor>,
        ) {
            if !visited.insert(Rc::as_ptr(&t.0)) {
                return;
            }
            let node = t.0.borrow();
            for parent in node.op.parents() {
                build_topo(parent, visited, topo);
            }
            drop(node);
            topo.push(t.clone());
        }
        build_topo(self, &mut visited, &mut topo);
        self.0.borrow_mut().grad.fill(1.0);
        for t in topo.iter().rev() {
            let node = t.0.borrow();
            node.op.propagate(&node.data, &node.grad, node.rows, node.cols);
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0.borrow();
        f.debug_struct("Tensor")
            .field("rows", &node.rows)
            .field("cols", &node.cols)
            .field("op", &node.op.name())
            .finish_non_exhaustive()
    }
}

impl Add for &Tensor {
    type Output = Tensor;

    fn add(self, rhs: Self) -> Tensor {
        self.add_tensor(rhs)
    }
}
