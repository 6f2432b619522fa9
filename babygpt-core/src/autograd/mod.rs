//! Autograd: dense matrix computation graphs with automatic differentiation.
//!
//! [`Tensor`] is a handle to a `rows × cols` matrix of `f64`. Every op records
//! its inputs, so the graph is built during the forward pass;
//! [`Tensor::backward`] then propagates gradients from a loss node to all
//! leaves using the chain rule in reverse topological order.
//!
//! Only the ops the transformer needs are provided. Shape mismatches are
//! programmer errors and panic.

pub mod impls;

pub use impls::ops::softmax;
pub use impls::tensor::Tensor;
