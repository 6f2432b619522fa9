//! Implementations behind [`Tensor`](super::Tensor): the node type and graph walk
//! live in [`tensor`], the differentiable ops in [`ops`].

pub mod ops;
pub mod tensor;
