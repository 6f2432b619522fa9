//! # babygpt-core
//!
//! A character-level decoder-only transformer trained from scratch on a small
//! corpus: tensor autograd, tokenizer, data pipeline, transformer layers, AdamW
//! training loop, sampling-based generation and JSON checkpoints.

pub mod autograd;
pub mod checkpoint;
pub mod config;
pub mod data;
mod error;
pub mod model;
pub mod nn;
pub mod optim;
pub mod tokenizer;
pub mod train;

pub use error::{Error, Result};
