//! # attn-rs
//!
//! `attn-rs` is a pure Rust implementation of scaled dot-product attention: the procedure that
//! turns a sequence of embedding vectors into context-aware vectors. It covers single-head
//! self-attention, cross-attention between two sequences, and multi-head attention with
//! configurable head combination.
//!
//! Everything runs on the CPU. Large matrix products and row-wise softmax are parallelized with
//! `rayon` in the `attn-rs-kernels` crate.
//!
//! ## Modules
//!
//! - [`mod@tensor`]: Row-major tensors, the crate error type and seeded weight initialization.
//! - [`nn`]: Linear projections and the attention layers.
//!
//! ## Example
//!
//! ```rust
//! use attn_rs::nn::attention::{AttentionHead, ProjectionWeights};
//! use attn_rs::tensor::{Tensor, WeightInit};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let weights = ProjectionWeights::<f32>::random(16, 24, 28, &WeightInit::default(), &mut rng).unwrap();
//! let head = AttentionHead::new(weights);
//!
//! let x = Tensor::<f32, 2>::ones([6, 16]);
//! let z = head.forward(&x).unwrap();
//! assert_eq!(z.shape(), &[6, 28]);
//! ```

pub mod nn;
pub mod tensor;

pub use tensor::{Result, Tensor, TensorError};
