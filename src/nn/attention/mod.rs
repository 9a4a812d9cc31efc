//! Scaled dot-product attention.
//!
//! # Overview
//!
//! For queries `Q [T_q, d_k]`, keys `K [T_kv, d_k]` and values `V [T_kv, d_v]`:
//!
//! ```text
//! Ω = Q·Kᵗ                    [T_q, T_kv]
//! α = softmax(Ω / √d_k)       row-wise
//! Z = α·V                     [T_q, d_v]
//! ```
//!
//! Q, K and V are linear projections of the input embeddings. In self-attention they all come
//! from one sequence; in cross-attention the queries come from one sequence and the keys and
//! values from another.
//!
//! The pieces are exposed separately so each stage can be inspected:
//!
//! - [`attention_scores`], [`normalize_scores`], [`AttentionScorer`]: `Ω` and `α`.
//! - [`aggregate`]: `Z`.
//! - [`AttentionHead`]: one head, self or cross.
//! - [`CrossAttention`]: a head that checks both sequences share a width.
//! - [`MultiHeadAttention`]: `h` heads combined by a [`HeadCombiner`].
//!
//! > [!TIP]
//! > [`AttentionHead::forward_detailed`] returns every intermediate of a pass as an
//! > [`AttentionOutput`].
//!
//! # Example
//!
//! ```rust
//! use attn_rs::nn::attention::{AttentionConfig, MultiHeadAttention};
//! use attn_rs::tensor::Tensor;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let config = AttentionConfig { num_heads: 3, ..AttentionConfig::default() };
//! let mut rng = StdRng::seed_from_u64(123);
//! let mha = MultiHeadAttention::<f32>::from_config(&config, &mut rng).unwrap();
//!
//! let x = Tensor::<f32, 2>::ones([6, 16]);
//! let z = mha.forward(&x).unwrap();
//! assert_eq!(z.shape(), &[6, 84]);
//! ```

use crate::tensor::{Tensor, TensorElem};

pub mod aggregator;
pub mod combine;
pub mod config;
pub mod cross;
pub mod head;
pub mod mask;
pub mod multi_head;
pub mod scorer;
pub mod weights;

pub use aggregator::aggregate;
pub use combine::HeadCombiner;
pub use config::{AttentionConfig, CombineStrategy};
pub use cross::CrossAttention;
pub use head::AttentionHead;
pub use mask::AttentionMask;
pub use multi_head::{HeadOutput, MultiHeadAttention};
pub use scorer::{attention_scores, normalize_scores, AttentionScorer, ScoreScale};
pub use weights::ProjectionWeights;

/// Every intermediate of one head's forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionOutput<T: TensorElem> {
    /// `[T_q, d_k]`
    pub queries: Tensor<T, 2>,
    /// `[T_kv, d_k]`
    pub keys: Tensor<T, 2>,
    /// `[T_kv, d_v]`
    pub values: Tensor<T, 2>,
    /// Unscaled `Ω`, `[T_q, T_kv]`.
    pub scores: Tensor<T, 2>,
    /// Normalized `α`, `[T_q, T_kv]`.
    pub weights: Tensor<T, 2>,
    /// `Z`, `[T_q, d_v]`.
    pub context: Tensor<T, 2>,
}
