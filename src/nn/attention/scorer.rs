//! Scoring: raw compatibilities `Ω = Q·Kᵗ` and their normalization into attention weights.

use super::mask::AttentionMask;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use attn_rs_kernels::cpu_softmax_rows;
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Factor applied to `Ω` before the softmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// `1/√dk`. Keeps the logit variance near 1 as `dk` grows.
    #[default]
    InverseSqrtDk,
    /// `1/dk`. Over-flattens the distribution for large `dk`.
    InverseDk,
    /// No scaling. Saturates towards one-hot rows for large `dk`.
    Unscaled,
}

impl ScoreScale {
    pub fn factor<T: TensorElem + Float>(&self, d_k: usize) -> Result<T> {
        if matches!(self, ScoreScale::Unscaled) {
            return Ok(T::one());
        }
        if d_k == 0 {
            return Err(TensorError::InvalidConfig(
                "score scaling needs d_k > 0".to_string(),
            ));
        }
        let dk = T::from_usize(d_k)
            .ok_or_else(|| TensorError::Unsupported(format!("d_k {d_k} not representable")))?;
        Ok(match self {
            ScoreScale::InverseSqrtDk => dk.sqrt().recip(),
            ScoreScale::InverseDk => dk.recip(),
            ScoreScale::Unscaled => T::one(),
        })
    }
}

/// Computes the raw score matrix `Ω = Q·Kᵗ`, shape `[T_q, T_kv]`.
///
/// # Errors
///
/// `DimensionMismatch` if `q` and `k` have different widths.
pub fn attention_scores<T: TensorElem>(q: &Tensor<T, 2>, k: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
    if q.cols() != k.cols() {
        return Err(TensorError::DimensionMismatch {
            op: "attention_scores",
            expected: q.cols(),
            got: k.cols(),
        });
    }
    q.matmul_transposed(k)
}

/// Scales `Ω` and applies a masked, max-subtracted softmax to every row.
///
/// Masked entries come out as exactly zero. The visible entries of each row are
/// non-negative and sum to one.
///
/// # Errors
///
/// - `EmptySequence` if `Ω` has no columns (no keys to attend to).
/// - `NumericInstability` if a visible logit is NaN or infinite after scaling.
pub fn normalize_scores<T: TensorElem + Float>(
    scores: &Tensor<T, 2>,
    d_k: usize,
    scale: ScoreScale,
    mask: AttentionMask,
) -> Result<Tensor<T, 2>> {
    let [t_q, t_kv] = *scores.shape();
    if t_kv == 0 {
        return Err(TensorError::EmptySequence("softmax"));
    }

    let factor = scale.factor::<T>(d_k)?;
    let mut data = scores.data().to_vec();
    cpu_softmax_rows(&mut data, t_kv, factor, |row| mask.visible(row, t_kv))?;
    Tensor::new(data, [t_q, t_kv])
}

/// The scoring stage of one head: a scale and a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttentionScorer {
    pub scale: ScoreScale,
    pub mask: AttentionMask,
}

impl AttentionScorer {
    pub fn new(scale: ScoreScale, mask: AttentionMask) -> Self {
        Self { scale, mask }
    }

    /// Returns `(Ω, α)` for queries `q` and keys `k`.
    pub fn forward<T: TensorElem + Float>(
        &self,
        q: &Tensor<T, 2>,
        k: &Tensor<T, 2>,
    ) -> Result<(Tensor<T, 2>, Tensor<T, 2>)> {
        let scores = attention_scores(q, k)?;
        let weights = normalize_scores(&scores, q.cols(), self.scale, self.mask)?;
        Ok((scores, weights))
    }
}
