use super::aggregator::aggregate;
use super::scorer::AttentionScorer;
use super::weights::ProjectionWeights;
use super::AttentionOutput;
use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem};
use log::debug;
use num_traits::Float;

/// One attention head: projections, scorer and aggregator composed.
///
/// Self-attention is the case where queries and keys/values come from the same sequence, and
/// is computed literally as `forward_cross(x, x)`.
#[derive(Debug, Clone)]
pub struct AttentionHead<T: TensorElem> {
    weights: ProjectionWeights<T>,
    scorer: AttentionScorer,
}

impl<T: TensorElem + Float> AttentionHead<T> {
    /// A head with `1/√dk` scaling and no mask.
    pub fn new(weights: ProjectionWeights<T>) -> Self {
        Self::with_scorer(weights, AttentionScorer::default())
    }

    pub fn with_scorer(weights: ProjectionWeights<T>, scorer: AttentionScorer) -> Self {
        Self { weights, scorer }
    }

    pub fn weights(&self) -> &ProjectionWeights<T> {
        &self.weights
    }

    pub fn scorer(&self) -> &AttentionScorer {
        &self.scorer
    }

    pub fn d_in(&self) -> usize {
        self.weights.d_in()
    }

    pub fn d_k(&self) -> usize {
        self.weights.d_k()
    }

    pub fn d_v(&self) -> usize {
        self.weights.d_v()
    }

    /// Self-attention over `x [T, d_in]`, returning the context `[T, d_v]`.
    pub fn forward(&self, x: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
        self.forward_cross(x, x)
    }

    /// Attention with queries from `x_q [T_q, d_in]` and keys/values from `x_kv [T_kv, d_in]`.
    pub fn forward_cross(&self, x_q: &Tensor<T, 2>, x_kv: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
        Ok(self.forward_detailed(x_q, x_kv)?.context)
    }

    /// Like [`forward_cross`](Self::forward_cross) but keeps every intermediate.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if either input is not `d_in` wide.
    /// - `EmptySequence` if `x_kv` has no rows.
    /// - `NumericInstability` if a score is NaN or infinite.
    pub fn forward_detailed(
        &self,
        x_q: &Tensor<T, 2>,
        x_kv: &Tensor<T, 2>,
    ) -> Result<AttentionOutput<T>> {
        let (queries, keys, values) = self.weights.project(x_q, x_kv)?;
        let (scores, weights) = self.scorer.forward(&queries, &keys)?;
        let context = aggregate(&weights, &values)?;

        debug!(
            "attention head: q {:?}, kv {:?}, scores {:?}, context {:?}",
            x_q.shape(),
            x_kv.shape(),
            scores.shape(),
            context.shape()
        );

        Ok(AttentionOutput {
            queries,
            keys,
            values,
            scores,
            weights,
            context,
        })
    }
}

impl<T: TensorElem + Float> Module<T> for AttentionHead<T> {
    fn num_parameters(&self) -> usize {
        self.weights.num_parameters()
    }
}
