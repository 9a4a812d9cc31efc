use super::head::AttentionHead;
use super::AttentionOutput;
use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use num_traits::Float;

/// Single-head cross-attention: queries from one sequence, keys and values from another.
///
/// The two sequences may differ in length but must share the embedding width. The output has
/// one row per query position, whatever the length of the key/value sequence.
#[derive(Debug, Clone)]
pub struct CrossAttention<T: TensorElem> {
    head: AttentionHead<T>,
}

impl<T: TensorElem + Float> CrossAttention<T> {
    pub fn new(head: AttentionHead<T>) -> Self {
        Self { head }
    }

    pub fn head(&self) -> &AttentionHead<T> {
        &self.head
    }

    /// Context `[T1, d_v]` for queries `x_q [T1, d]` over `x_kv [T2, d]`.
    pub fn forward(&self, x_q: &Tensor<T, 2>, x_kv: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
        check_widths(x_q, x_kv)?;
        self.head.forward_cross(x_q, x_kv)
    }

    pub fn forward_detailed(
        &self,
        x_q: &Tensor<T, 2>,
        x_kv: &Tensor<T, 2>,
    ) -> Result<AttentionOutput<T>> {
        check_widths(x_q, x_kv)?;
        self.head.forward_detailed(x_q, x_kv)
    }
}

pub(crate) fn check_widths<T: TensorElem>(x_q: &Tensor<T, 2>, x_kv: &Tensor<T, 2>) -> Result<()> {
    if x_q.cols() != x_kv.cols() {
        return Err(TensorError::DimensionMismatch {
            op: "cross_attention",
            expected: x_q.cols(),
            got: x_kv.cols(),
        });
    }
    Ok(())
}

impl<T: TensorElem + Float> Module<T> for CrossAttention<T> {
    fn num_parameters(&self) -> usize {
        self.head.num_parameters()
    }
}
