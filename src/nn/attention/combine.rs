use crate::nn::{Linear, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

/// How per-head contexts `[T, d_v]` are merged into one output.
#[derive(Debug, Clone)]
pub enum HeadCombiner<T: TensorElem> {
    /// Per-position concatenation in head order, width `h · d_v`.
    Concat,
    /// Concatenation followed by an output projection `[d_out, h · d_v]`, width `d_out`.
    ConcatProject(Linear<T>),
    /// Element-wise mean of the head contexts, width `d_v`.
    Average,
}

impl<T: TensorElem> Default for HeadCombiner<T> {
    fn default() -> Self {
        HeadCombiner::Concat
    }
}

impl<T: TensorElem> HeadCombiner<T> {
    /// Width of the combined output for `num_heads` heads of width `d_v`.
    pub fn output_width(&self, num_heads: usize, d_v: usize) -> usize {
        match self {
            HeadCombiner::Concat => num_heads * d_v,
            HeadCombiner::ConcatProject(proj) => proj.out_features(),
            HeadCombiner::Average => d_v,
        }
    }

    /// Checks that `num_heads` contexts of width `d_v` can be combined.
    pub fn validate(&self, num_heads: usize, d_v: usize) -> Result<()> {
        if let HeadCombiner::ConcatProject(proj) = self {
            if proj.in_features() != num_heads * d_v {
                return Err(TensorError::DimensionMismatch {
                    op: "head_combiner",
                    expected: num_heads * d_v,
                    got: proj.in_features(),
                });
            }
        }
        Ok(())
    }

    /// Merges the contexts, which must be given in head order.
    pub fn combine(&self, contexts: &[&Tensor<T, 2>]) -> Result<Tensor<T, 2>> {
        let first = contexts.first().ok_or(TensorError::DimensionMismatch {
            op: "head_combiner",
            expected: 1,
            got: 0,
        })?;

        match self {
            HeadCombiner::Concat => Tensor::concat_cols(contexts),
            HeadCombiner::ConcatProject(proj) => proj.forward(&Tensor::concat_cols(contexts)?),
            HeadCombiner::Average => {
                let mut sum = (*first).clone();
                for ctx in &contexts[1..] {
                    if ctx.shape() != first.shape() {
                        return Err(TensorError::DimensionMismatch {
                            op: "head_combiner",
                            expected: first.cols(),
                            got: ctx.cols(),
                        });
                    }
                    sum = (&sum + *ctx)?;
                }
                let n = T::from_usize(contexts.len()).ok_or_else(|| {
                    TensorError::Unsupported(format!("head count {} not representable", contexts.len()))
                })?;
                Ok(sum.map(|x| x / n))
            }
        }
    }
}

impl<T: TensorElem> Module<T> for HeadCombiner<T> {
    fn num_parameters(&self) -> usize {
        match self {
            HeadCombiner::ConcatProject(proj) => proj.num_parameters(),
            HeadCombiner::Concat | HeadCombiner::Average => 0,
        }
    }
}
