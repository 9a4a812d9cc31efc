use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use rayon::prelude::*;

/// Constants for Linear Layer
const WEIGHT_RANK: usize = 2;
const BIAS_RANK: usize = 1;

/// Linear Layer: `y = xA^T + b`
///
/// Maps vectors of width `in_features` to width `out_features`. In attention this is the
/// projector that turns raw embeddings into queries, keys and values (bias-free), and the
/// optional output projection applied after the heads are concatenated.
///
/// The weight is stored `[out_features, in_features]`, so one row per output feature. The
/// forward pass multiplies against that layout directly instead of transposing the weight.
///
/// # Examples
/// ```rust
/// use attn_rs::nn::Linear;
/// use attn_rs::tensor::Tensor;
///
/// // 10 inputs, 5 outputs
/// let layer = Linear::<f32>::new(Tensor::zeros([5, 10]), Some(Tensor::zeros([5])));
/// let y = layer.forward(&Tensor::ones([3, 10])).unwrap();
/// assert_eq!(y.shape(), &[3, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct Linear<T: TensorElem> {
    /// The weights of the layer.
    /// - Shape: `[out_features, in_features]`
    pub weight: Tensor<T, WEIGHT_RANK>,

    /// The bias of the layer.
    /// - Shape: `[out_features]`
    pub bias: Option<Tensor<T, BIAS_RANK>>,
}

impl<T: TensorElem> Linear<T> {
    /// Creates a new Linear layer. The bias length is checked on every forward pass.
    pub fn new(weight: Tensor<T, WEIGHT_RANK>, bias: Option<Tensor<T, BIAS_RANK>>) -> Self {
        Self { weight, bias }
    }

    /// Like [`Linear::new`] but rejects a bias whose length differs from `out_features`.
    pub fn try_new(
        weight: Tensor<T, WEIGHT_RANK>,
        bias: Option<Tensor<T, BIAS_RANK>>,
    ) -> Result<Self> {
        let layer = Self::new(weight, bias);
        layer.check_bias()?;
        Ok(layer)
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    /// Projects a sequence: `[T, in_features] -> [T, out_features]`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::DimensionMismatch` if the input width is not `in_features`, or if
    /// the bias length is not `out_features`.
    pub fn forward(&self, x: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
        let [_, width] = *x.shape();
        if width != self.in_features() {
            return Err(TensorError::DimensionMismatch {
                op: "linear",
                expected: self.in_features(),
                got: width,
            });
        }

        let out = x.matmul_transposed(&self.weight)?;
        match &self.bias {
            Some(bias) => Self::add_bias(out, bias),
            None => Ok(out),
        }
    }

    /// Projects a single vector: `[in_features] -> [out_features]`.
    pub fn forward_vector(&self, x: &Tensor<T, 1>) -> Result<Tensor<T, 1>> {
        let [len] = *x.shape();
        let row: Tensor<T, 2> = x.clone().reshape([1, len])?;
        self.forward(&row)?.reshape([self.out_features()])
    }

    fn check_bias(&self) -> Result<()> {
        if let Some(bias) = &self.bias {
            let [b_cols] = *bias.shape();
            if b_cols != self.out_features() {
                return Err(TensorError::DimensionMismatch {
                    op: "linear_bias",
                    expected: self.out_features(),
                    got: b_cols,
                });
            }
        }
        Ok(())
    }

    /// Helper to add bias to every row of a 2D tensor.
    fn add_bias(mut x: Tensor<T, 2>, bias: &Tensor<T, BIAS_RANK>) -> Result<Tensor<T, 2>> {
        let [_, cols] = *x.shape();
        let [b_cols] = *bias.shape();

        if cols != b_cols {
            return Err(TensorError::DimensionMismatch {
                op: "linear_bias",
                expected: cols,
                got: b_cols,
            });
        }
        if cols == 0 {
            return Ok(x);
        }

        x.data_mut().par_chunks_mut(cols).for_each(|row| {
            for (r, b) in row.iter_mut().zip(bias.data()) {
                *r += *b;
            }
        });

        Ok(x)
    }
}

impl<T: TensorElem> Module<T> for Linear<T> {
    fn num_parameters(&self) -> usize {
        self.weight.size() + self.bias.as_ref().map_or(0, |b| b.size())
    }
}
