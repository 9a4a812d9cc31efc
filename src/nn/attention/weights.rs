use crate::nn::{Linear, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError, WeightInit};
use rand::Rng;

/// The query, key and value projections of one head.
///
/// - `query`: `[d_k, d_in]`
/// - `key`: `[d_k, d_in]`
/// - `value`: `[d_v, d_in]`
///
/// Query and key share `d_k` so their dot products are defined; `d_v` is free.
#[derive(Debug, Clone)]
pub struct ProjectionWeights<T: TensorElem> {
    query: Linear<T>,
    key: Linear<T>,
    value: Linear<T>,
}

impl<T: TensorElem> ProjectionWeights<T> {
    /// Builds the projections from weight matrices stored `[out, in]`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `wq` and `wk` have different output widths, or if the three
    /// matrices disagree on the input width.
    pub fn new(wq: Tensor<T, 2>, wk: Tensor<T, 2>, wv: Tensor<T, 2>) -> Result<Self> {
        let [d_k, d_in] = *wq.shape();
        let [k_out, k_in] = *wk.shape();
        let [_, v_in] = *wv.shape();

        if k_out != d_k {
            return Err(TensorError::DimensionMismatch {
                op: "projection_weights",
                expected: d_k,
                got: k_out,
            });
        }
        for got in [k_in, v_in] {
            if got != d_in {
                return Err(TensorError::DimensionMismatch {
                    op: "projection_weights",
                    expected: d_in,
                    got,
                });
            }
        }

        Ok(Self {
            query: Linear::new(wq, None),
            key: Linear::new(wk, None),
            value: Linear::new(wv, None),
        })
    }

    /// Draws all three matrices from `rng`, in the order query, key, value.
    pub fn random<R: Rng + ?Sized>(
        d_in: usize,
        d_k: usize,
        d_v: usize,
        init: &WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let wq = init.sample([d_k, d_in], rng)?;
        let wk = init.sample([d_k, d_in], rng)?;
        let wv = init.sample([d_v, d_in], rng)?;
        Self::new(wq, wk, wv)
    }

    pub fn d_in(&self) -> usize {
        self.query.in_features()
    }

    pub fn d_k(&self) -> usize {
        self.query.out_features()
    }

    pub fn d_v(&self) -> usize {
        self.value.out_features()
    }

    pub fn query(&self) -> &Linear<T> {
        &self.query
    }

    pub fn key(&self) -> &Linear<T> {
        &self.key
    }

    pub fn value(&self) -> &Linear<T> {
        &self.value
    }

    /// Projects queries from `x_q` and keys/values from `x_kv`.
    pub fn project(
        &self,
        x_q: &Tensor<T, 2>,
        x_kv: &Tensor<T, 2>,
    ) -> Result<(Tensor<T, 2>, Tensor<T, 2>, Tensor<T, 2>)> {
        let q = self.query.forward(x_q)?;
        let k = self.key.forward(x_kv)?;
        let v = self.value.forward(x_kv)?;
        Ok((q, k, v))
    }
}

impl<T: TensorElem> Module<T> for ProjectionWeights<T> {
    fn num_parameters(&self) -> usize {
        self.query.num_parameters() + self.key.num_parameters() + self.value.num_parameters()
    }
}
