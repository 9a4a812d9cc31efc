//! Multi-head orchestration.
//!
//! Every head owns its projections and produces its own `(Ω, α, Z)`. A head's weights are
//! only ever applied to that head's values; the per-head results are tagged with their head
//! index and handed to a [`HeadCombiner`] in index order.

use super::combine::HeadCombiner;
use super::config::{AttentionConfig, CombineStrategy};
use super::cross::check_widths;
use super::head::AttentionHead;
use super::scorer::AttentionScorer;
use super::weights::ProjectionWeights;
use super::AttentionOutput;
use crate::nn::{Linear, Module};
use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use log::{debug, trace};
use num_traits::Float;
use rand::Rng;
use rayon::prelude::*;

/// The full result of one head, tagged with its position in the module.
#[derive(Debug, Clone)]
pub struct HeadOutput<T: TensorElem> {
    pub head: usize,
    pub output: AttentionOutput<T>,
}

/// `h` independent attention heads over the same input(s), combined by a [`HeadCombiner`].
///
/// All heads share `d_in`, `d_k` and `d_v`.
#[derive(Debug, Clone)]
pub struct MultiHeadAttention<T: TensorElem> {
    heads: Vec<AttentionHead<T>>,
    combiner: HeadCombiner<T>,
    parallel: bool,
}

impl<T: TensorElem + Float> MultiHeadAttention<T> {
    /// # Errors
    ///
    /// - `InvalidConfig` if `heads` is empty.
    /// - `DimensionMismatch` if the heads disagree on `d_in`, `d_k` or `d_v`, or if the
    ///   combiner cannot take `h` contexts of width `d_v`.
    pub fn new(heads: Vec<AttentionHead<T>>, combiner: HeadCombiner<T>) -> Result<Self> {
        let first = heads.first().ok_or_else(|| {
            TensorError::InvalidConfig("multi-head attention needs at least one head".to_string())
        })?;
        let dims = [first.d_in(), first.d_k(), first.d_v()];

        for head in &heads[1..] {
            let other = [head.d_in(), head.d_k(), head.d_v()];
            if let Some((&expected, &got)) = dims.iter().zip(&other).find(|(a, b)| a != b) {
                return Err(TensorError::DimensionMismatch {
                    op: "multi_head",
                    expected,
                    got,
                });
            }
        }
        combiner.validate(heads.len(), dims[2])?;

        Ok(Self {
            heads,
            combiner,
            parallel: true,
        })
    }

    /// Builds every head from one caller-owned generator.
    ///
    /// Heads are drawn in index order, each in the order query, key, value; the output
    /// projection of [`CombineStrategy::ConcatProject`] is drawn last.
    pub fn from_config<R: Rng + ?Sized>(config: &AttentionConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let scorer = AttentionScorer::new(config.score_scale, config.mask);

        let mut heads = Vec::with_capacity(config.num_heads);
        for index in 0..config.num_heads {
            let weights = ProjectionWeights::<T>::random(
                config.d_in,
                config.d_k,
                config.d_v,
                &config.init,
                &mut *rng,
            )?;
            trace!("initialized head {index}: {} parameters", weights.num_parameters());
            heads.push(AttentionHead::with_scorer(weights, scorer));
        }

        let combiner = match config.combine {
            CombineStrategy::Concat => HeadCombiner::Concat,
            CombineStrategy::Average => HeadCombiner::Average,
            CombineStrategy::ConcatProject { d_out } => {
                let w_o = config
                    .init
                    .sample([d_out, config.num_heads * config.d_v], &mut *rng)?;
                HeadCombiner::ConcatProject(Linear::new(w_o, None))
            }
        };

        Ok(Self::new(heads, combiner)?.with_parallel(config.parallel_heads))
    }

    /// Runs heads on the rayon pool (`true`, the default) or one after another.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn num_heads(&self) -> usize {
        self.heads.len()
    }

    pub fn heads(&self) -> &[AttentionHead<T>] {
        &self.heads
    }

    pub fn combiner(&self) -> &HeadCombiner<T> {
        &self.combiner
    }

    pub fn d_in(&self) -> usize {
        self.heads[0].d_in()
    }

    pub fn d_k(&self) -> usize {
        self.heads[0].d_k()
    }

    pub fn d_v(&self) -> usize {
        self.heads[0].d_v()
    }

    /// Width of one combined output row.
    pub fn output_width(&self) -> usize {
        self.combiner.output_width(self.heads.len(), self.d_v())
    }

    /// Multi-head self-attention over `x [T, d_in]`.
    pub fn forward(&self, x: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
        self.forward_cross(x, x)
    }

    /// Multi-head cross-attention, output `[T_q, output_width]`.
    pub fn forward_cross(&self, x_q: &Tensor<T, 2>, x_kv: &Tensor<T, 2>) -> Result<Tensor<T, 2>> {
        let outputs = self.forward_heads(x_q, x_kv)?;
        self.combine(&outputs)
    }

    /// Runs every head and returns the per-head results in head order.
    pub fn forward_heads(
        &self,
        x_q: &Tensor<T, 2>,
        x_kv: &Tensor<T, 2>,
    ) -> Result<Vec<HeadOutput<T>>> {
        check_widths(x_q, x_kv)?;
        debug!(
            "multi-head attention: {} heads, q {:?}, kv {:?}, parallel {}",
            self.heads.len(),
            x_q.shape(),
            x_kv.shape(),
            self.parallel
        );

        let run = |(head, attn): (usize, &AttentionHead<T>)| {
            trace!("running head {head}");
            attn.forward_detailed(x_q, x_kv)
                .map(|output| HeadOutput { head, output })
        };

        if self.parallel {
            self.heads.par_iter().enumerate().map(run).collect()
        } else {
            self.heads.iter().enumerate().map(run).collect()
        }
    }

    /// Combines per-head results produced by this module.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the number of outputs differs from the number of heads, or if
    /// output `i` does not carry head index `i`.
    pub fn combine(&self, outputs: &[HeadOutput<T>]) -> Result<Tensor<T, 2>> {
        if outputs.len() != self.heads.len() {
            return Err(TensorError::DimensionMismatch {
                op: "combine_heads",
                expected: self.heads.len(),
                got: outputs.len(),
            });
        }
        for (index, out) in outputs.iter().enumerate() {
            if out.head != index {
                return Err(TensorError::DimensionMismatch {
                    op: "head_index",
                    expected: index,
                    got: out.head,
                });
            }
        }

        let contexts: Vec<&Tensor<T, 2>> = outputs.iter().map(|o| &o.output.context).collect();
        self.combiner.combine(&contexts)
    }
}

impl<T: TensorElem + Float> Module<T> for MultiHeadAttention<T> {
    fn num_parameters(&self) -> usize {
        self.heads.iter().map(|h| h.num_parameters()).sum::<usize>()
            + self.combiner.num_parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::attention::AttentionMask;
    use crate::tensor::WeightInit;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(num_heads: usize) -> AttentionConfig {
        AttentionConfig {
            d_in: 4,
            d_k: 3,
            d_v: 2,
            num_heads,
            ..AttentionConfig::default()
        }
    }

    fn input() -> Tensor<f64, 2> {
        let data = (0..20).map(|i| (i as f64 * 0.37).sin()).collect();
        Tensor::new(data, [5, 4]).unwrap()
    }

    #[test]
    fn test_from_config_shapes() {
        let mha =
            MultiHeadAttention::<f64>::from_config(&config(3), &mut StdRng::seed_from_u64(1))
                .unwrap();
        assert_eq!(mha.num_heads(), 3);
        assert_eq!(mha.output_width(), 6);
        assert_eq!(mha.num_parameters(), 3 * (12 + 12 + 8));

        let out = mha.forward(&input()).unwrap();
        assert_eq!(out.shape(), &[5, 6]);
    }

    #[test]
    fn test_concat_matches_individual_heads() {
        let mha =
            MultiHeadAttention::<f64>::from_config(&config(2), &mut StdRng::seed_from_u64(2))
                .unwrap();
        let x = input();
        let out = mha.forward(&x).unwrap();

        for (h, head) in mha.heads().iter().enumerate() {
            let z = head.forward(&x).unwrap();
            for r in 0..5 {
                assert_eq!(&out.row(r).unwrap()[h * 2..(h + 1) * 2], z.row(r).unwrap());
            }
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let mha =
            MultiHeadAttention::<f64>::from_config(&config(4), &mut StdRng::seed_from_u64(3))
                .unwrap();
        let x = input();
        let parallel = mha.forward(&x).unwrap();
        let sequential = mha.clone().with_parallel(false).forward(&x).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_heads_are_indexed_in_order() {
        let mha =
            MultiHeadAttention::<f64>::from_config(&config(3), &mut StdRng::seed_from_u64(4))
                .unwrap();
        let outputs = mha.forward_heads(&input(), &input()).unwrap();
        let indices: Vec<usize> = outputs.iter().map(|o| o.head).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_combine_rejects_wrong_head_count_and_order() {
        let mha =
            MultiHeadAttention::<f64>::from_config(&config(2), &mut StdRng::seed_from_u64(5))
                .unwrap();
        let mut outputs = mha.forward_heads(&input(), &input()).unwrap();

        assert!(matches!(
            mha.combine(&outputs[..1]),
            Err(TensorError::DimensionMismatch { op: "combine_heads", expected: 2, got: 1 })
        ));

        outputs.swap(0, 1);
        assert!(matches!(
            mha.combine(&outputs),
            Err(TensorError::DimensionMismatch { op: "head_index", .. })
        ));
    }

    #[test]
    fn test_new_validation() {
        assert!(matches!(
            MultiHeadAttention::<f64>::new(vec![], HeadCombiner::Concat),
            Err(TensorError::InvalidConfig(_))
        ));

        let mut rng = StdRng::seed_from_u64(6);
        let init = WeightInit::default();
        let a = AttentionHead::<f64>::new(ProjectionWeights::random(4, 3, 2, &init, &mut rng).unwrap());
        let b = AttentionHead::new(ProjectionWeights::random(4, 3, 5, &init, &mut rng).unwrap());
        assert!(matches!(
            MultiHeadAttention::new(vec![a.clone(), b], HeadCombiner::Concat),
            Err(TensorError::DimensionMismatch { op: "multi_head", expected: 2, got: 5 })
        ));

        let proj = Linear::new(Tensor::zeros([3, 7]), None);
        assert!(matches!(
            MultiHeadAttention::new(vec![a.clone(), a], HeadCombiner::ConcatProject(proj)),
            Err(TensorError::DimensionMismatch { op: "head_combiner", expected: 4, got: 7 })
        ));
    }

    #[test]
    fn test_concat_project_from_config() {
        let cfg = AttentionConfig {
            combine: CombineStrategy::ConcatProject { d_out: 4 },
            ..config(3)
        };
        let mha = MultiHeadAttention::<f64>::from_config(&cfg, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(mha.output_width(), 4);
        assert_eq!(mha.forward(&input()).unwrap().shape(), &[5, 4]);
    }

    #[test]
    fn test_causal_config_reaches_heads() {
        let cfg = AttentionConfig {
            mask: AttentionMask::Causal,
            ..config(2)
        };
        let mha = MultiHeadAttention::<f64>::from_config(&cfg, &mut StdRng::seed_from_u64(8))
            .unwrap();
        for out in mha.forward_heads(&input(), &input()).unwrap() {
            assert_eq!(out.output.weights.get([0, 1]).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_cross_width_checked_before_heads() {
        let mha =
            MultiHeadAttention::<f64>::from_config(&config(2), &mut StdRng::seed_from_u64(9))
                .unwrap();
        let x_kv = Tensor::<f64, 2>::zeros([3, 6]);
        assert!(matches!(
            mha.forward_cross(&input(), &x_kv),
            Err(TensorError::DimensionMismatch { op: "cross_attention", .. })
        ));
    }
}
