use crate::tensor::TensorElem;
use std::fmt::Debug;

/// A Module trait for Neural Network layers.
///
/// All layers (projections, attention heads, multi-head blocks) implement this trait. The
/// `Debug + Send + Sync` bound lets a module be shared across the `rayon` pool.
pub trait Module<T: TensorElem>: Debug + Send + Sync {
    /// Number of scalar parameters held by the module.
    fn num_parameters(&self) -> usize;
}
