//! Slice-level CPU kernels for `attn-rs`.
//!
//! Kernels operate on flat, row-major slices plus an explicit shape. They know nothing about
//! the `Tensor` type, which keeps them swappable (BLAS, SIMD) without touching the tensor
//! layer. Every kernel parallelizes over output rows with `rayon` once the problem is larger
//! than [`PARALLEL_THRESHOLD`] elements.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_matmul;
pub mod cpu_softmax;
pub mod cpu_transpose;

pub use cpu_matmul::{cpu_matmul, RhsLayout};
pub use cpu_softmax::cpu_softmax_rows;
pub use cpu_transpose::cpu_transpose;

/// Below this many output elements the kernels stay on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 4096;

#[derive(Error, Debug, PartialEq)]
pub enum KernelError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A logit entering softmax was NaN or infinite.
    #[error("Non-finite value in softmax row {row}")]
    NonFinite { row: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Trait bound for elements that can be processed by kernels.
/// This mirrors `TensorElem` in the main crate to avoid circular dependencies.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}
