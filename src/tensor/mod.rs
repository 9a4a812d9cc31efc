//! Core Tensor implementation.
//!
//! This module defines the `Tensor` struct, the dense container every attention component
//! reads and writes. Tensors are row-major, contiguous and carry their rank as a const
//! generic, so an embedding sequence is a `Tensor<T, 2>` of shape `[T, d]` and a single
//! vector is a `Tensor<T, 1>`.
//!
//! # Key Components
//!
//! - [`Tensor`]: The N-dimensional array.
//! - [`TensorError`]: Error type shared by the whole crate.
//! - [`TensorElem`]: Trait bound for elements that can be stored in a tensor.
//! - [`WeightInit`]: Seeded random initialization of weight matrices.
//!
//! # Examples
//!
//! ```rust
//! use attn_rs::tensor::Tensor;
//!
//! let data = vec![1.0, 2.0, 3.0, 4.0];
//! let tensor = Tensor::<f32, 2>::new(data, [2, 2]).unwrap();
//! assert_eq!(tensor.shape(), &[2, 2]);
//! ```

use attn_rs_kernels::KernelError;
use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod init;
pub mod ops;

pub use init::WeightInit;

/// Error type for Tensor and attention operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A width or length disagreement between two operands of `op`.
    #[error("Dimension mismatch in {op}: expected {expected}, got {got}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },
    /// A NaN or infinite logit reached the softmax of row `row`.
    #[error("Numeric instability in {op}: non-finite value in row {row}")]
    NumericInstability { op: &'static str, row: usize },
    #[error("Empty sequence in {0}")]
    EmptySequence(&'static str),
    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;

impl From<KernelError> for TensorError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
            KernelError::NonFinite { row } => TensorError::NumericInstability {
                op: "softmax",
                row,
            },
        }
    }
}

/// Trait bound for elements that can be stored in a Tensor.
///
/// # Requirements
/// - `Copy + Clone`: Elements live in a contiguous `Vec<T>` and are read by value.
/// - `Num + ...`: Provides the numeric operations tensor math needs.
/// - `Send + Sync`: Required for parallel execution via `rayon`.
pub trait TensorElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> TensorElem for T where
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

/// The core Tensor struct.
///
/// # Generics
///
/// - `T`: The element type (must implement `TensorElem`).
/// - `RANK`: The number of dimensions (const generic).
#[derive(Clone, PartialEq)]
pub struct Tensor<T, const RANK: usize>
where
    T: TensorElem,
{
    shape: [usize; RANK],
    strides: [usize; RANK],
    data: Vec<T>,
}

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem,
{
    /// Creates a new Tensor from a vector of data and a shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the length of `data` does not match the product of `shape`.
    pub fn new(data: Vec<T>, shape: [usize; RANK]) -> Result<Self> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![size],
                got: vec![data.len()],
            });
        }

        let strides = compute_strides(&shape);
        Ok(Self {
            shape,
            strides,
            data,
        })
    }

    /// Creates a new Tensor filled with zeros.
    pub fn zeros(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::zero())
    }

    /// Creates a new Tensor filled with ones.
    pub fn ones(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::one())
    }

    /// Creates a new Tensor with every element set to `value`.
    pub fn full(shape: [usize; RANK], value: T) -> Self {
        let size: usize = shape.iter().product();
        Self {
            shape,
            strides: compute_strides(&shape),
            data: vec![value; size],
        }
    }

    /// Reshapes the tensor to a new shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the total number of elements in `new_shape`
    /// does not match the current size of the tensor.
    pub fn reshape<const NEW_RANK: usize>(
        self,
        new_shape: [usize; NEW_RANK],
    ) -> Result<Tensor<T, NEW_RANK>> {
        let current_size: usize = self.shape.iter().product();
        let new_size: usize = new_shape.iter().product();

        if current_size != new_size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![current_size],
                got: vec![new_size],
            });
        }

        Ok(Tensor {
            shape: new_shape,
            strides: compute_strides(&new_shape),
            data: self.data,
        })
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize; RANK] {
        &self.shape
    }

    /// Returns the strides of the tensor.
    pub fn strides(&self) -> &[usize; RANK] {
        &self.strides
    }

    /// Returns a reference to the underlying data as a slice.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns a mutable reference to the underlying data as a slice.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the tensor and returns its row-major buffer.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Returns the total number of elements in the tensor.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` if any coordinate exceeds its axis.
    pub fn get(&self, index: [usize; RANK]) -> Result<T> {
        if index.iter().zip(&self.shape).any(|(i, s)| i >= s) {
            return Err(TensorError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.to_vec(),
            });
        }
        let offset: usize = index.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
        Ok(self.data[offset])
    }
}

impl<T> Tensor<T, 2>
where
    T: TensorElem,
{
    /// Builds a `[rows.len(), width]` matrix from equally long rows.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::DimensionMismatch` if a row is shorter or longer than the first.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(TensorError::DimensionMismatch {
                    op: "from_rows",
                    expected: width,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, [rows.len(), width])
    }

    /// Number of rows (sequence length for an embedding sequence).
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns (feature width).
    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    /// Borrows row `i` as a slice.
    pub fn row(&self, i: usize) -> Result<&[T]> {
        if i >= self.shape[0] {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![i],
                shape: self.shape.to_vec(),
            });
        }
        let cols = self.shape[1];
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Iterates over the rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        let cols = self.shape[1].max(1);
        self.data.chunks(cols).take(self.shape[0])
    }
}

/// Computes row-major (C-style) strides for a shape.
fn compute_strides<const RANK: usize>(shape: &[usize; RANK]) -> [usize; RANK] {
    let mut strides = [0; RANK];
    let mut stride = 1;
    for i in (0..RANK).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

impl<T, const RANK: usize> Debug for Tensor<T, RANK>
where
    T: TensorElem,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data_len", &self.data.len())
            .finish()
    }
}
