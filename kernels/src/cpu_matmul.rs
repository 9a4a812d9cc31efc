use crate::{KernelElem, KernelError, Result, PARALLEL_THRESHOLD};
use rayon::prelude::*;

/// How the right-hand operand of [`cpu_matmul`] is laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhsLayout {
    /// `rhs` is `[..., K, N]`; the kernel transposes it once before the dot loop.
    RowMajor,
    /// `rhs` is already stored as `[..., N, K]`, i.e. the product is `lhs · rhsᵗ`.
    ///
    /// This is the natural layout for `Q · Kᵗ` (keys are stored one per row) and for
    /// `X · Wᵗ` with weights stored `[out, in]`.
    Transposed,
}

/// CPU matrix multiplication over the last two axes, with leading axes as batch axes.
///
/// `lhs_shape` is `[..., M, K]`. `rhs_shape` is `[..., K, N]` for [`RhsLayout::RowMajor`]
/// and `[..., N, K]` for [`RhsLayout::Transposed`]. The result is `[..., M, N]`, row-major.
///
/// Both paths end in the same inner loop: a contiguous dot product between a row of `lhs`
/// and a row of the (transposed) `rhs`, which keeps memory access sequential.
pub fn cpu_matmul<T, const RANK: usize>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize; RANK],
    rhs_shape: &[usize; RANK],
    layout: RhsLayout,
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    const { assert!(RANK >= 2, "matmul requires rank >= 2") };

    if lhs_shape[..RANK - 2] != rhs_shape[..RANK - 2] {
        return Err(KernelError::ShapeMismatch {
            expected: lhs_shape[..RANK - 2].to_vec(),
            got: rhs_shape[..RANK - 2].to_vec(),
        });
    }
    check_len(lhs_data, lhs_shape)?;
    check_len(rhs_data, rhs_shape)?;

    let m = lhs_shape[RANK - 2];
    let k = lhs_shape[RANK - 1];
    let (rhs_k, n) = match layout {
        RhsLayout::RowMajor => (rhs_shape[RANK - 2], rhs_shape[RANK - 1]),
        RhsLayout::Transposed => (rhs_shape[RANK - 1], rhs_shape[RANK - 2]),
    };
    if k != rhs_k {
        return Err(KernelError::ShapeMismatch {
            expected: vec![k],
            got: vec![rhs_k],
        });
    }

    let batch: usize = lhs_shape[..RANK - 2].iter().product();
    let mut out_data = vec![T::zero(); batch * m * n];
    if out_data.is_empty() {
        return Ok(out_data);
    }

    let transposed;
    let rhs_nk: &[T] = match layout {
        RhsLayout::Transposed => rhs_data,
        RhsLayout::RowMajor => {
            transposed = crate::cpu_transpose(rhs_data, rhs_shape)?;
            &transposed
        }
    };

    // Row `r` of the flattened output is row `r % m` of batch `r / m`.
    let row_fn = |(r, out_row): (usize, &mut [T])| {
        let b = r / m;
        let a_start = b * m * k + (r % m) * k;
        let a_row = &lhs_data[a_start..a_start + k];
        let b_base = b * n * k;
        for (j, out) in out_row.iter_mut().enumerate() {
            let b_row = &rhs_nk[b_base + j * k..b_base + (j + 1) * k];
            let mut sum = T::zero();
            for (&x, &y) in a_row.iter().zip(b_row) {
                sum += x * y;
            }
            *out = sum;
        }
    };

    if out_data.len() >= PARALLEL_THRESHOLD {
        out_data.par_chunks_mut(n).enumerate().for_each(row_fn);
    } else {
        out_data.chunks_mut(n).enumerate().for_each(row_fn);
    }

    Ok(out_data)
}

fn check_len<T, const RANK: usize>(data: &[T], shape: &[usize; RANK]) -> Result<()> {
    let size: usize = shape.iter().product();
    if data.len() != size {
        return Err(KernelError::ShapeMismatch {
            expected: vec![size],
            got: vec![data.len()],
        });
    }
    Ok(())
}
