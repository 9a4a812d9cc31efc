use crate::{KernelElem, KernelError, Result, PARALLEL_THRESHOLD};
use rayon::prelude::*;

/// Swaps the last two axes of a row-major buffer: `[..., M, N] -> [..., N, M]`.
///
/// The output is filled one row at a time; output row `(b, c)` gathers column `c` of input
/// matrix `b`.
pub fn cpu_transpose<T, const RANK: usize>(data: &[T], shape: &[usize; RANK]) -> Result<Vec<T>>
where
    T: KernelElem,
{
    const { assert!(RANK >= 2, "transpose requires rank >= 2") };

    let size: usize = shape.iter().product();
    if data.len() != size {
        return Err(KernelError::ShapeMismatch {
            expected: vec![size],
            got: vec![data.len()],
        });
    }

    let m = shape[RANK - 2];
    let n = shape[RANK - 1];
    let mut out_data = vec![T::zero(); size];
    if size == 0 {
        return Ok(out_data);
    }

    let gather = |(i, out_row): (usize, &mut [T])| {
        let base = (i / n) * m * n;
        let col = i % n;
        for (r, out) in out_row.iter_mut().enumerate() {
            *out = data[base + r * n + col];
        }
    };

    if size >= PARALLEL_THRESHOLD {
        out_data.par_chunks_mut(m).enumerate().for_each(gather);
    } else {
        out_data.chunks_mut(m).enumerate().for_each(gather);
    }

    Ok(out_data)
}
