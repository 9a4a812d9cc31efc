use crate::{KernelElem, KernelError, Result, PARALLEL_THRESHOLD};
use num_traits::Float;
use rayon::prelude::*;

/// Row-wise, numerically stable softmax over a row-major `[rows, cols]` buffer, in place.
///
/// Every entry is multiplied by `scale` first. `visible(r)` gives the number of leading
/// columns row `r` may attend to; the remaining columns are written as exactly zero and do
/// not take part in the normalization. Pass `|_| cols` for an unmasked softmax.
///
/// The row maximum is subtracted before exponentiating, so finite logits never overflow and
/// the largest entry always contributes `exp(0) = 1` to the denominator.
///
/// # Errors
///
/// - [`KernelError::ShapeMismatch`] if `data.len()` is not a multiple of `cols`.
/// - [`KernelError::NonFinite`] if a visible, scaled logit is NaN or infinite.
pub fn cpu_softmax_rows<T, F>(data: &mut [T], cols: usize, scale: T, visible: F) -> Result<()>
where
    T: KernelElem + Float,
    F: Fn(usize) -> usize + Sync,
{
    if cols == 0 || data.len() % cols != 0 {
        if data.is_empty() {
            return Ok(());
        }
        return Err(KernelError::ShapeMismatch {
            expected: vec![cols],
            got: vec![data.len()],
        });
    }

    let row_fn = |(r, row): (usize, &mut [T])| -> Result<()> {
        let v = visible(r).min(cols);
        let (live, masked) = row.split_at_mut(v);
        masked.iter_mut().for_each(|x| *x = T::zero());
        if live.is_empty() {
            return Ok(());
        }

        let mut max = T::neg_infinity();
        for x in live.iter_mut() {
            *x *= scale;
            if !x.is_finite() {
                return Err(KernelError::NonFinite { row: r });
            }
            max = max.max(*x);
        }

        let mut sum = T::zero();
        for x in live.iter_mut() {
            *x = (*x - max).exp();
            sum += *x;
        }
        for x in live.iter_mut() {
            *x /= sum;
        }
        Ok(())
    };

    if data.len() >= PARALLEL_THRESHOLD {
        data.par_chunks_mut(cols).enumerate().try_for_each(row_fn)
    } else {
        data.chunks_mut(cols).enumerate().try_for_each(row_fn)
    }
}
