use super::{Result, Tensor, TensorElem, TensorError};
use attn_rs_kernels::{cpu_matmul, cpu_transpose, RhsLayout};
use rayon::prelude::*;
use std::ops::{Add, Div, Mul, Sub};

// Element-wise arithmetic between tensors of identical shape.
macro_rules! impl_bin_op {
    ($trait:ident, $method:ident) => {
        impl<T, const RANK: usize> $trait for &Tensor<T, RANK>
        where
            T: TensorElem,
        {
            type Output = Result<Tensor<T, RANK>>;

            fn $method(self, rhs: Self) -> Self::Output {
                if self.shape != rhs.shape {
                    return Err(TensorError::ShapeMismatch {
                        expected: self.shape.to_vec(),
                        got: rhs.shape.to_vec(),
                    });
                }

                let mut out = Tensor::zeros(self.shape);
                out.data
                    .par_iter_mut()
                    .zip(self.data.par_iter())
                    .zip(rhs.data.par_iter())
                    .for_each(|((o, a), b)| {
                        *o = a.$method(*b);
                    });

                Ok(out)
            }
        }
    };
}

impl_bin_op!(Add, add);
impl_bin_op!(Sub, sub);
impl_bin_op!(Mul, mul);
impl_bin_op!(Div, div);

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem,
{
    /// Applies a function element-wise.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Sync + Send,
    {
        let mut out = Tensor::zeros(self.shape);
        out.data
            .par_iter_mut()
            .zip(self.data.par_iter())
            .for_each(|(o, i)| *o = f(*i));
        out
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&self, factor: T) -> Self {
        self.map(|x| x * factor)
    }
}

impl<T> Tensor<T, 2>
where
    T: TensorElem,
{
    /// Matrix multiplication: `[M, K] x [K, N] -> [M, N]`.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let [m, _] = self.shape;
        let [_, n] = rhs.shape;
        let data = cpu_matmul(&self.data, &rhs.data, &self.shape, &rhs.shape, RhsLayout::RowMajor)?;
        Tensor::new(data, [m, n])
    }

    /// Multiplication against a transposed right operand: `[M, K] x [N, K]ᵗ -> [M, N]`.
    ///
    /// Used for `Q · Kᵗ` and for projections with weights stored `[out, in]`; `rhs` is never
    /// materially transposed.
    pub fn matmul_transposed(&self, rhs: &Self) -> Result<Self> {
        let [m, _] = self.shape;
        let [n, _] = rhs.shape;
        let data = cpu_matmul(
            &self.data,
            &rhs.data,
            &self.shape,
            &rhs.shape,
            RhsLayout::Transposed,
        )?;
        Tensor::new(data, [m, n])
    }

    /// Swaps the two axes.
    pub fn transpose(&self) -> Result<Self> {
        let [m, n] = self.shape;
        let data = cpu_transpose(&self.data, &self.shape)?;
        Tensor::new(data, [n, m])
    }

    /// Concatenates matrices with equal row counts along the column axis.
    ///
    /// Row `i` of the result is row `i` of `parts[0]`, then row `i` of `parts[1]`, and so on.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if `parts` is empty or the row counts disagree.
    pub fn concat_cols(parts: &[&Self]) -> Result<Self> {
        let first = parts.first().ok_or(TensorError::DimensionMismatch {
            op: "concat_cols",
            expected: 1,
            got: 0,
        })?;
        let rows = first.rows();
        for part in parts {
            if part.rows() != rows {
                return Err(TensorError::DimensionMismatch {
                    op: "concat_cols",
                    expected: rows,
                    got: part.rows(),
                });
            }
        }

        let width: usize = parts.iter().map(|p| p.cols()).sum();
        let mut out = Tensor::zeros([rows, width]);
        if width == 0 {
            return Ok(out);
        }

        out.data
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(r, out_row)| {
                let mut offset = 0;
                for part in parts {
                    let cols = part.cols();
                    out_row[offset..offset + cols]
                        .copy_from_slice(&part.data[r * cols..(r + 1) * cols]);
                    offset += cols;
                }
            });

        Ok(out)
    }

    /// Gathers the given rows, in the given order, into a new matrix.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfBounds` if any index is `>= self.rows()`.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let cols = self.cols();
        let mut data = Vec::with_capacity(indices.len() * cols);
        for &i in indices {
            data.extend_from_slice(self.row(i)?);
        }
        Tensor::new(data, [indices.len(), cols])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Tensor::<f32, 1>::new(vec![1.0, 2.0], [2]).unwrap();
        let b = Tensor::<f32, 1>::new(vec![3.0, 4.0], [2]).unwrap();

        assert_eq!((&a + &b).unwrap().data(), &[4.0, 6.0]);
        assert_eq!((&b - &a).unwrap().data(), &[2.0, 2.0]);
        assert_eq!((&a * &b).unwrap().data(), &[3.0, 8.0]);
        assert_eq!((&b / &a).unwrap().data(), &[3.0, 2.0]);

        let f = Tensor::<f32, 1>::new(vec![1.0, 2.0, 3.0], [3]).unwrap();
        assert!(matches!(&a + &f, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_map_and_scale() {
        let a = Tensor::<f64, 2>::new(vec![1.0, -2.0, 3.0, -4.0], [2, 2]).unwrap();
        assert_eq!(a.map(f64::abs).data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.scale(0.5).data(), &[0.5, -1.0, 1.5, -2.0]);
    }

    #[test]
    fn test_matmul_2d() {
        // A: [2, 3], B: [3, 2] -> C: [2, 2]
        let a = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        let b = Tensor::<f32, 2>::new(vec![7.0, 8.0, 9.0, 1.0, 2.0, 3.0], [3, 2]).unwrap();

        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        // Row 0: 1*7 + 2*9 + 3*2 = 31, 1*8 + 2*1 + 3*3 = 19
        // Row 1: 4*7 + 5*9 + 6*2 = 85, 4*8 + 5*1 + 6*3 = 55
        assert_eq!(c.data(), &[31.0, 19.0, 85.0, 55.0]);
    }

    #[test]
    fn test_matmul_transposed_matches_matmul() {
        let a = Tensor::<f64, 2>::new((0..6).map(f64::from).collect(), [2, 3]).unwrap();
        let b = Tensor::<f64, 2>::new((0..12).map(f64::from).collect(), [4, 3]).unwrap();

        let fused = a.matmul_transposed(&b).unwrap();
        let plain = a.matmul(&b.transpose().unwrap()).unwrap();
        assert_eq!(fused.shape(), &[2, 4]);
        assert_eq!(fused, plain);
    }

    #[test]
    fn test_matmul_inner_dim_mismatch() {
        let a = Tensor::<f32, 2>::zeros([2, 3]);
        let b = Tensor::<f32, 2>::zeros([4, 2]);
        assert!(matches!(a.matmul(&b), Err(TensorError::ShapeMismatch { .. })));
        assert!(matches!(
            a.matmul_transposed(&b),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_transpose() {
        let t = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        let t_t = t.transpose().unwrap();
        assert_eq!(t_t.shape(), &[3, 2]);
        assert_eq!(t_t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_concat_cols() {
        let a = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0], [2, 2]).unwrap();
        let b = Tensor::<f32, 2>::new(vec![5.0, 6.0], [2, 1]).unwrap();

        let c = Tensor::concat_cols(&[&a, &b]).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c.data(), &[1.0, 2.0, 5.0, 3.0, 4.0, 6.0]);

        let short = Tensor::<f32, 2>::zeros([3, 1]);
        assert!(matches!(
            Tensor::concat_cols(&[&a, &short]),
            Err(TensorError::DimensionMismatch { op: "concat_cols", expected: 2, got: 3 })
        ));
        assert!(matches!(
            Tensor::<f32, 2>::concat_cols(&[]),
            Err(TensorError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_select_rows() {
        let t = Tensor::<f32, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [3, 2]).unwrap();
        let picked = t.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked.data(), &[5.0, 6.0, 1.0, 2.0]);

        assert!(matches!(
            t.select_rows(&[3]),
            Err(TensorError::IndexOutOfBounds { .. })
        ));
    }
}
