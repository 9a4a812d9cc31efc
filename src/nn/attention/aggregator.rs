use crate::tensor::{Result, Tensor, TensorElem, TensorError};

/// Weighted aggregation `Z = α·V`.
///
/// Row `i` of the result is the convex combination of the value rows weighted by row `i` of
/// `weights`. Shapes: `weights [T_q, T_kv]`, `values [T_kv, dv]`, result `[T_q, dv]`.
///
/// # Errors
///
/// `DimensionMismatch` if `weights` has a column count different from the number of value
/// rows.
pub fn aggregate<T: TensorElem>(
    weights: &Tensor<T, 2>,
    values: &Tensor<T, 2>,
) -> Result<Tensor<T, 2>> {
    if weights.cols() != values.rows() {
        return Err(TensorError::DimensionMismatch {
            op: "aggregate",
            expected: weights.cols(),
            got: values.rows(),
        });
    }
    weights.matmul(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_one_hot_selects_value_rows() {
        let alpha = Tensor::<f64, 2>::new(vec![0.0, 1.0, 1.0, 0.0], [2, 2]).unwrap();
        let v = Tensor::<f64, 2>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        let z = aggregate(&alpha, &v).unwrap();
        assert_eq!(z.shape(), &[2, 3]);
        assert_eq!(z.data(), &[4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_aggregate_convex_combination() {
        let alpha = Tensor::<f64, 2>::new(vec![0.25, 0.75], [1, 2]).unwrap();
        let v = Tensor::<f64, 2>::new(vec![0.0, 4.0, 8.0, 0.0], [2, 2]).unwrap();
        let z = aggregate(&alpha, &v).unwrap();
        assert!((z.data()[0] - 6.0).abs() < 1e-12);
        assert!((z.data()[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_mismatch() {
        let alpha = Tensor::<f64, 2>::zeros([2, 3]);
        let v = Tensor::<f64, 2>::zeros([4, 5]);
        assert!(matches!(
            aggregate(&alpha, &v),
            Err(TensorError::DimensionMismatch { op: "aggregate", expected: 3, got: 4 })
        ));
    }
}
