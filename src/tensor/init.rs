//! Seeded random initialization of weight matrices.
//!
//! There is no global seed: every draw goes through the `Rng` the caller passes in, so two
//! models built from generators with the same seed hold identical weights.

use super::{Result, Tensor, TensorElem, TensorError};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

/// Distribution a weight matrix of shape `[out, in]` is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightInit {
    /// Uniform on `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Gaussian with the given mean and standard deviation.
    Normal { mean: f64, std: f64 },
    /// Uniform on `[-a, a)` with `a = sqrt(6 / (in + out))`.
    XavierUniform,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Uniform {
            low: 0.0,
            high: 1.0,
        }
    }
}

impl WeightInit {
    /// Checks the distribution parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            WeightInit::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite() && low < high) {
                    return Err(TensorError::InvalidConfig(format!(
                        "uniform init needs finite low < high, got [{low}, {high})"
                    )));
                }
            }
            WeightInit::Normal { mean, std } => {
                if !(mean.is_finite() && std.is_finite() && std >= 0.0) {
                    return Err(TensorError::InvalidConfig(format!(
                        "normal init needs finite mean and std >= 0, got mean {mean}, std {std}"
                    )));
                }
            }
            WeightInit::XavierUniform => {}
        }
        Ok(())
    }

    /// Draws a `[out, in]` matrix, consuming `out * in` samples from `rng` in row-major order.
    pub fn sample<T, R>(&self, shape: [usize; 2], rng: &mut R) -> Result<Tensor<T, 2>>
    where
        T: TensorElem,
        R: Rng + ?Sized,
    {
        self.validate()?;
        let [fan_out, fan_in] = shape;
        let size = fan_out * fan_in;
        if size == 0 {
            return Ok(Tensor::zeros(shape));
        }

        let raw: Vec<f64> = match *self {
            WeightInit::Uniform { low, high } => draw(uniform(low, high)?, size, rng),
            WeightInit::Normal { mean, std } => {
                let dist = Normal::new(mean, std)
                    .map_err(|e| TensorError::InvalidConfig(format!("normal init: {e}")))?;
                draw(dist, size, rng)
            }
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
                draw(uniform(-limit, limit)?, size, rng)
            }
        };

        let data = raw
            .into_iter()
            .map(|v| {
                T::from_f64(v).ok_or_else(|| {
                    TensorError::Unsupported(format!("element type cannot represent {v}"))
                })
            })
            .collect::<Result<Vec<T>>>()?;
        Tensor::new(data, shape)
    }
}

fn uniform(low: f64, high: f64) -> Result<Uniform<f64>> {
    Uniform::new(low, high).map_err(|e| TensorError::InvalidConfig(format!("uniform init: {e}")))
}

fn draw<D, R>(dist: D, size: usize, rng: &mut R) -> Vec<f64>
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    (0..size).map(|_| dist.sample(&mut *rng)).collect()
}
