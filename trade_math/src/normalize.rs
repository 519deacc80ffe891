//! Z-score normalisation of a series and its inverse

use crate::statistics::{mean, population_std_dev};
use crate::{validate_series, Result};
use serde::{Deserialize, Serialize};

/// Floor added to the standard deviation whenever it is used as a divisor.
pub const EPSILON: f64 = 1e-8;

/// Mean and population standard deviation of the series a normalisation was derived from.
///
/// `std` is the true population standard deviation; the [`EPSILON`] floor is
/// only applied inside the division and is never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub mean: f64,
    pub std: f64,
}

impl NormalizationParams {
    /// Derive parameters from a non-empty, finite series.
    pub fn from_series(series: &[f64]) -> Result<Self> {
        validate_series(series)?;
        Ok(Self {
            mean: mean(series),
            std: population_std_dev(series),
        })
    }

    /// Map one raw value into normalised space.
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / (self.std + EPSILON)
    }

    /// Map one normalised value back to the original scale.
    pub fn invert(&self, value: f64) -> f64 {
        value * self.std + self.mean
    }

    /// True when the series had (numerically) no variance.
    pub fn is_degenerate(&self) -> bool {
        self.std <= EPSILON
    }
}

/// Normalise a series to zero mean and unit variance.
///
/// Fails with `InvalidInput` if the series is empty or contains NaN/infinite values.
/// A constant series normalises to all zeros.
pub fn normalize(series: &[f64]) -> Result<(Vec<f64>, NormalizationParams)> {
    let params = NormalizationParams::from_series(series)?;
    let normalized = series.iter().map(|&v| params.apply(v)).collect();
    Ok((normalized, params))
}

/// Map normalised values back to the original scale (`v * std + mean`).
///
/// This is the inverse of [`normalize`] up to the relative error
/// `EPSILON / std` introduced by the floor in the forward direction.
pub fn denormalize(values: &[f64], params: &NormalizationParams) -> Vec<f64> {
    values.iter().map(|&v| params.invert(v)).collect()
}
