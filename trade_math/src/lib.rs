//! # Trade Math
//!
//! Numerical building blocks for financial series forecasting.
//! This crate provides z-score normalisation, supervised windowing,
//! descriptive statistics and forecast accuracy metrics.

use thiserror::Error;

pub mod accuracy;
pub mod normalize;
pub mod returns;
pub mod statistics;
pub mod windows;

pub use accuracy::{forecast_accuracy, ForecastAccuracy};
pub use normalize::{denormalize, normalize, NormalizationParams, EPSILON};
pub use windows::{make_windows, split_train_validation, Window};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need at least {required} values, got {actual}")]
    InsufficientData { required: usize, actual: usize },
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reject empty series and series containing NaN or infinite values.
pub fn validate_series(series: &[f64]) -> Result<()> {
    if series.is_empty() {
        return Err(MathError::InvalidInput("series is empty".to_string()));
    }

    if let Some(index) = series.iter().position(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "series contains a non-finite value at index {}",
            index
        )));
    }

    Ok(())
}
