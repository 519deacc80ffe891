//! Sequence forecasting models
//!
//! A [`ForecastModel`] owns a trainable [`SequenceRegressor`] and drives the
//! windowed training loop and the autoregressive multi-step rollout. Any
//! regressor that maps a window of normalised values to the next normalised
//! value can be plugged in; two are provided:
//!
//! - [`LstmRegressor`]: stacked LSTM layers with dropout and a dense head, trained with Adam
//! - [`LinearRegressor`]: an autoregressive linear model trained with mini-batch gradient descent

use crate::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use trade_math::Window;

pub mod forecaster;
pub mod linear;
pub mod lstm;
mod optimizer;

pub use forecaster::{ForecastModel, TrainingHandle};
pub use linear::LinearRegressor;
pub use lstm::LstmRegressor;

/// A trainable mapping from a window of past normalised values to the next value
pub trait SequenceRegressor: Debug + Clone + Send {
    /// Short identifier recorded in forecast metadata
    fn kind(&self) -> &'static str;

    /// Reset all learned parameters for inputs of `window_size` values
    fn initialize(&mut self, window_size: usize, rng: &mut StdRng);

    /// Take one gradient step on `batch` and return the batch mean squared
    /// error measured before the update.
    fn train_batch(&mut self, batch: &[&Window], learning_rate: f64, rng: &mut StdRng) -> f64;

    /// Predict the next normalised value from a window of normalised values
    fn predict(&self, input: &[f64]) -> f64;

    /// Mean squared error over `windows`, evaluated without any training-time noise
    fn loss(&self, windows: &[Window]) -> f64 {
        if windows.is_empty() {
            return f64::NAN;
        }

        windows
            .iter()
            .map(|w| (self.predict(&w.input) - w.target).powi(2))
            .sum::<f64>()
            / windows.len() as f64
    }
}

/// Loss recorded at the end of one training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    /// 1-based epoch number
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

/// Summary of a completed fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_run: usize,
    /// Windows used for gradient updates
    pub training_size: usize,
    /// Trailing windows held out for validation
    pub validation_size: usize,
    /// Mean squared error (normalised units) of the last epoch
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    pub history: Vec<EpochLoss>,
}

/// Error metrics for forecast evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// In-sample one-step-ahead Mean Absolute Error (original units)
    pub mae: f64,
    /// In-sample one-step-ahead Mean Squared Error (original units)
    pub mse: f64,
    /// In-sample one-step-ahead Root Mean Squared Error (original units)
    pub rmse: f64,
    /// In-sample one-step-ahead Mean Absolute Percentage Error
    pub mape: f64,
    /// Final training loss (normalised units)
    pub train_loss: f64,
    /// Final validation loss (normalised units), if a validation split was used
    pub validation_loss: Option<f64>,
}

/// Lower and upper forecast bounds, one pair per predicted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Description of how a forecast was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub model_kind: String,
    pub horizon: usize,
    pub window_size: usize,
    pub training_size: usize,
    pub error_metrics: ErrorMetrics,
}

/// Multi-step forecast with a fixed-width confidence band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    predictions: Vec<f64>,
    confidence_intervals: ConfidenceIntervals,
    metadata: ForecastMetadata,
}

impl ForecastResult {
    /// Create a new forecast result, checking that all per-step vectors agree with the horizon
    pub fn new(
        predictions: Vec<f64>,
        confidence_intervals: ConfidenceIntervals,
        metadata: ForecastMetadata,
    ) -> Result<Self> {
        if predictions.len() != metadata.horizon {
            return Err(EngineError::InvalidInput(format!(
                "Predictions length ({}) doesn't match horizon ({})",
                predictions.len(),
                metadata.horizon
            )));
        }

        if confidence_intervals.lower.len() != predictions.len()
            || confidence_intervals.upper.len() != predictions.len()
        {
            return Err(EngineError::InvalidInput(format!(
                "Confidence interval lengths ({}, {}) don't match predictions length ({})",
                confidence_intervals.lower.len(),
                confidence_intervals.upper.len(),
                predictions.len()
            )));
        }

        Ok(Self {
            predictions,
            confidence_intervals,
            metadata,
        })
    }

    /// Get the forecasted values
    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    pub fn confidence_intervals(&self) -> &ConfidenceIntervals {
        &self.confidence_intervals
    }

    pub fn metadata(&self) -> &ForecastMetadata {
        &self.metadata
    }

    /// Get the number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.metadata.horizon
    }

    /// Daily timestamps for each predicted step, following `last_observation`
    pub fn future_timestamps(&self, last_observation: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        (1..=self.horizon())
            .map(|step| last_observation + Duration::days(step as i64))
            .collect()
    }

    /// Serialize the result as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
