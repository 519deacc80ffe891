//! Back-testing forecasts against held-out observations

use crate::error::{EngineError, Result};
use crate::models::{ForecastModel, ForecastResult, SequenceRegressor};
use serde::Serialize;
use trade_math::{forecast_accuracy, ForecastAccuracy};

/// Outcome of forecasting the tail of a series from everything before it
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub forecast: ForecastResult,
    /// Held-out observations, aligned with the forecast steps
    pub actual: Vec<f64>,
    /// `|forecast - actual|` per step; later steps accumulate rollout error
    pub absolute_errors: Vec<f64>,
    pub accuracy: ForecastAccuracy,
}

impl BacktestReport {
    /// Mean absolute error over the first `steps` forecast steps
    pub fn mae_up_to(&self, steps: usize) -> Option<f64> {
        let steps = steps.min(self.absolute_errors.len());
        if steps == 0 {
            return None;
        }
        Some(self.absolute_errors[..steps].iter().sum::<f64>() / steps as f64)
    }
}

/// Fit on all but the last `horizon` points, forecast them, and compare.
pub fn backtest<R: SequenceRegressor>(
    model: &mut ForecastModel<R>,
    series: &[f64],
    horizon: usize,
    window_size: usize,
) -> Result<BacktestReport> {
    if horizon == 0 {
        return Err(EngineError::InvalidParameter(
            "horizon must be at least 1".to_string(),
        ));
    }

    let required = window_size + 1 + horizon;
    if series.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            actual: series.len(),
        });
    }

    let (history, actual) = series.split_at(series.len() - horizon);
    let epochs = model.config().epochs;
    model.fit(history, window_size, epochs)?;
    let forecast = model.forecast(history, horizon, window_size)?;

    let absolute_errors = forecast
        .predictions()
        .iter()
        .zip(actual)
        .map(|(f, a)| (f - a).abs())
        .collect();
    let accuracy = forecast_accuracy(forecast.predictions(), actual)?;

    Ok(BacktestReport {
        forecast,
        actual: actual.to_vec(),
        absolute_errors,
        accuracy,
    })
}
