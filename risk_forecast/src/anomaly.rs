//! Z-score anomaly detection over a whole series
//!
//! The mean and population standard deviation are computed once over the
//! full series (not a rolling window). A point is anomalous when its
//! absolute z-score strictly exceeds the threshold.

use crate::config::AnomalyConfig;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use trade_math::statistics::{mean, population_std_dev};
use trade_math::{validate_series, EPSILON};

/// Direction of an anomaly relative to the series mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyReason {
    High,
    Low,
}

/// A flagged point, holding copies of everything needed to report it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub index: usize,
    pub value: f64,
    /// Absolute deviation from the mean in standard deviations
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub reason: AnomalyReason,
}

/// Flags points whose deviation from the series mean exceeds a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    threshold_std_devs: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            threshold_std_devs: AnomalyConfig::default().threshold_std_devs,
        }
    }
}

impl AnomalyDetector {
    /// Create a detector; the threshold must be finite and non-negative
    pub fn new(threshold_std_devs: f64) -> Result<Self> {
        AnomalyConfig { threshold_std_devs }.validate()?;
        Ok(Self { threshold_std_devs })
    }

    pub fn from_config(config: &AnomalyConfig) -> Result<Self> {
        Self::new(config.threshold_std_devs)
    }

    pub fn threshold_std_devs(&self) -> f64 {
        self.threshold_std_devs
    }

    /// Detect anomalies, stamping point `i` with `now - (N - i)` days
    pub fn detect(&self, series: &[f64]) -> Result<Vec<Anomaly>> {
        self.detect_at(series, Utc::now())
    }

    /// Detect anomalies, stamping point `i` with `now - (N - i)` days
    pub fn detect_at(&self, series: &[f64], now: DateTime<Utc>) -> Result<Vec<Anomaly>> {
        let n = series.len();
        self.scan(series, |i| now - Duration::days((n - i) as i64))
    }

    /// Detect anomalies using caller-supplied timestamps, one per point
    pub fn detect_with_timestamps(
        &self,
        series: &[f64],
        timestamps: &[DateTime<Utc>],
    ) -> Result<Vec<Anomaly>> {
        if timestamps.len() != series.len() {
            return Err(EngineError::InvalidInput(format!(
                "Timestamps length ({}) doesn't match series length ({})",
                timestamps.len(),
                series.len()
            )));
        }
        self.scan(series, |i| timestamps[i])
    }

    fn scan<F>(&self, series: &[f64], timestamp_of: F) -> Result<Vec<Anomaly>>
    where
        F: Fn(usize) -> DateTime<Utc>,
    {
        validate_series(series)?;

        let mean = mean(series);
        let std_dev = population_std_dev(series);

        let anomalies = series
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let score = (value - mean).abs() / (std_dev + EPSILON);
                (score > self.threshold_std_devs).then(|| Anomaly {
                    index,
                    value,
                    score,
                    timestamp: timestamp_of(index),
                    reason: if value > mean {
                        AnomalyReason::High
                    } else {
                        AnomalyReason::Low
                    },
                })
            })
            .collect();

        Ok(anomalies)
    }
}

/// Detect anomalies with the given threshold and synthetic daily timestamps
pub fn detect_anomalies(series: &[f64], threshold_std_devs: f64) -> Result<Vec<Anomaly>> {
    AnomalyDetector::new(threshold_std_devs)?.detect(series)
}
