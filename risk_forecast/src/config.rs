//! Engine configuration
//!
//! Every field has a default, so callers only override what they need.
//! Configuration can be built in code or loaded from JSON; missing keys
//! fall back to their defaults.
//!
//! ```rust
//! use risk_forecast::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "forecast": { "window_size": 10 } }"#)?;
//! assert_eq!(config.forecast.window_size, 10);
//! assert_eq!(config.forecast.epochs, 50);
//! # Ok::<(), risk_forecast::EngineError>(())
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for all engine components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub simulation: SimulationConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.forecast.validate()?;
        self.anomaly.validate()?;
        self.simulation.validate()
    }
}

/// Supported confidence levels and their two-sided z-scores
const Z_SCORES: [(f64, f64); 3] = [(0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];

/// Hyperparameters for sequence forecasting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of past values fed to the regressor
    pub window_size: usize,
    /// Training passes over the training windows
    pub epochs: usize,
    /// Hidden units per recurrent layer
    pub hidden_units: usize,
    /// Number of stacked recurrent layers
    pub recurrent_layers: usize,
    /// Dropout rate applied to recurrent layer outputs during training
    pub dropout: f64,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Trailing share of windows held out to monitor overfitting
    pub validation_split: f64,
    /// Confidence level of the forecast band; one of 0.90, 0.95 or 0.99
    pub confidence_level: f64,
    /// Fixed seed for reproducible training; entropy-seeded when `None`
    pub seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            epochs: 50,
            hidden_units: 64,
            recurrent_layers: 2,
            dropout: 0.2,
            learning_rate: 0.001,
            batch_size: 32,
            validation_split: 0.2,
            confidence_level: 0.95,
            seed: None,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(EngineError::InvalidParameter(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.epochs == 0 {
            return Err(EngineError::InvalidParameter(
                "epochs must be at least 1".to_string(),
            ));
        }
        if self.hidden_units == 0 || self.recurrent_layers == 0 {
            return Err(EngineError::InvalidParameter(
                "hidden_units and recurrent_layers must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(EngineError::InvalidParameter(
                "dropout must be in [0, 1)".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(EngineError::InvalidParameter(
                "learning_rate must be positive and finite".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EngineError::InvalidParameter(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(EngineError::InvalidParameter(
                "validation_split must be in [0, 1)".to_string(),
            ));
        }
        if self.z_score().is_none() {
            return Err(EngineError::InvalidParameter(format!(
                "Confidence level must be one of 0.90, 0.95 or 0.99, got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// Z-score of the forecast band, or `None` if the confidence level is not in the table
    pub fn z_score(&self) -> Option<f64> {
        Z_SCORES
            .iter()
            .find(|(level, _)| (level - self.confidence_level).abs() < 1e-9)
            .map(|&(_, z)| z)
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_hidden_units(mut self, hidden_units: usize) -> Self {
        self.hidden_units = hidden_units;
        self
    }

    pub fn with_recurrent_layers(mut self, layers: usize) -> Self {
        self.recurrent_layers = layers;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Anomaly detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Deviation from the series mean, in standard deviations, above which a point is flagged
    pub threshold_std_devs: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            threshold_std_devs: 3.0,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_std_devs.is_finite() || self.threshold_std_devs < 0.0 {
            return Err(EngineError::InvalidParameter(
                "threshold_std_devs must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Monte Carlo simulation settings
///
/// Memory grows with `simulation_count * (periods + 1)` because every path is
/// returned in full; lower either value to trade fidelity for memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulation_count: usize,
    /// Daily steps per path
    pub periods: usize,
    /// Paths generated between cancellation checks
    pub batch_size: usize,
    /// Fixed seed for reproducible paths; entropy-seeded when `None`
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation_count: 1000,
            periods: 252,
            batch_size: 256,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.simulation_count == 0 {
            return Err(EngineError::InvalidParameter(
                "simulation_count must be at least 1".to_string(),
            ));
        }
        if self.periods == 0 {
            return Err(EngineError::InvalidParameter(
                "periods must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EngineError::InvalidParameter(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_simulation_count(mut self, simulation_count: usize) -> Self {
        self.simulation_count = simulation_count;
        self
    }

    pub fn with_periods(mut self, periods: usize) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
