//! # Risk Forecast
//!
//! Forecasting and risk simulation for financial time series.
//!
//! ## Features
//!
//! - Sequence forecasting with a pluggable regressor (stacked LSTM or linear AR),
//!   trained on sliding windows of a z-score normalised series
//! - Autoregressive multi-step forecasts with a fixed-width confidence band
//! - Z-score anomaly detection
//! - Geometric Brownian motion Monte Carlo with Value-at-Risk and Expected Shortfall
//! - Cooperative cancellation and background training
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use risk_forecast::config::ForecastConfig;
//! use risk_forecast::{detect_anomalies, ForecastModel, MonteCarloSimulator};
//!
//! let prices: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.2).sin() * 5.0).collect();
//!
//! // Forecast the next 10 days
//! let mut model = ForecastModel::lstm(ForecastConfig::default().with_seed(42))?;
//! let forecast = model.forecast(&prices, 10, 30)?;
//! println!("{:?}", forecast.predictions());
//!
//! // Flag outliers
//! let anomalies = detect_anomalies(&prices, 3.0)?;
//!
//! // One-year risk profile from the last price
//! let risk = MonteCarloSimulator::new().with_seed(7).simulate(100.0, 0.08, 0.2)?;
//! println!("VaR(95%): {:.2}%", risk.statistics().value_at_risk * 100.0);
//! # Ok::<(), risk_forecast::EngineError>(())
//! ```

pub mod anomaly;
pub mod cancel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod monte_carlo;

// Re-export commonly used types
pub use crate::anomaly::{detect_anomalies, Anomaly, AnomalyDetector, AnomalyReason};
pub use crate::cancel::CancellationToken;
pub use crate::config::EngineConfig;
pub use crate::error::{EngineError, Result};
pub use crate::models::{ForecastModel, ForecastResult, SequenceRegressor};
pub use crate::monte_carlo::{simulate_gbm, MonteCarloResult, MonteCarloSimulator};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
