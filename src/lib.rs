//! # Risk Forecast Workspace
//!
//! Umbrella crate for the forecasting and risk-simulation libraries.
//!
//! - [`risk_forecast`]: sequence forecasting, anomaly detection and Monte Carlo simulation
//! - [`trade_math`]: series primitives (normalisation, windowing, returns, accuracy)
//!
//! ## Example
//!
//! ```
//! use risk_forecast_workspace::risk_forecast::detect_anomalies;
//!
//! let anomalies = detect_anomalies(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0], 2.0)?;
//! assert_eq!(anomalies[0].index, 9);
//! # Ok::<(), risk_forecast_workspace::risk_forecast::EngineError>(())
//! ```

pub use risk_forecast;
pub use trade_math;

/// Versions of the member crates, keyed by crate name
pub fn versions() -> Vec<(&'static str, &'static str)> {
    vec![
        (risk_forecast::NAME, risk_forecast::VERSION),
        ("trade_math", trade_math::VERSION),
    ]
}
