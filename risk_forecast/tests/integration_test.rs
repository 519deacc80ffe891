use risk_forecast::config::EngineConfig;
use risk_forecast::metrics::backtest;
use risk_forecast::{AnomalyDetector, EngineError, ForecastModel, MonteCarloSimulator};
use std::io::Write;
use tempfile::NamedTempFile;

// Daily prices: gentle uptrend, a weekly cycle and one bad print
fn create_sample_prices() -> Vec<f64> {
    let mut prices: Vec<f64> = (0..150)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 2.0 * (t * 2.0 * std::f64::consts::PI / 7.0).sin()
        })
        .collect();
    prices[75] = 160.0;
    prices
}

fn create_config_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            "forecast": {{
                "window_size": 7,
                "epochs": 4,
                "hidden_units": 8,
                "batch_size": 16,
                "learning_rate": 0.01,
                "seed": 42
            }},
            "anomaly": {{ "threshold_std_devs": 3.0 }},
            "simulation": {{ "simulation_count": 400, "periods": 21, "seed": 7 }}
        }}"#
    )
    .unwrap();
    file
}

#[test]
fn test_full_risk_workflow() {
    // 1. Load configuration
    let config_file = create_config_file();
    let config = EngineConfig::from_file(config_file.path()).unwrap();
    let prices = create_sample_prices();

    // 2. Screen the series for bad prints
    let detector = AnomalyDetector::from_config(&config.anomaly).unwrap();
    let anomalies = detector.detect(&prices).unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].index, 75);

    // 3. Forecast two weeks ahead
    let window_size = config.forecast.window_size;
    let mut model = ForecastModel::lstm(config.forecast.clone()).unwrap();
    let forecast = model.forecast(&prices, 14, window_size).unwrap();
    assert_eq!(forecast.predictions().len(), 14);
    assert!(model.is_trained());

    let bands = forecast.confidence_intervals();
    assert!(bands
        .lower
        .iter()
        .zip(&bands.upper)
        .all(|(lower, upper)| lower < upper));

    // 4. Back-test a fresh model on the same settings
    let mut fresh = ForecastModel::lstm(config.forecast.clone()).unwrap();
    let report = backtest(&mut fresh, &prices, 10, window_size).unwrap();
    assert_eq!(report.absolute_errors.len(), 10);

    // 5. Simulate one month of risk from the last price
    let simulator = MonteCarloSimulator::from_config(config.simulation.clone()).unwrap();
    let risk = simulator.simulate_from_series(&prices).unwrap();
    assert_eq!(risk.simulation_count(), 400);
    assert_eq!(risk.paths()[0].len(), 22);
    assert!(risk.statistics().expected_shortfall >= risk.statistics().value_at_risk);

    // 6. Same configuration reproduces the same risk profile
    let again = MonteCarloSimulator::from_config(config.simulation)
        .unwrap()
        .simulate_from_series(&prices)
        .unwrap();
    assert_eq!(risk.statistics(), again.statistics());

    // 7. Error handling
    let result = model.forecast(&prices[..5], 3, window_size);
    assert!(matches!(
        result,
        Err(EngineError::InsufficientData {
            required: 8,
            actual: 5
        })
    ));
}
