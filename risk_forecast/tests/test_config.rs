use pretty_assertions::assert_eq;
use risk_forecast::config::{AnomalyConfig, EngineConfig, ForecastConfig, SimulationConfig};
use risk_forecast::EngineError;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = EngineConfig::default();

    assert_eq!(config.forecast.window_size, 30);
    assert_eq!(config.forecast.epochs, 50);
    assert_eq!(config.forecast.hidden_units, 64);
    assert_eq!(config.forecast.recurrent_layers, 2);
    assert_eq!(config.forecast.dropout, 0.2);
    assert_eq!(config.forecast.learning_rate, 0.001);
    assert_eq!(config.forecast.batch_size, 32);
    assert_eq!(config.forecast.validation_split, 0.2);
    assert_eq!(config.forecast.confidence_level, 0.95);
    assert_eq!(config.forecast.seed, None);

    assert_eq!(config.anomaly.threshold_std_devs, 3.0);

    assert_eq!(config.simulation.simulation_count, 1000);
    assert_eq!(config.simulation.periods, 252);
    assert_eq!(config.simulation.seed, None);

    assert!(config.validate().is_ok());
}

#[rstest]
#[case(0.99, Some(2.576))]
#[case(0.95, Some(1.96))]
#[case(0.90, Some(1.645))]
#[case(0.80, None)]
#[case(0.5, None)]
#[case(f64::NAN, None)]
fn test_z_score(#[case] confidence_level: f64, #[case] expected: Option<f64>) {
    let config = ForecastConfig {
        confidence_level,
        ..ForecastConfig::default()
    };
    assert_eq!(config.z_score(), expected);
}

#[test]
fn test_partial_json_falls_back_to_defaults() {
    let json = r#"{
        "forecast": { "window_size": 10, "seed": 42 },
        "simulation": { "simulation_count": 500 }
    }"#;

    let config = EngineConfig::from_json_str(json).unwrap();

    assert_eq!(config.forecast.window_size, 10);
    assert_eq!(config.forecast.seed, Some(42));
    assert_eq!(config.forecast.epochs, 50);
    assert_eq!(config.simulation.simulation_count, 500);
    assert_eq!(config.simulation.periods, 252);
    assert_eq!(config.anomaly, AnomalyConfig::default());
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "anomaly": {{ "threshold_std_devs": 2.5 }} }}"#).unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.anomaly.threshold_std_devs, 2.5);
}

#[test]
fn test_round_trip_through_file() {
    let config = EngineConfig {
        forecast: ForecastConfig::default().with_window_size(12).with_seed(7),
        anomaly: AnomalyConfig {
            threshold_std_devs: 2.0,
        },
        simulation: SimulationConfig::default().with_periods(30),
    };

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(&config).unwrap().as_bytes())
        .unwrap();

    assert_eq!(EngineConfig::from_file(file.path()).unwrap(), config);
}

#[test]
fn test_load_errors() {
    assert!(matches!(
        EngineConfig::from_file("/no/such/config.json"),
        Err(EngineError::Io(_))
    ));
    assert!(matches!(
        EngineConfig::from_json_str("{ \"forecast\": "),
        Err(EngineError::Serialization(_))
    ));
    assert!(matches!(
        EngineConfig::from_json_str(r#"{ "forecast": { "window_size": "ten" } }"#),
        Err(EngineError::Serialization(_))
    ));
}

#[rstest]
#[case(r#"{ "forecast": { "window_size": 0 } }"#)]
#[case(r#"{ "forecast": { "dropout": 1.5 } }"#)]
#[case(r#"{ "forecast": { "learning_rate": -0.1 } }"#)]
#[case(r#"{ "forecast": { "confidence_level": 1.0 } }"#)]
#[case(r#"{ "forecast": { "confidence_level": 0.8 } }"#)]
#[case(r#"{ "anomaly": { "threshold_std_devs": -1.0 } }"#)]
#[case(r#"{ "simulation": { "periods": 0 } }"#)]
#[case(r#"{ "simulation": { "batch_size": 0 } }"#)]
fn test_invalid_values_are_rejected(#[case] json: &str) {
    assert!(matches!(
        EngineConfig::from_json_str(json),
        Err(EngineError::InvalidParameter(_))
    ));
}

#[rstest]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
#[case(0.0)]
#[case(0.975)]
fn test_unsupported_confidence_level(#[case] confidence_level: f64) {
    let config = ForecastConfig {
        confidence_level,
        ..ForecastConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(EngineError::InvalidParameter(_))
    ));
}
