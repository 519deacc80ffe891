use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use risk_forecast::config::AnomalyConfig;
use risk_forecast::{detect_anomalies, AnomalyDetector, AnomalyReason, EngineError};
use rstest::rstest;

fn spike_series() -> Vec<f64> {
    let mut series = vec![1.0; 9];
    series.push(100.0);
    series
}

#[test]
fn test_single_spike_is_flagged() {
    let anomalies = detect_anomalies(&spike_series(), 2.0).unwrap();

    assert_eq!(anomalies.len(), 1);
    let spike = &anomalies[0];
    assert_eq!(spike.index, 9);
    assert_eq!(spike.value, 100.0);
    assert_eq!(spike.reason, AnomalyReason::High);
    // A lone outlier among n points sits sqrt(n - 1) deviations out
    assert_relative_eq!(spike.score, 3.0, max_relative = 1e-6);
}

#[test]
fn test_low_outlier() {
    let mut series = vec![50.0; 19];
    series.insert(4, 0.0);

    let anomalies = detect_anomalies(&series, 3.0).unwrap();

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].index, 4);
    assert_eq!(anomalies[0].reason, AnomalyReason::Low);
}

#[test]
fn test_threshold_is_strict() {
    // The spike scores sqrt(9) = 3 (slightly under, due to the epsilon guard)
    assert!(detect_anomalies(&spike_series(), 3.0).unwrap().is_empty());
    assert_eq!(detect_anomalies(&spike_series(), 2.99).unwrap().len(), 1);
}

#[rstest]
#[case(vec![5.0])]
#[case(vec![5.0, 5.0, 5.0, 5.0])]
#[case(vec![-2.5; 100])]
fn test_constant_series_has_no_anomalies(#[case] series: Vec<f64>) {
    assert!(detect_anomalies(&series, 0.0).unwrap().is_empty());
}

#[test]
fn test_zero_threshold_flags_every_deviation() {
    let series = [1.0, 2.0, 3.0, 4.0, 5.0];
    let anomalies = detect_anomalies(&series, 0.0).unwrap();

    let indices: Vec<usize> = anomalies.iter().map(|a| a.index).collect();
    assert_eq!(indices, vec![0, 1, 3, 4]);
}

#[test]
fn test_synthetic_timestamps() {
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    let detector = AnomalyDetector::new(2.0).unwrap();

    let anomalies = detector.detect_at(&spike_series(), now).unwrap();

    // Point i of N is stamped N - i days before now
    assert_eq!(anomalies[0].timestamp, now - Duration::days(1));
}

#[test]
fn test_supplied_timestamps() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let timestamps: Vec<_> = (0..10).map(|i| start + Duration::hours(i)).collect();
    let detector = AnomalyDetector::new(2.0).unwrap();

    let anomalies = detector
        .detect_with_timestamps(&spike_series(), &timestamps)
        .unwrap();
    assert_eq!(anomalies[0].timestamp, timestamps[9]);

    let err = detector
        .detect_with_timestamps(&spike_series(), &timestamps[..5])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert!(err.to_string().contains("doesn't match"));
}

#[test]
fn test_invalid_arguments() {
    assert!(matches!(
        detect_anomalies(&[], 3.0),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        detect_anomalies(&[1.0, f64::INFINITY], 3.0),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        AnomalyDetector::new(-1.0),
        Err(EngineError::InvalidParameter(_))
    ));
    assert!(matches!(
        AnomalyDetector::new(f64::NAN),
        Err(EngineError::InvalidParameter(_))
    ));
}

#[test]
fn test_detector_from_config() {
    let detector = AnomalyDetector::from_config(&AnomalyConfig::default()).unwrap();
    assert_eq!(detector.threshold_std_devs(), 3.0);
    assert_eq!(AnomalyDetector::default(), detector);
}

#[test]
fn test_anomaly_serializes_reason_in_lowercase() {
    let anomalies = detect_anomalies(&spike_series(), 2.0).unwrap();
    let json = serde_json::to_string(&anomalies[0]).unwrap();
    assert!(json.contains("\"reason\":\"high\""));
}

proptest! {
    #[test]
    fn raising_threshold_never_adds_anomalies(
        series in prop::collection::vec(-1000.0f64..1000.0, 1..200),
        low in 0.0f64..5.0,
        extra in 0.0f64..5.0,
    ) {
        let at_low = detect_anomalies(&series, low).unwrap();
        let at_high = detect_anomalies(&series, low + extra).unwrap();

        prop_assert!(at_high.len() <= at_low.len());
        for anomaly in &at_high {
            prop_assert!(at_low.iter().any(|a| a.index == anomaly.index));
            prop_assert!(anomaly.score > low + extra);
        }
    }
}
