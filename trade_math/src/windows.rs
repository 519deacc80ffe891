//! Sliding windows over a series for supervised sequence training

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// One supervised training pair: `input` values followed by the `target` that comes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub input: Vec<f64>,
    pub target: f64,
}

/// Slice `series` into chronological windows of `window_size` inputs, stride 1.
///
/// Window `i` has `input = series[i..i + window_size]` and
/// `target = series[i + window_size]`, giving exactly
/// `series.len() - window_size` windows. No shuffling happens here.
pub fn make_windows(series: &[f64], window_size: usize) -> Result<Vec<Window>> {
    if window_size == 0 {
        return Err(MathError::InvalidInput(
            "window size must be at least 1".to_string(),
        ));
    }

    if series.len() <= window_size {
        return Err(MathError::InsufficientData {
            required: window_size + 1,
            actual: series.len(),
        });
    }

    let windows = series
        .windows(window_size + 1)
        .map(|w| Window {
            input: w[..window_size].to_vec(),
            target: w[window_size],
        })
        .collect();

    Ok(windows)
}

/// Split windows chronologically: the trailing `validation_ratio` share becomes
/// the validation set. At least one window always stays in the training set.
pub fn split_train_validation(windows: &[Window], validation_ratio: f64) -> (&[Window], &[Window]) {
    if windows.is_empty() || validation_ratio <= 0.0 || validation_ratio >= 1.0 {
        return (windows, &[]);
    }

    let validation_size = ((windows.len() as f64 * validation_ratio).floor() as usize)
        .min(windows.len() - 1);
    windows.split_at(windows.len() - validation_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn windows_follow_series_order() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let windows = make_windows(&series, 3).unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].input, vec![1.0, 2.0, 3.0]);
        assert_eq!(windows[0].target, 4.0);
        assert_eq!(windows[1].input, vec![2.0, 3.0, 4.0]);
        assert_eq!(windows[1].target, 5.0);
    }

    #[test]
    fn too_short_series_reports_minimum_length() {
        let err = make_windows(&[1.0, 2.0, 3.0], 3).unwrap_err();
        assert_eq!(
            err,
            MathError::InsufficientData {
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn zero_window_is_invalid() {
        assert!(matches!(
            make_windows(&[1.0, 2.0], 0),
            Err(MathError::InvalidInput(_))
        ));
    }

    #[test]
    fn validation_split_takes_the_tail() {
        let series: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let windows = make_windows(&series, 5).unwrap();
        let (train, validation) = split_train_validation(&windows, 0.2);

        assert_eq!(train.len(), 8);
        assert_eq!(validation.len(), 2);
        assert_eq!(validation[0].target, 13.0);
        assert_eq!(validation[1].target, 14.0);
    }

    #[test]
    fn validation_split_keeps_one_training_window() {
        let windows = make_windows(&[1.0, 2.0, 3.0], 2).unwrap();
        let (train, validation) = split_train_validation(&windows, 0.9);
        assert_eq!(train.len(), 1);
        assert!(validation.is_empty());

        let (train, validation) = split_train_validation(&windows, 0.0);
        assert_eq!(train.len(), 1);
        assert!(validation.is_empty());
    }

    proptest! {
        #[test]
        fn window_count_and_targets(
            series in prop::collection::vec(-100.0f64..100.0, 2..120),
            window_size in 1usize..40,
        ) {
            prop_assume!(window_size < series.len());
            let windows = make_windows(&series, window_size).unwrap();
            prop_assert_eq!(windows.len(), series.len() - window_size);
            for (i, window) in windows.iter().enumerate() {
                prop_assert_eq!(window.input.len(), window_size);
                prop_assert_eq!(window.target, series[i + window_size]);
            }
        }
    }
}
