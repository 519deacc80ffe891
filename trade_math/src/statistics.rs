//! Descriptive statistics over numeric series
//!
//! Thin wrappers around `statrs` that fix the conventions used across the
//! engine: arithmetic mean, *population* standard deviation and
//! nearest-rank percentiles.

use statrs::statistics::Statistics;

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Population standard deviation (divides by N, not N - 1).
/// Returns NaN for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    values.iter().population_std_dev()
}

/// Sort a copy of `values` in ascending order.
pub fn sorted_ascending(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Nearest-rank percentile of an ascending slice.
///
/// The value at index `floor(p / 100 * len)`, clamped to the last element.
/// No interpolation between neighbouring ranks is performed.
/// Returns `None` for an empty slice.
pub fn percentile_nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (p / 100.0 * sorted.len() as f64).floor();
    let index = if rank <= 0.0 {
        0
    } else {
        (rank as usize).min(sorted.len() - 1)
    };

    Some(sorted[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_population_std() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0);
        assert_relative_eq!(population_std_dev(&data), 2.0);
    }

    #[test]
    fn empty_slice_is_nan() {
        assert!(mean(&[]).is_nan());
        assert!(population_std_dev(&[]).is_nan());
    }

    #[test]
    fn nearest_rank_uses_floor_index() {
        let sorted: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(percentile_nearest_rank(&sorted, 5.0), Some(1.0));
        assert_eq!(percentile_nearest_rank(&sorted, 50.0), Some(10.0));
        assert_eq!(percentile_nearest_rank(&sorted, 95.0), Some(19.0));
        assert_eq!(percentile_nearest_rank(&sorted, 100.0), Some(19.0));
        assert_eq!(percentile_nearest_rank(&sorted, 0.0), Some(0.0));
        assert_eq!(percentile_nearest_rank(&[], 50.0), None);
    }

    #[test]
    fn sorting_leaves_input_untouched() {
        let data = [3.0, -1.0, 2.0];
        assert_eq!(sorted_ascending(&data), vec![-1.0, 2.0, 3.0]);
        assert_eq!(data, [3.0, -1.0, 2.0]);
    }
}
