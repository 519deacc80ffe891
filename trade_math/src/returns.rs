//! Return series and annualisation helpers

use crate::{validate_series, MathError, Result};

/// Trading days used to annualise daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calculate simple returns `p[t] / p[t-1] - 1` from a price series
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    if prices.len() < 2 {
        return Vec::new();
    }

    prices.windows(2).map(|w| (w[1] / w[0]) - 1.0).collect()
}

/// Calculate log returns `ln(p[t] / p[t-1])` from a strictly positive price series
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
    validate_series(prices)?;

    if prices.len() < 2 {
        return Err(MathError::InsufficientData {
            required: 2,
            actual: prices.len(),
        });
    }

    if let Some(index) = prices.iter().position(|&p| p <= 0.0) {
        return Err(MathError::InvalidInput(format!(
            "log returns need strictly positive prices (index {})",
            index
        )));
    }

    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Annualise a mean daily return
pub fn annualize_return(daily_return: f64) -> f64 {
    daily_return * TRADING_DAYS_PER_YEAR
}

/// Annualise a daily standard deviation
pub fn annualize_volatility(daily_std_dev: f64) -> f64 {
    daily_std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simple_returns_from_prices() {
        let returns = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.1, epsilon = 1e-12);
        assert!(simple_returns(&[100.0]).is_empty());
    }

    #[test]
    fn log_returns_require_positive_prices() {
        let returns = log_returns(&[100.0, 100.0 * 1.0_f64.exp()]).unwrap();
        assert_relative_eq!(returns[0], 1.0, epsilon = 1e-12);

        assert!(matches!(
            log_returns(&[100.0, 0.0]),
            Err(MathError::InvalidInput(_))
        ));
        assert!(matches!(
            log_returns(&[100.0]),
            Err(MathError::InsufficientData { required: 2, .. })
        ));
    }

    #[test]
    fn annualisation() {
        assert_relative_eq!(annualize_return(0.001), 0.252);
        assert_relative_eq!(annualize_volatility(0.01), 0.01 * 252.0_f64.sqrt());
    }
}
