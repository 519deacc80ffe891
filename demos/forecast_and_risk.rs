// Forecast a synthetic price series, flag outliers and simulate a year of risk.
//
// Run with `RUST_LOG=risk_forecast=debug` to see per-epoch training losses.
use risk_forecast::config::ForecastConfig;
use risk_forecast::{AnomalyDetector, EngineError, ForecastModel, MonteCarloSimulator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn sample_prices() -> Vec<f64> {
    (0..250)
        .map(|i| {
            let t = i as f64;
            let price = 100.0 + 0.08 * t + 4.0 * (t * 0.15).sin();
            if i == 180 {
                price * 1.25
            } else {
                price
            }
        })
        .collect()
}

fn main() -> Result<(), EngineError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "risk_forecast=info".into()))
        .init();

    let prices = sample_prices();
    println!("Loaded {} daily prices\n", prices.len());

    println!("=== Anomalies ===");
    for anomaly in AnomalyDetector::new(3.0)?.detect(&prices)? {
        println!(
            "  day {:>3}: {:.2} ({:?}, {:.1} std devs)",
            anomaly.index, anomaly.value, anomaly.reason, anomaly.score
        );
    }

    println!("\n=== Forecast (10 days) ===");
    let config = ForecastConfig::default()
        .with_window_size(20)
        .with_epochs(20)
        .with_hidden_units(16)
        .with_learning_rate(0.01)
        .with_seed(42);
    let mut model = ForecastModel::lstm(config)?;
    let forecast = model.forecast_configured(&prices, 10)?;

    let bands = forecast.confidence_intervals();
    for (step, prediction) in forecast.predictions().iter().enumerate() {
        println!(
            "  t+{:<2} {:>8.2}  [{:.2}, {:.2}]",
            step + 1,
            prediction,
            bands.lower[step],
            bands.upper[step]
        );
    }
    let metrics = &forecast.metadata().error_metrics;
    println!("  in-sample MAE {:.3}, RMSE {:.3}", metrics.mae, metrics.rmse);

    println!("\n=== Monte Carlo (1 year, 2000 paths) ===");
    let risk = MonteCarloSimulator::new()
        .with_seed(7)
        .with_simulation_count(2000)
        .simulate_from_series(&prices)?;
    let stats = risk.statistics();
    println!("  mean terminal price {:.2}", stats.mean);
    println!(
        "  5th / 50th / 95th percentile {:.2} / {:.2} / {:.2}",
        stats.percentile_5, stats.percentile_50, stats.percentile_95
    );
    println!("  VaR(95%) {:.2}%", stats.value_at_risk * 100.0);
    println!("  Expected shortfall {:.2}%", stats.expected_shortfall * 100.0);

    Ok(())
}
