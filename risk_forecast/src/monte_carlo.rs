//! Monte Carlo price simulation under geometric Brownian motion
//!
//! Every path starts at the same price and takes daily steps
//! (`dt = 1/252`) of
//!
//! ```text
//! price *= exp((mu - sigma^2 / 2) * dt + sigma * sqrt(dt) * z)
//! ```
//!
//! with `z` a standard normal drawn by the Box-Muller transform. Risk
//! statistics are computed from the distribution of terminal prices.
//!
//! All paths are returned, so memory grows with
//! `simulation_count * (periods + 1)`. Lower either value to trade
//! fidelity for memory.
//!
//! Paths are generated in parallel. Each path draws from its own generator,
//! seeded from a master generator in path order, so a fixed seed gives the
//! same paths whatever the thread count.

use crate::cancel::CancellationToken;
use crate::config::SimulationConfig;
use crate::error::{EngineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{info, warn};
use trade_math::returns::{annualize_return, annualize_volatility, log_returns, TRADING_DAYS_PER_YEAR};
use trade_math::statistics::{mean, percentile_nearest_rank, population_std_dev, sorted_ascending};
use trade_math::validate_series;

/// Share of worst outcomes averaged for expected shortfall
const TAIL_SHARE: f64 = 0.05;

/// Draw a standard normal variate from two uniform draws (Box-Muller)
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen() is in [0, 1); flip to (0, 1] so the logarithm stays finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Annualised drift and volatility of a GBM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmParameters {
    pub expected_return: f64,
    pub volatility: f64,
}

impl GbmParameters {
    /// Estimate annualised parameters from daily log returns of a price series
    pub fn estimate(prices: &[f64]) -> Result<Self> {
        let returns = log_returns(prices)?;
        let daily_volatility = population_std_dev(&returns);
        Ok(Self {
            expected_return: annualize_return(mean(&returns)) + 0.5 * annualize_volatility(daily_volatility).powi(2),
            volatility: annualize_volatility(daily_volatility),
        })
    }
}

/// Statistics of the terminal price distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    pub mean: f64,
    pub std: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_50: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    /// `(start - percentile_5) / start`
    pub value_at_risk: f64,
    /// `(start - mean of worst 5%) / start`
    pub expected_shortfall: f64,
}

impl SimulationStatistics {
    /// Summarise terminal prices of paths that started at `start_price`
    pub fn from_terminal_prices(start_price: f64, terminal_prices: &[f64]) -> Result<Self> {
        if terminal_prices.is_empty() {
            return Err(EngineError::InvalidInput(
                "no terminal prices to summarise".to_string(),
            ));
        }

        let sorted = sorted_ascending(terminal_prices);
        let percentile = |p: f64| percentile_nearest_rank(&sorted, p).unwrap_or(f64::NAN);

        let tail_len = ((sorted.len() as f64 * TAIL_SHARE).ceil() as usize).clamp(1, sorted.len());
        let worst_mean = mean(&sorted[..tail_len]);
        let percentile_5 = percentile(5.0);

        Ok(Self {
            mean: mean(&sorted),
            std: population_std_dev(&sorted),
            percentile_5,
            percentile_25: percentile(25.0),
            percentile_50: percentile(50.0),
            percentile_75: percentile(75.0),
            percentile_95: percentile(95.0),
            value_at_risk: (start_price - percentile_5) / start_price,
            expected_shortfall: (start_price - worst_mean) / start_price,
        })
    }
}

/// Simulated paths and their terminal statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    simulation_count: usize,
    paths: Vec<Vec<f64>>,
    statistics: SimulationStatistics,
}

impl MonteCarloResult {
    pub fn simulation_count(&self) -> usize {
        self.simulation_count
    }

    /// Every simulated path, `periods + 1` prices each, starting at the start price
    pub fn paths(&self) -> &[Vec<f64>] {
        &self.paths
    }

    pub fn statistics(&self) -> &SimulationStatistics {
        &self.statistics
    }

    /// Last price of every path, in path order
    pub fn terminal_prices(&self) -> Vec<f64> {
        self.paths
            .iter()
            .filter_map(|path| path.last().copied())
            .collect()
    }

    /// Serialize the result as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// GBM Monte Carlo simulator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonteCarloSimulator {
    config: SimulationConfig,
}

impl MonteCarloSimulator {
    /// Create a simulator with default settings (1000 paths of 252 periods, entropy-seeded)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Fix the master seed so repeated runs produce identical paths
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn with_simulation_count(mut self, simulation_count: usize) -> Self {
        self.config.simulation_count = simulation_count;
        self
    }

    pub fn with_periods(mut self, periods: usize) -> Self {
        self.config.periods = periods;
        self
    }

    /// Simulate paths from `start_price` with annualised drift and volatility
    pub fn simulate(&self, start_price: f64, expected_return: f64, volatility: f64) -> Result<MonteCarloResult> {
        self.simulate_with_cancel(start_price, expected_return, volatility, &CancellationToken::new())
    }

    /// Like [`simulate`](Self::simulate), checking `cancel` between path batches
    pub fn simulate_with_cancel(
        &self,
        start_price: f64,
        expected_return: f64,
        volatility: f64,
        cancel: &CancellationToken,
    ) -> Result<MonteCarloResult> {
        let mut master = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.simulate_with_rng(start_price, expected_return, volatility, &mut master, cancel)
    }

    /// Simulate using a caller-supplied master generator for the per-path seeds
    pub fn simulate_with_rng<G: Rng + ?Sized>(
        &self,
        start_price: f64,
        expected_return: f64,
        volatility: f64,
        master: &mut G,
        cancel: &CancellationToken,
    ) -> Result<MonteCarloResult> {
        self.config.validate()?;
        if !start_price.is_finite() || start_price <= 0.0 {
            return Err(EngineError::InvalidInput(
                "start price must be positive and finite".to_string(),
            ));
        }
        if !expected_return.is_finite() {
            return Err(EngineError::InvalidInput(
                "expected return must be finite".to_string(),
            ));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(EngineError::InvalidInput(
                "volatility must be finite and non-negative".to_string(),
            ));
        }

        let SimulationConfig {
            simulation_count,
            periods,
            batch_size,
            ..
        } = self.config;

        info!(
            simulation_count,
            periods, start_price, expected_return, volatility, "running monte carlo simulation"
        );

        let dt = 1.0 / TRADING_DAYS_PER_YEAR;
        let drift = (expected_return - 0.5 * volatility * volatility) * dt;
        let diffusion = volatility * dt.sqrt();

        let seeds: Vec<u64> = (0..simulation_count).map(|_| master.gen()).collect();
        let mut paths = Vec::with_capacity(simulation_count);

        for batch in seeds.chunks(batch_size) {
            if cancel.is_cancelled() {
                warn!(completed = paths.len(), simulation_count, "simulation cancelled");
                return Err(EngineError::Cancelled(format!(
                    "simulation stopped after {} of {} paths",
                    paths.len(),
                    simulation_count
                )));
            }

            let generated: Vec<Vec<f64>> = batch
                .par_iter()
                .map(|&seed| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    simulate_path(start_price, drift, diffusion, periods, &mut rng)
                })
                .collect();
            paths.extend(generated);
        }

        let terminal: Vec<f64> = paths.iter().filter_map(|p| p.last().copied()).collect();
        let statistics = SimulationStatistics::from_terminal_prices(start_price, &terminal)?;

        info!(
            mean = statistics.mean,
            value_at_risk = statistics.value_at_risk,
            expected_shortfall = statistics.expected_shortfall,
            "simulation complete"
        );

        Ok(MonteCarloResult {
            simulation_count,
            paths,
            statistics,
        })
    }

    /// Simulate from the last observed price, with drift and volatility estimated from the series
    pub fn simulate_from_series(&self, prices: &[f64]) -> Result<MonteCarloResult> {
        validate_series(prices)?;
        let params = GbmParameters::estimate(prices)?;
        let start_price = prices[prices.len() - 1];
        self.simulate(start_price, params.expected_return, params.volatility)
    }
}

fn simulate_path<R: Rng + ?Sized>(
    start_price: f64,
    drift: f64,
    diffusion: f64,
    periods: usize,
    rng: &mut R,
) -> Vec<f64> {
    let mut path = Vec::with_capacity(periods + 1);
    let mut price = start_price;
    path.push(price);

    for _ in 0..periods {
        let z = standard_normal(rng);
        price *= (drift + diffusion * z).exp();
        path.push(price);
    }

    path
}

/// Simulate `simulation_count` GBM paths of `periods` daily steps with an entropy seed
pub fn simulate_gbm(
    start_price: f64,
    expected_return: f64,
    volatility: f64,
    simulation_count: usize,
    periods: usize,
) -> Result<MonteCarloResult> {
    MonteCarloSimulator::new()
        .with_simulation_count(simulation_count)
        .with_periods(periods)
        .simulate(start_price, expected_return, volatility)
}
