//! Autoregressive linear regressor
//!
//! Predicts the next value as a weighted sum of the window plus a bias,
//! i.e. an AR(window_size) model fitted by mini-batch gradient descent on
//! squared error.

use super::SequenceRegressor;
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use trade_math::Window;

/// Linear autoregressive regressor
#[derive(Debug, Clone, Default)]
pub struct LinearRegressor {
    weights: Array1<f64>,
    bias: f64,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learned lag weights, oldest lag first
    pub fn weights(&self) -> &[f64] {
        self.weights.as_slice().unwrap_or(&[])
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl SequenceRegressor for LinearRegressor {
    fn kind(&self) -> &'static str {
        "linear-ar"
    }

    fn initialize(&mut self, window_size: usize, _rng: &mut StdRng) {
        self.weights = Array1::zeros(window_size);
        self.bias = 0.0;
    }

    fn train_batch(&mut self, batch: &[&Window], learning_rate: f64, _rng: &mut StdRng) -> f64 {
        if batch.is_empty() {
            return 0.0;
        }

        let scale = 1.0 / batch.len() as f64;
        let mut grad_w: Array1<f64> = Array1::zeros(self.weights.len());
        let mut grad_b = 0.0;
        let mut loss = 0.0;

        for window in batch {
            let error = self.predict(&window.input) - window.target;
            loss += error * error;
            grad_w.scaled_add(2.0 * error * scale, &ArrayView1::from(&window.input[..]));
            grad_b += 2.0 * error * scale;
        }

        let loss = loss * scale;
        if loss.is_finite() {
            self.weights.scaled_add(-learning_rate, &grad_w);
            self.bias -= learning_rate * grad_b;
        }
        loss
    }

    fn predict(&self, input: &[f64]) -> f64 {
        if input.len() != self.weights.len() {
            return f64::NAN;
        }
        self.weights.dot(&ArrayView1::from(input)) + self.bias
    }
}
