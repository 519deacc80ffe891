//! Adam optimiser

use ndarray::{Array, Dimension, Zip};

#[derive(Debug, Clone)]
pub(crate) struct Adam {
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
        }
    }
}

impl Adam {
    pub(crate) fn reset(&mut self) {
        self.step = 0;
    }

    /// Advance the step counter; call once per batch before any `update`.
    pub(crate) fn next_step(&mut self) {
        self.step = self.step.saturating_add(1);
    }

    /// Update one parameter tensor in place from its gradient and moment estimates
    pub(crate) fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        first_moment: &mut Array<f64, D>,
        second_moment: &mut Array<f64, D>,
        learning_rate: f64,
    ) {
        let step = self.step.max(1);
        let correction1 = 1.0 - self.beta1.powi(step);
        let correction2 = 1.0 - self.beta2.powi(step);
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        Zip::from(param)
            .and(grad)
            .and(first_moment)
            .and(second_moment)
            .for_each(|p, &g, m, v| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::default();
        adam.next_step();

        let mut param = array![1.0, -1.0];
        let grad = array![0.5, -2.0];
        let mut m = array![0.0, 0.0];
        let mut v = array![0.0, 0.0];
        adam.update(&mut param, &grad, &mut m, &mut v, 0.1);

        // Bias-corrected first step is lr * sign(g)
        assert!((param[0] - 0.9).abs() < 1e-6);
        assert!((param[1] + 0.9).abs() < 1e-6);
    }
}
