//! Training loop and autoregressive rollout around a [`SequenceRegressor`]

use super::{
    ConfidenceIntervals, EpochLoss, ErrorMetrics, ForecastMetadata, ForecastResult,
    LinearRegressor, LstmRegressor, SequenceRegressor, TrainingReport,
};
use crate::cancel::CancellationToken;
use crate::config::ForecastConfig;
use crate::error::{EngineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use trade_math::{
    denormalize, forecast_accuracy, make_windows, normalize, split_train_validation,
    validate_series, NormalizationParams, Window,
};

#[derive(Debug, Clone)]
enum ModelState {
    Untrained,
    Trained {
        fingerprint: u64,
        window_size: usize,
        report: TrainingReport,
    },
}

/// A trainable forecaster owning its regressor's parameters.
///
/// The model starts Untrained; a successful [`fit`](Self::fit) is the only way
/// to become Trained. A fit that fails or is cancelled leaves the previous
/// state (and weights) untouched. One instance should be kept per series and
/// hyperparameter set; instances share no state with each other.
#[derive(Debug)]
pub struct ForecastModel<R: SequenceRegressor = LstmRegressor> {
    regressor: R,
    config: ForecastConfig,
    rng: StdRng,
    state: ModelState,
}

impl ForecastModel<LstmRegressor> {
    /// Create an LSTM-backed model from `config`
    pub fn lstm(config: ForecastConfig) -> Result<Self> {
        Self::new(LstmRegressor::from_config(&config), config)
    }
}

impl ForecastModel<LinearRegressor> {
    /// Create a linear autoregressive model from `config`
    pub fn linear(config: ForecastConfig) -> Result<Self> {
        Self::new(LinearRegressor::new(), config)
    }
}

impl<R: SequenceRegressor> ForecastModel<R> {
    /// Create a new model around `regressor`
    pub fn new(regressor: R, config: ForecastConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            regressor,
            config,
            rng,
            state: ModelState::Untrained,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ModelState::Trained { .. })
    }

    /// Report of the fit that produced the current weights
    pub fn training_report(&self) -> Option<&TrainingReport> {
        match &self.state {
            ModelState::Trained { report, .. } => Some(report),
            ModelState::Untrained => None,
        }
    }

    /// Train on `series` for `epochs` passes over windows of `window_size` values
    pub fn fit(&mut self, series: &[f64], window_size: usize, epochs: usize) -> Result<TrainingReport> {
        self.fit_with_cancel(series, window_size, epochs, &CancellationToken::new())
    }

    /// Train with the configured window size and epoch count
    pub fn fit_configured(&mut self, series: &[f64]) -> Result<TrainingReport> {
        self.fit(series, self.config.window_size, self.config.epochs)
    }

    /// Like [`fit`](Self::fit), checking `cancel` before every epoch
    pub fn fit_with_cancel(
        &mut self,
        series: &[f64],
        window_size: usize,
        epochs: usize,
        cancel: &CancellationToken,
    ) -> Result<TrainingReport> {
        validate_series(series)?;
        if epochs == 0 {
            return Err(EngineError::InvalidParameter(
                "epochs must be at least 1".to_string(),
            ));
        }

        let (normalized, _) = normalize(series)?;
        let windows = make_windows(&normalized, window_size)?;
        let (train, validation) = split_train_validation(&windows, self.config.validation_split);

        info!(
            model = self.regressor.kind(),
            series_len = series.len(),
            window_size,
            epochs,
            training_size = train.len(),
            validation_size = validation.len(),
            "fitting forecast model"
        );

        let mut candidate = self.regressor.clone();
        candidate.initialize(window_size, &mut self.rng);

        let mut order: Vec<usize> = (0..train.len()).collect();
        let mut history = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            if cancel.is_cancelled() {
                warn!(epoch, "fit cancelled");
                return Err(EngineError::Cancelled(format!(
                    "fit stopped after {} of {} epochs",
                    epoch - 1,
                    epochs
                )));
            }

            order.shuffle(&mut self.rng);
            let mut loss_sum = 0.0;
            for chunk in order.chunks(self.config.batch_size) {
                let batch: Vec<&Window> = chunk.iter().map(|&i| &train[i]).collect();
                let batch_loss = candidate.train_batch(&batch, self.config.learning_rate, &mut self.rng);
                if !batch_loss.is_finite() {
                    warn!(epoch, loss = batch_loss, "training diverged");
                    return Err(EngineError::TrainingDiverged {
                        epoch,
                        loss: batch_loss,
                    });
                }
                loss_sum += batch_loss * batch.len() as f64;
            }

            let train_loss = loss_sum / train.len() as f64;
            let validation_loss = if validation.is_empty() {
                None
            } else {
                Some(candidate.loss(validation))
            };

            if let Some(loss) = validation_loss.filter(|l| !l.is_finite()) {
                warn!(epoch, loss, "validation loss diverged");
                return Err(EngineError::TrainingDiverged { epoch, loss });
            }

            debug!(epoch, train_loss, ?validation_loss, "epoch complete");
            history.push(EpochLoss {
                epoch,
                train_loss,
                validation_loss,
            });
        }

        // The last update is not covered by any batch loss
        let final_loss = candidate.loss(train);
        if !final_loss.is_finite() {
            warn!(loss = final_loss, "training diverged on the final update");
            return Err(EngineError::TrainingDiverged {
                epoch: epochs,
                loss: final_loss,
            });
        }

        let (train_loss, validation_loss) = history
            .last()
            .map(|last| (last.train_loss, last.validation_loss))
            .unwrap_or((final_loss, None));

        let report = TrainingReport {
            epochs_run: epochs,
            training_size: train.len(),
            validation_size: validation.len(),
            train_loss,
            validation_loss,
            history,
        };

        info!(train_loss, ?validation_loss, "forecast model trained");

        self.regressor = candidate;
        self.state = ModelState::Trained {
            fingerprint: fingerprint(series, window_size),
            window_size,
            report: report.clone(),
        };

        Ok(report)
    }

    /// Forecast `horizon` steps past the end of `series`.
    ///
    /// Fits first (with the configured epochs) unless the model is already
    /// trained on this exact series and window size. Each prediction is fed
    /// back as the newest input of the next step, so errors compound over the
    /// horizon. The confidence band has a fixed width of `z * std` around each
    /// prediction, where `std` is the standard deviation of `series` itself
    /// rather than a per-step forecast variance, so it does not widen with
    /// the horizon.
    pub fn forecast(&mut self, series: &[f64], horizon: usize, window_size: usize) -> Result<ForecastResult> {
        self.forecast_with_cancel(series, horizon, window_size, &CancellationToken::new())
    }

    /// Forecast `horizon` steps using the configured window size
    pub fn forecast_configured(&mut self, series: &[f64], horizon: usize) -> Result<ForecastResult> {
        self.forecast(series, horizon, self.config.window_size)
    }

    /// Like [`forecast`](Self::forecast); `cancel` applies to any implicit fit
    pub fn forecast_with_cancel(
        &mut self,
        series: &[f64],
        horizon: usize,
        window_size: usize,
        cancel: &CancellationToken,
    ) -> Result<ForecastResult> {
        validate_series(series)?;
        if horizon == 0 {
            return Err(EngineError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if window_size == 0 {
            return Err(EngineError::InvalidParameter(
                "window_size must be at least 1".to_string(),
            ));
        }
        if series.len() <= window_size {
            return Err(EngineError::InsufficientData {
                required: window_size + 1,
                actual: series.len(),
            });
        }

        if self.needs_fit(series, window_size) {
            self.fit_with_cancel(series, window_size, self.config.epochs, cancel)?;
        }

        let report = match &self.state {
            ModelState::Trained { report, .. } => report.clone(),
            ModelState::Untrained => {
                return Err(EngineError::InvalidInput(
                    "model is not trained".to_string(),
                ))
            }
        };

        let (normalized, params) = normalize(series)?;
        let mut window: VecDeque<f64> = normalized[normalized.len() - window_size..]
            .iter()
            .copied()
            .collect();

        let mut rollout = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = self.regressor.predict(window.make_contiguous());
            if !next.is_finite() {
                return Err(EngineError::TrainingDiverged {
                    epoch: report.epochs_run,
                    loss: next,
                });
            }
            rollout.push(next);
            window.pop_front();
            window.push_back(next);
        }

        let predictions = denormalize(&rollout, &params);
        let z = self.config.z_score().ok_or_else(|| {
            EngineError::InvalidParameter(format!(
                "unsupported confidence level {}",
                self.config.confidence_level
            ))
        })?;
        let margin = z * params.std;
        let confidence_intervals = ConfidenceIntervals {
            lower: predictions.iter().map(|p| p - margin).collect(),
            upper: predictions.iter().map(|p| p + margin).collect(),
        };

        let error_metrics = self.in_sample_metrics(series, &normalized, &params, window_size, &report)?;

        debug!(horizon, window_size, mae = error_metrics.mae, "forecast complete");

        ForecastResult::new(
            predictions,
            confidence_intervals,
            ForecastMetadata {
                model_kind: self.regressor.kind().to_string(),
                horizon,
                window_size,
                training_size: report.training_size,
                error_metrics,
            },
        )
    }

    /// Move the model to a worker thread and fit it there
    pub fn spawn_fit(self, series: Vec<f64>, window_size: usize, epochs: usize) -> Result<TrainingHandle<R>>
    where
        R: 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name("forecast-fit".to_string())
            .spawn(move || {
                let mut model = self;
                let outcome = model.fit_with_cancel(&series, window_size, epochs, &token);
                (model, outcome)
            })?;

        Ok(TrainingHandle { cancel, handle })
    }

    fn needs_fit(&self, series: &[f64], window_size: usize) -> bool {
        match &self.state {
            ModelState::Trained {
                fingerprint: trained_on,
                window_size: trained_window,
                ..
            } => *trained_window != window_size || *trained_on != fingerprint(series, window_size),
            ModelState::Untrained => true,
        }
    }

    /// One-step-ahead accuracy over every window of the series, in original units
    fn in_sample_metrics(
        &self,
        series: &[f64],
        normalized: &[f64],
        params: &NormalizationParams,
        window_size: usize,
        report: &TrainingReport,
    ) -> Result<ErrorMetrics> {
        let fitted: Vec<f64> = make_windows(normalized, window_size)?
            .iter()
            .map(|w| params.invert(self.regressor.predict(&w.input)))
            .collect();
        let accuracy = forecast_accuracy(&fitted, &series[window_size..])?;

        Ok(ErrorMetrics {
            mae: accuracy.mae,
            mse: accuracy.mse,
            rmse: accuracy.rmse,
            mape: accuracy.mape,
            train_loss: report.train_loss,
            validation_loss: report.validation_loss,
        })
    }
}

/// Fit running on a worker thread
#[derive(Debug)]
pub struct TrainingHandle<R: SequenceRegressor> {
    cancel: CancellationToken,
    handle: JoinHandle<(ForecastModel<R>, Result<TrainingReport>)>,
}

impl<R: SequenceRegressor> TrainingHandle<R> {
    /// Whether the fit has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the fit to stop before its next epoch
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for the fit and get the model back together with its outcome
    pub fn join(self) -> (ForecastModel<R>, Result<TrainingReport>) {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn fingerprint(series: &[f64], window_size: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    window_size.hash(&mut hasher);
    series.len().hash(&mut hasher);
    for value in series {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
