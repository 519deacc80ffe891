//! Error types for the risk_forecast crate

use thiserror::Error;
use trade_math::MathError;

/// Custom error types for the risk_forecast crate
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or malformed series (NaN/infinite values, mismatched lengths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Series shorter than the window or horizon requires
    #[error("Insufficient data: need at least {required} values, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Loss became NaN or infinite while training
    #[error("Training diverged at epoch {epoch} (loss = {loss}); lower the learning rate or rescale the data")]
    TrainingDiverged { epoch: usize, loss: f64 },

    /// Error from invalid parameters or configuration values
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A cancellation token was triggered before the operation completed
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<MathError> for EngineError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InvalidInput(msg) => EngineError::InvalidInput(msg),
            MathError::InsufficientData { required, actual } => {
                EngineError::InsufficientData { required, actual }
            }
        }
    }
}
