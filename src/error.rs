//! Error types for the forecasting pipeline

use crate::registry::Stage;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by feature engineering, training, forecasting and the registry
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Missing date information: {0}")]
    MissingDate(String),

    #[error("Dates must be strictly ascending: {previous} is followed by {next} at row {row}")]
    UnorderedDates {
        row: usize,
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Undefined value in column {column} at row {row}")]
    UndefinedValue { column: String, row: usize },

    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid horizon {0}: must be between 1 and 14 days")]
    InvalidHorizon(usize),

    #[error("Model not trained: {0}")]
    ModelNotTrained(String),

    #[error("No model registered at stage {0}")]
    StageNotFound(Stage),

    #[error("Model version {0} not found")]
    VersionNotFound(u32),

    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl ForecastError {
    /// Conditions under which an evaluation could not run at all, as opposed
    /// to running and failing
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ForecastError::InputUnavailable(_) | ForecastError::StageNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
