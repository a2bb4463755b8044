//! Error types for the incident feature pipeline

use thiserror::Error;

/// Errors that can occur while encoding a batch or predicting from it
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to parse timestamp at row {row}: {value:?}")]
    ParseError { row: usize, value: String },

    #[error("Ward {key:?} at row {row} has no entry in the risk table")]
    LookupError { row: usize, key: String },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Cannot coerce {value:?} in column {column:?} at row {row} to 0/1")]
    CoercionError {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Invalid ward risk table: {0}")]
    RiskTableError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Data frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Shorthand for a missing-column schema error
    pub fn missing_column(name: &str) -> Self {
        PipelineError::SchemaError(format!("column {name:?} not found"))
    }
}
