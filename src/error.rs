//! Error types for Sleep Drift

use thiserror::Error;

/// Errors that can occur during ingestion, feature derivation or seeding.
///
/// The baseline, drift and risk stages are total and never produce an error.
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("Malformed CSV header: {0}")]
    MalformedHeader(String),

    #[error("CSV contains no data rows")]
    NoDataRows,

    #[error("CSV contains no valid rows")]
    NoValidRows,

    #[error("Invalid timestamp in {context}: {value:?}")]
    InvalidTimestamp { context: String, value: String },

    #[error("Invalid date in {context}: {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { context: String, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Seed options out of range: {0}")]
    SeedOutOfRange(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
