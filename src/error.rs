//! Error types for Kcal Flux

use thiserror::Error;

/// Errors that can occur during computation
///
/// Missing data is never an error here: estimates that cannot be computed are
/// reported as `None`. These variants cover configuration mistakes and
/// malformed input only.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Incompatible unit dimensions: cannot convert {from} to {to}")]
    IncompatibleDimension { from: String, to: String },

    #[error("Invalid macro split: {0}")]
    InvalidSplit(String),

    #[error("Cannot derive macros: {missing} values missing, at most one may be derived")]
    UnderdeterminedMacros { missing: usize },

    #[error("Smoothing factor must be in (0, 1], got {0}")]
    InvalidAlpha(f64),

    #[error("Invalid budget cycle: {0}")]
    InvalidCycle(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
