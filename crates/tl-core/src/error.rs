//! Error types for toylim

use thiserror::Error;

/// toylim error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input or a query made in the wrong state
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown style name or out-of-range setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A statistic cannot be evaluated for the given inputs
    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(String),

    /// An iterative search exceeded its iteration cap
    #[error("No convergence: {0}")]
    NonConvergence(String),

    /// Unknown channel, sample or systematic
    #[error("Lookup error: {0}")]
    Lookup(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
