//! Error types for the stress simulation core

use thiserror::Error;

/// Errors that can occur while mapping, simulating or aggregating a scenario
#[derive(Error, Debug)]
pub enum StressError {
    /// Caller contract violation: bad scenario fields, simulation
    /// parameters or a correlation matrix that is not PSD
    #[error("Validation error: {0}")]
    Validation(String),

    /// The simulation produced non-finite values
    #[error("Numerical instability: {0}")]
    NumericInstability(String),

    /// A background simulation task panicked or was cancelled
    #[error("Simulation aborted: {0}")]
    Aborted(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StressError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        StressError::Validation(msg.into())
    }

    pub(crate) fn instability(msg: impl Into<String>) -> Self {
        StressError::NumericInstability(msg.into())
    }

    /// Whether this error is a caller contract violation
    pub fn is_validation(&self) -> bool {
        matches!(self, StressError::Validation(_))
    }
}

/// Result type for stress operations
pub type Result<T> = std::result::Result<T, StressError>;
