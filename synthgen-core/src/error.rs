//! Error types for synthgen

use thiserror::Error;

/// Main error type for synthgen operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Sampling exhausted: accepted {accepted} of {requested} points after {attempts} attempts")]
    SamplingExhausted {
        requested: usize,
        accepted: usize,
        attempts: usize,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for synthgen operations
pub type Result<T> = std::result::Result<T, Error>;
