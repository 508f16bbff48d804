//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur while reading scenes or writing dataset files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IoError> for synthgen_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => synthgen_core::Error::Io(e),
            IoError::InvalidFormat { format } => synthgen_core::Error::UnsupportedFormat(format),
            IoError::Json(e) => synthgen_core::Error::Serialization(e.to_string()),
            other => synthgen_core::Error::InvalidData(other.to_string()),
        }
    }
}
