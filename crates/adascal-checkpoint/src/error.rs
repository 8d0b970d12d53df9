//! Checkpoint errors.

use adascal_protocols::ScrapeError;
use thiserror::Error;

/// Checkpoint error types.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A result file exists but cannot be read back.
    #[error("Invalid checkpoint data in {path}: {message}")]
    InvalidData { path: String, message: String },
}

impl From<CheckpointError> for ScrapeError {
    fn from(err: CheckpointError) -> Self {
        ScrapeError::PersistenceFailure(err.to_string())
    }
}
