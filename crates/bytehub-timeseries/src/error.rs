//! Error types for storage backends

use bytehub_core::StoreError;
use thiserror::Error;

/// Errors that can occur while loading or saving a feature's series
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No backend registered for scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid storage url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl From<BackendError> for StoreError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::InvalidFrequency(msg) | BackendError::InvalidPartition(msg) => {
                StoreError::InvalidArgument(msg)
            }
            BackendError::InvalidFrame(msg) => StoreError::InvalidInput(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
