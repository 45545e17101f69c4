//! Error types and handling for the resource server
//!
//! Startup and infrastructure errors live in [`Error`]; store failures in
//! [`StoreError`]. The HTTP-facing taxonomy is [`crate::api::ApiError`].

use std::time::Duration;
use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the resource server
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Errors raised by a [`crate::storage::DocumentStore`] implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or refused the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the configured bound
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// Disk I/O operation failed
    #[error("Disk I/O failed: {0}")]
    DiskIo(#[from] std::io::Error),

    /// Corruption detected in stored data
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// The store rejected the write
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = Error::config("bad prefix");
        assert_eq!(err.to_string(), "Configuration error: bad prefix");
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: port taken");
    }

    #[test]
    fn test_store_timeout_message() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Store call timed out after 250ms");
    }
}
