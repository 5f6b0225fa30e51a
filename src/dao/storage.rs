use std::error::Error;
use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by store backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write violated a uniqueness invariant (duplicate join code, second
    /// session for a game, repeated answer to the same question).
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backend could not be reached or the request failed.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a conflict error with the given description.
    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict(message.into())
    }
}
