use std::error::Error;
use thiserror::Error;

/// Result alias for challenge store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a challenge store, whatever the backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored round, progress or entry record could not be read back.
    #[error("corrupted record in `{collection}`: {reason}")]
    Corrupted { collection: String, reason: String },
}

impl StorageError {
    /// Wrap a backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// A record of `collection` is unreadable; retrying will not help.
    pub fn corrupted(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::Corrupted {
            collection: collection.into(),
            reason: reason.into(),
        }
    }
}
