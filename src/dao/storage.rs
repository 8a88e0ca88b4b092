use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying service.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable context.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A snapshot could not be serialised.
    #[error("failed to encode `{collection}` snapshot")]
    Encode {
        /// Collection being written.
        collection: &'static str,
        /// Serialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// The backend stopped delivering updates for a collection.
    #[error("subscription to `{collection}` ended")]
    SubscriptionClosed {
        /// Collection whose feed ended.
        collection: &'static str,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
