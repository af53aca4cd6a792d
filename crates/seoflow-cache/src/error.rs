//! Cache error types.

use seoflow_core::{Error, ErrorKind};
use thiserror::Error;

/// Result type for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// Errors that can occur while reading or writing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error in a file-backed store.
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload or entry could not be (de)serialized.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Every cache failure surfaces to the pipeline as the store being
    /// unavailable.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::CacheUnavailable
    }
}

impl From<CacheError> for Error {
    fn from(error: CacheError) -> Self {
        Error::cache_unavailable()
            .with_message(error.to_string())
            .with_source(error)
    }
}
