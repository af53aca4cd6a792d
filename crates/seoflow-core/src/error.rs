//! Common error type definitions.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// This type is commonly used as a source error in structured error types,
/// providing a way to wrap any error that implements the standard `Error` trait
/// while maintaining Send and Sync bounds for multi-threaded contexts.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur while producing content.
///
/// The same taxonomy is reported back to callers of the pipeline, so the
/// serialized names are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, IntoStaticStr, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request inputs are malformed (empty keywords, blank topic, bad length).
    InvalidInput,
    /// A search or ranking source could not be reached.
    ExternalSourceUnavailable,
    /// The generative capability errored or returned nothing usable.
    GenerationFailed,
    /// Generated content violates hard constraints after all regenerations.
    ConstraintUnsatisfied,
    /// Prohibited terms could not be removed without breaking invariants.
    StyleViolationUnresolved,
    /// The result cache store is unreachable.
    CacheUnavailable,
    /// A call or stage exceeded its deadline.
    Timeout,
    /// Work was cancelled by the caller.
    Cancelled,
    /// A referenced resource does not exist.
    NotFound,
    /// Serialization/deserialization error.
    Serialization,
    /// Internal invariant violated.
    Internal,
}

impl ErrorKind {
    /// Returns whether an operation failing with this kind may succeed when
    /// attempted again.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::ExternalSourceUnavailable
                | Self::GenerationFailed
                | Self::StyleViolationUnresolved
                | Self::Timeout
        )
    }
}

/// A structured error type for seoflow capability operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new external source unavailable error.
    pub fn external_source_unavailable() -> Self {
        Self::new(ErrorKind::ExternalSourceUnavailable)
    }

    /// Creates a new generation failed error.
    pub fn generation_failed() -> Self {
        Self::new(ErrorKind::GenerationFailed)
    }

    /// Creates a new cache unavailable error.
    pub fn cache_unavailable() -> Self {
        Self::new(ErrorKind::CacheUnavailable)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns whether this error may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization()
            .with_message("failed to (de)serialize payload")
            .with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let error = Error::invalid_input().with_message("topic is blank");
        assert_eq!(error.to_string(), "InvalidInput: topic is blank");
        assert_eq!(error.kind_str(), "invalid_input");
    }

    #[test]
    fn test_display_without_message() {
        let error = Error::timeout();
        assert_eq!(error.to_string(), "Timeout");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::generation_failed().is_retryable());
        assert!(Error::timeout().is_retryable());
        assert!(!Error::invalid_input().is_retryable());
        assert!(!Error::cache_unavailable().is_retryable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::StyleViolationUnresolved).unwrap();
        assert_eq!(json, "\"style_violation_unresolved\"");
    }
}
