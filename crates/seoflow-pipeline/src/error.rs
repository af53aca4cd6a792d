//! Pipeline error types.

use seoflow_core::ErrorKind;
use seoflow_core::types::{Draft, UnmetConstraint};
use thiserror::Error;

use crate::run::{RunId, Stage};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while running the pipeline.
///
/// Errors are cloneable so that a single failed computation can be handed to
/// every caller coalesced onto it.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Request inputs are malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The search source could not be reached for any keyword.
    #[error("external source unavailable: {0}")]
    ExternalSourceUnavailable(String),

    /// The generative capability errored, timed out or returned nothing.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The draft still violates hard constraints after all regenerations.
    #[error(
        "draft constraints unsatisfied after {} attempts: {}",
        best_draft.attempt,
        unmet.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    ConstraintUnsatisfied {
        /// Closest draft produced.
        best_draft: Box<Draft>,
        /// Constraints the best draft fails.
        unmet: Vec<UnmetConstraint>,
    },

    /// Prohibited terms could not be removed without breaking invariants.
    #[error("prohibited terms could not be removed: {}", terms.join(", "))]
    StyleViolationUnresolved {
        /// Terms still present.
        terms: Vec<String>,
    },

    /// The cache or run store could not be reached.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A stage exceeded its deadline.
    #[error("stage {stage} timed out")]
    Timeout {
        /// Stage that timed out.
        stage: Stage,
    },

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,

    /// No run with the given id is known.
    #[error("run {0} not found")]
    RunNotFound(RunId),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Category reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ExternalSourceUnavailable(_) => ErrorKind::ExternalSourceUnavailable,
            Self::GenerationFailed(_) => ErrorKind::GenerationFailed,
            Self::ConstraintUnsatisfied { .. } => ErrorKind::ConstraintUnsatisfied,
            Self::StyleViolationUnresolved { .. } => ErrorKind::StyleViolationUnresolved,
            Self::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::RunNotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<seoflow_core::Error> for PipelineError {
    fn from(error: seoflow_core::Error) -> Self {
        let message = error
            .message
            .clone()
            .unwrap_or_else(|| error.kind_str().to_owned());

        match error.kind() {
            ErrorKind::InvalidInput => Self::InvalidInput(message),
            ErrorKind::ExternalSourceUnavailable => Self::ExternalSourceUnavailable(message),
            ErrorKind::GenerationFailed => Self::GenerationFailed(message),
            ErrorKind::CacheUnavailable => Self::CacheUnavailable(message),
            ErrorKind::Cancelled => Self::Cancelled,
            _ => Self::Internal(error.to_string()),
        }
    }
}

impl From<seoflow_cache::CacheError> for PipelineError {
    fn from(error: seoflow_cache::CacheError) -> Self {
        Self::CacheUnavailable(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_conversion() {
        let error = seoflow_core::Error::invalid_input().with_message("topic must not be blank");
        let error = PipelineError::from(error);
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert_eq!(error.to_string(), "invalid input: topic must not be blank");

        let error = PipelineError::from(seoflow_core::Error::serialization());
        assert_eq!(error.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_constraint_display() {
        let error = PipelineError::ConstraintUnsatisfied {
            best_draft: Box::new(Draft::new("# T", 3)),
            unmet: vec![UnmetConstraint::MissingTitle],
        };
        assert_eq!(
            error.to_string(),
            "draft constraints unsatisfied after 3 attempts: missing H1 title"
        );
        assert_eq!(error.kind(), ErrorKind::ConstraintUnsatisfied);
    }
}
