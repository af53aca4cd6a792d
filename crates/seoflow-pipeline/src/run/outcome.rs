//! Results reported to callers.

use seoflow_core::ErrorKind;
use seoflow_core::types::{FinalContent, Recommendation};
use serde::{Deserialize, Serialize};

use super::{RunArtifacts, RunError, RunId, Stage};

/// What a caller gets back for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Final content is available.
    Completed {
        /// Run identifier.
        run_id: RunId,
        /// Optimized article.
        final_content: FinalContent,
        /// Optimizer findings, applied or suggested.
        recommendations: Vec<Recommendation>,
        /// Whether stale or default data was used along the way.
        degraded: bool,
    },
    /// The run stopped with an error.
    Failed {
        /// Run identifier.
        run_id: RunId,
        /// Failure details.
        error: RunError,
        /// Artifacts produced before the failure.
        partial: RunArtifacts,
    },
    /// The run was cancelled. Stages finished before the cancellation keep
    /// their artifacts in the run state; the stage in flight was discarded.
    Cancelled {
        /// Run identifier.
        run_id: RunId,
        /// Latest stage that finished before cancellation.
        last_successful_stage: Option<Stage>,
    },
    /// The run is still executing.
    Pending {
        /// Run identifier.
        run_id: RunId,
        /// Current stage.
        stage: Stage,
    },
}

impl PipelineOutcome {
    /// Identifier of the run.
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Completed { run_id, .. }
            | Self::Failed { run_id, .. }
            | Self::Cancelled { run_id, .. }
            | Self::Pending { run_id, .. } => *run_id,
        }
    }

    /// Returns whether final content is available.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Final content, when completed.
    pub fn final_content(&self) -> Option<&FinalContent> {
        match self {
            Self::Completed { final_content, .. } => Some(final_content),
            _ => None,
        }
    }

    /// Recommendations, when completed.
    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            Self::Completed {
                recommendations, ..
            } => recommendations,
            _ => &[],
        }
    }

    /// Failure details, when failed.
    pub fn error(&self) -> Option<&RunError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Failure category, when failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|error| error.kind)
    }

    /// Returns whether the run completed on stale or default data.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Completed { degraded: true, .. })
    }
}
