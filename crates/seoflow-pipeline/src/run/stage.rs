//! Stage machine.

use seoflow_core::types::ArtifactKind;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};

/// Lifecycle state of a run.
///
/// Working stages run in declaration order. `Completed`, `Failed` and
/// `Cancelled` are terminal; a failed run may be resumed, which moves it
/// back into a working stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRefStr, IntoStaticStr, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Accepted, not yet started.
    Queued,
    /// Looking up and summarizing search results.
    AnalyzingLandscape,
    /// Comparing the brief against competitor content.
    SynthesizingCompetitors,
    /// Generating and validating the draft.
    Drafting,
    /// Rewriting the draft to the client voice.
    AdaptingStyle,
    /// Applying the SEO pass.
    Optimizing,
    /// Final content available.
    Completed,
    /// Stopped by an error.
    Failed,
    /// Stopped by the caller.
    Cancelled,
}

impl Stage {
    /// The five stages that do work, in execution order.
    pub const WORKING: [Stage; 5] = [
        Stage::AnalyzingLandscape,
        Stage::SynthesizingCompetitors,
        Stage::Drafting,
        Stage::AdaptingStyle,
        Stage::Optimizing,
    ];

    /// Returns whether no further transitions happen without a resume.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns whether this stage does work.
    pub fn is_working(self) -> bool {
        Self::WORKING.contains(&self)
    }

    /// Returns whether the stage waits on external capabilities.
    ///
    /// These stages enforce the stage deadline themselves and turn it into
    /// a recoverable error instead of [`PipelineError::Timeout`].
    ///
    /// [`PipelineError::Timeout`]: crate::PipelineError::Timeout
    pub fn calls_out(self) -> bool {
        matches!(
            self,
            Self::AnalyzingLandscape | Self::Drafting | Self::AdaptingStyle
        )
    }

    /// The stage that follows on success.
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Queued => Some(Self::AnalyzingLandscape),
            Self::AnalyzingLandscape => Some(Self::SynthesizingCompetitors),
            Self::SynthesizingCompetitors => Some(Self::Drafting),
            Self::Drafting => Some(Self::AdaptingStyle),
            Self::AdaptingStyle => Some(Self::Optimizing),
            Self::Optimizing => Some(Self::Completed),
            Self::Completed | Self::Failed | Self::Cancelled => None,
        }
    }

    /// Artifact the stage produces.
    pub fn artifact_kind(self) -> Option<ArtifactKind> {
        match self {
            Self::AnalyzingLandscape => Some(ArtifactKind::Landscape),
            Self::SynthesizingCompetitors => Some(ArtifactKind::Competitor),
            Self::Drafting => Some(ArtifactKind::Draft),
            Self::AdaptingStyle => Some(ArtifactKind::Adapted),
            Self::Optimizing => Some(ArtifactKind::Final),
            _ => None,
        }
    }

    /// Returns whether the machine allows moving from `self` to `to`.
    ///
    /// `Queued` may jump forward past stages satisfied from the cache, and a
    /// failed run may be resumed into `Queued` or any working stage.
    pub fn can_transition_to(self, to: Stage) -> bool {
        match (self, to) {
            (from, Self::Failed | Self::Cancelled) => !from.is_terminal(),
            (Self::Queued, to) => to.is_working() || to == Self::Completed,
            (Self::Failed, to) => to == Self::Queued || to.is_working(),
            (from, to) => from.next() == Some(to),
        }
    }
}

/// Per-stage progress within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not reached yet.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished and produced its artifact.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Satisfied from a live cache entry without running.
    SkippedViaCache,
}

impl StageStatus {
    /// Returns whether the stage's artifact is available.
    pub fn is_done(self) -> bool {
        matches!(self, Self::Succeeded | Self::SkippedViaCache)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_linear_progression() {
        let mut stage = Stage::Queued;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            assert!(stage.can_transition_to(next));
            stage = next;
            visited.push(stage);
        }
        assert_eq!(visited.len(), 7);
        assert_eq!(stage, Stage::Completed);
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Stage::AnalyzingLandscape.can_transition_to(Stage::Drafting));
        assert!(!Stage::Drafting.can_transition_to(Stage::AnalyzingLandscape));
        assert!(!Stage::Completed.can_transition_to(Stage::Failed));
        assert!(!Stage::Cancelled.can_transition_to(Stage::Queued));
        assert!(!Stage::Failed.can_transition_to(Stage::Completed));
    }

    #[test]
    fn test_cache_skip_and_resume() {
        assert!(Stage::Queued.can_transition_to(Stage::Drafting));
        assert!(Stage::Queued.can_transition_to(Stage::Completed));
        assert!(Stage::Failed.can_transition_to(Stage::Drafting));
        assert!(Stage::Optimizing.can_transition_to(Stage::Cancelled));
    }

    #[test]
    fn test_external_stages() {
        let external: Vec<Stage> = Stage::iter().filter(|stage| stage.calls_out()).collect();
        assert_eq!(
            external,
            vec![Stage::AnalyzingLandscape, Stage::Drafting, Stage::AdaptingStyle]
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::AnalyzingLandscape.to_string(), "analyzing_landscape");
        assert_eq!(StageStatus::SkippedViaCache.as_ref(), "skipped_via_cache");
        assert_eq!(
            serde_json::to_string(&Stage::SynthesizingCompetitors).unwrap(),
            "\"synthesizing_competitors\""
        );
    }
}
