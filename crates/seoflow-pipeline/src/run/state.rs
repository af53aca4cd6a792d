//! Run state.

use std::collections::BTreeMap;
use std::str::FromStr;

use derive_more::{Display, From, Into};
use jiff::Timestamp;
use seoflow_core::ErrorKind;
use seoflow_core::types::{
    AdaptedDraft, Artifact, ArtifactKind, CompetitorInsight, Draft, FinalContent,
    LandscapeResult, PipelineRequest, Recommendation, Timing, UnmetConstraint,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PipelineOutcome, Stage, StageStatus};
use crate::PipelineError;

/// Unique, time-ordered run identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Artifacts a run has produced or retrieved so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunArtifacts {
    /// Landscape signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landscape: Option<Artifact<LandscapeResult>>,
    /// Competitor insight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor: Option<Artifact<CompetitorInsight>>,
    /// Validated draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Artifact<Draft>>,
    /// Style-adapted draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapted: Option<Artifact<AdaptedDraft>>,
    /// Optimized content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_content: Option<Artifact<FinalContent>>,
    /// Optimizer findings, applied or suggested.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl RunArtifacts {
    /// Drops the artifact of one kind.
    pub fn discard(&mut self, kind: ArtifactKind) {
        match kind {
            ArtifactKind::Landscape => self.landscape = None,
            ArtifactKind::Competitor => self.competitor = None,
            ArtifactKind::Draft => self.draft = None,
            ArtifactKind::Adapted => self.adapted = None,
            ArtifactKind::Final => {
                self.final_content = None;
                self.recommendations.clear();
            }
        }
    }

    /// Returns whether the artifact of one kind is present.
    pub fn contains(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Landscape => self.landscape.is_some(),
            ArtifactKind::Competitor => self.competitor.is_some(),
            ArtifactKind::Draft => self.draft.is_some(),
            ArtifactKind::Adapted => self.adapted.is_some(),
            ArtifactKind::Final => self.final_content.is_some(),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Stage that failed.
    pub stage: Stage,
    /// Latest stage whose artifact is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_stage: Option<Stage>,
    /// Constraints the best draft failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmet: Vec<UnmetConstraint>,
    /// Closest draft produced before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_draft: Option<Draft>,
    /// Prohibited terms that could not be removed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_terms: Vec<String>,
}

impl RunError {
    /// Describes `error` raised at `stage`.
    pub fn new(error: &PipelineError, stage: Stage, last_successful_stage: Option<Stage>) -> Self {
        let mut run_error = Self {
            kind: error.kind(),
            message: error.to_string(),
            stage,
            last_successful_stage,
            unmet: Vec::new(),
            best_draft: None,
            unresolved_terms: Vec::new(),
        };

        match error {
            PipelineError::ConstraintUnsatisfied { best_draft, unmet } => {
                run_error.unmet = unmet.clone();
                run_error.best_draft = Some(best_draft.as_ref().clone());
            }
            PipelineError::StyleViolationUnresolved { terms } => {
                run_error.unresolved_terms = terms.clone();
            }
            _ => {}
        }

        run_error
    }
}

/// Persisted state of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Run identifier.
    pub id: RunId,
    /// The request being fulfilled.
    pub request: PipelineRequest,
    /// Current stage.
    pub stage: Stage,
    /// Progress of each working stage.
    pub statuses: BTreeMap<Stage, StageStatus>,
    /// Artifacts produced so far.
    #[serde(default)]
    pub artifacts: RunArtifacts,
    /// Whether any artifact came from stale or default data.
    #[serde(default)]
    pub degraded: bool,
    /// Failure details when the run is in `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    /// Wall-clock timing of each executed stage.
    #[serde(default)]
    pub timings: BTreeMap<Stage, Timing>,
    /// When the run was accepted.
    pub created_at: Timestamp,
    /// When the run last changed.
    pub updated_at: Timestamp,
}

impl PipelineRun {
    /// Creates a queued run.
    pub fn new(request: PipelineRequest) -> Self {
        let now = Timestamp::now();
        Self {
            id: RunId::new(),
            request,
            stage: Stage::Queued,
            statuses: Stage::WORKING
                .iter()
                .map(|stage| (*stage, StageStatus::Pending))
                .collect(),
            artifacts: RunArtifacts::default(),
            degraded: false,
            error: None,
            timings: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Status of a working stage.
    pub fn status(&self, stage: Stage) -> StageStatus {
        self.statuses.get(&stage).copied().unwrap_or_default()
    }

    /// Sets the status of a working stage.
    pub fn set_status(&mut self, stage: Stage, status: StageStatus) {
        if stage.is_working() {
            self.statuses.insert(stage, status);
            self.updated_at = Timestamp::now();
        }
    }

    /// Latest working stage whose artifact is available.
    pub fn last_successful_stage(&self) -> Option<Stage> {
        Stage::WORKING
            .iter()
            .rev()
            .copied()
            .find(|stage| self.status(*stage).is_done())
    }

    /// Stage a resumed run restarts from.
    ///
    /// Runs that never got past validation restart from `Queued`; otherwise
    /// the first working stage without an available artifact.
    pub fn resume_stage(&self) -> Stage {
        if self
            .error
            .as_ref()
            .is_some_and(|error| error.stage == Stage::Queued)
        {
            return Stage::Queued;
        }

        Stage::WORKING
            .iter()
            .copied()
            .find(|stage| !self.status(*stage).is_done())
            .unwrap_or(Stage::Completed)
    }

    /// Returns whether the run reached a terminal stage.
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// The result as reported to callers.
    pub fn outcome(&self) -> PipelineOutcome {
        match self.stage {
            Stage::Completed => match &self.artifacts.final_content {
                Some(final_content) => PipelineOutcome::Completed {
                    run_id: self.id,
                    final_content: final_content.payload.clone(),
                    recommendations: self.artifacts.recommendations.clone(),
                    degraded: self.degraded,
                },
                None => PipelineOutcome::Failed {
                    run_id: self.id,
                    error: RunError::new(
                        &PipelineError::Internal("completed run has no final content".into()),
                        Stage::Optimizing,
                        self.last_successful_stage(),
                    ),
                    partial: self.artifacts.clone(),
                },
            },
            Stage::Failed => PipelineOutcome::Failed {
                run_id: self.id,
                error: self.error.clone().unwrap_or_else(|| {
                    RunError::new(
                        &PipelineError::Internal("failed run has no error".into()),
                        self.stage,
                        self.last_successful_stage(),
                    )
                }),
                partial: self.artifacts.clone(),
            },
            Stage::Cancelled => PipelineOutcome::Cancelled {
                run_id: self.id,
                last_successful_stage: self.last_successful_stage(),
            },
            stage => PipelineOutcome::Pending {
                run_id: self.id,
                stage,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> PipelineRun {
        PipelineRun::new(PipelineRequest::new("Farming", 800, ["hay"]))
    }

    #[test]
    fn test_new_run_is_queued() {
        let run = run();
        assert_eq!(run.stage, Stage::Queued);
        assert_eq!(run.statuses.len(), 5);
        assert_eq!(run.last_successful_stage(), None);
        assert_eq!(run.resume_stage(), Stage::AnalyzingLandscape);
        assert!(matches!(run.outcome(), PipelineOutcome::Pending { .. }));
    }

    #[test]
    fn test_resume_after_drafting_failure() {
        let mut run = run();
        run.set_status(Stage::AnalyzingLandscape, StageStatus::SkippedViaCache);
        run.set_status(Stage::SynthesizingCompetitors, StageStatus::Succeeded);
        run.set_status(Stage::Drafting, StageStatus::Failed);
        run.stage = Stage::Failed;
        run.error = Some(RunError::new(
            &PipelineError::GenerationFailed("empty".into()),
            Stage::Drafting,
            run.last_successful_stage(),
        ));

        assert_eq!(run.last_successful_stage(), Some(Stage::SynthesizingCompetitors));
        assert_eq!(run.resume_stage(), Stage::Drafting);
        assert_eq!(run.outcome().error_kind(), Some(ErrorKind::GenerationFailed));
    }

    #[test]
    fn test_validation_failure_resumes_from_queued() {
        let mut run = run();
        run.stage = Stage::Failed;
        run.error = Some(RunError::new(
            &PipelineError::InvalidInput("blank".into()),
            Stage::Queued,
            None,
        ));
        assert_eq!(run.resume_stage(), Stage::Queued);
    }

    #[test]
    fn test_run_error_carries_details() {
        let error = PipelineError::StyleViolationUnresolved {
            terms: vec!["cheap".into()],
        };
        let run_error = RunError::new(&error, Stage::AdaptingStyle, Some(Stage::Drafting));
        assert_eq!(run_error.kind, ErrorKind::StyleViolationUnresolved);
        assert_eq!(run_error.unresolved_terms, vec!["cheap".to_owned()]);
        assert!(run_error.best_draft.is_none());
    }

    #[test]
    fn test_run_serde_roundtrip() {
        let mut run = run();
        run.set_status(Stage::AnalyzingLandscape, StageStatus::Succeeded);
        let json = serde_json::to_string(&run).unwrap();
        let decoded: PipelineRun = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, run);
    }

    #[test]
    fn test_run_id_parse() {
        let id = RunId::new();
        assert_eq!(id.to_string().parse::<RunId>().unwrap(), id);
    }
}
