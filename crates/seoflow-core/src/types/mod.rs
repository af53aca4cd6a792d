//! Data model shared by every pipeline stage.

mod artifact;
mod competitor;
mod content;
mod fingerprint;
mod landscape;
mod request;
mod style;
mod timing;

pub use artifact::{Artifact, ArtifactKind, Origin};
pub use competitor::{CompetitorDocument, CompetitorInsight, Insight, SNIPPET_LENGTH};
pub use content::{
    AdaptedDraft, Draft, FinalContent, Recommendation, RecommendationKind, UnmetConstraint,
};
pub use fingerprint::{Fingerprint, FingerprintBuilder, fingerprint};
pub use landscape::{
    HeadingPattern, KeywordAnalysis, KeywordBand, KeywordStatus, LandscapeResult, LengthProfile,
    LinkPattern, RankedResult,
};
pub use request::{
    ClientRef, ContentType, MAX_TARGET_LENGTH, MIN_TARGET_LENGTH, PipelineRequest,
    StyleProfileRef, Tone,
};
pub use style::StyleProfile;
pub use timing::Timing;
