//! Convenient re-exports for common use.

pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::provider::{
    Capabilities, GenerationConstraints, GenerationService, GenerativeCapability, Prompt,
    ReferenceStore, SearchService, SearchSource, StyleStore,
};
pub use crate::types::{
    AdaptedDraft, Artifact, ArtifactKind, CompetitorDocument, CompetitorInsight, ContentType,
    Draft, FinalContent, Fingerprint, LandscapeResult, Origin, PipelineRequest, RankedResult,
    Recommendation, StyleProfile, Tone,
};
