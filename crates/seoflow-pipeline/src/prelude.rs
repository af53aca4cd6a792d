//! Convenient re-exports for common use.

pub use crate::engine::Orchestrator;
pub use crate::run::{
    FileRunStore, MemoryRunStore, PipelineOutcome, PipelineRun, RunError, RunId, RunStore, Stage,
    StageStatus,
};
pub use crate::stage::{
    CompetitorSynthesizer, DraftBrief, DraftGenerator, LandscapeAnalyzer, SeoOptimizer,
    StyleAdapter,
};
pub use crate::{PipelineConfig, PipelineConfigBuilder, PipelineError, PipelineResult};
