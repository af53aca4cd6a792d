//! Runs: the persisted state of one pipeline invocation.
//!
//! A run moves through the [`Stage`] machine one transition at a time. Every
//! transition is persisted through a [`RunStore`] before the next stage
//! starts, which is what makes failed runs resumable from their last
//! successful stage.

mod outcome;
mod stage;
mod state;
mod store;

pub use outcome::PipelineOutcome;
pub use stage::{Stage, StageStatus};
pub use state::{PipelineRun, RunArtifacts, RunError, RunId};
pub use store::{FileRunStore, MemoryRunStore, RunStore};
