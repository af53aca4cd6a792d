//! Pipeline orchestration.
//!
//! This module provides the run driver:
//! - [`Orchestrator`]: Executes, submits, resumes and cancels pipeline runs
//!
//! A run moves through the stage machine in [`Stage`] order. Every
//! transition is persisted to the [`RunStore`] before the next stage starts,
//! stage artifacts are read from and written to the result cache by
//! fingerprint, and concurrent runs over the same fingerprint share a single
//! landscape lookup and a single draft generation.
//!
//! [`Stage`]: crate::run::Stage
//! [`RunStore`]: crate::run::RunStore

mod context;
mod executor;
mod orchestrator;

pub use orchestrator::Orchestrator;
