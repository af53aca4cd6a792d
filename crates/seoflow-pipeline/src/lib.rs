#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
pub mod engine;
mod error;
mod retry;
pub mod run;
pub mod stage;

#[doc(hidden)]
pub mod prelude;

pub use config::{PipelineConfig, PipelineConfigBuilder, PipelineConfigBuilderError};
pub use error::{PipelineError, PipelineResult};
pub use retry::{Relax, RetryPolicy};

/// Tracing target for orchestration.
pub const TRACING_TARGET: &str = "seoflow_pipeline";

/// Tracing target for individual stages.
pub const TRACING_TARGET_STAGE: &str = "seoflow_pipeline::stage";
