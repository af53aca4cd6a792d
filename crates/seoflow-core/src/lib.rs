#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for search lookups.
pub const TRACING_TARGET_SEARCH: &str = "seoflow_core::search";

/// Tracing target for generation calls.
pub const TRACING_TARGET_GENERATION: &str = "seoflow_core::generation";

mod error;

pub mod provider;
pub mod text;
pub mod types;

#[doc(hidden)]
pub mod prelude;

pub use error::{BoxedError, Error, ErrorKind, Result};
