#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for cache operations.
pub const TRACING_TARGET: &str = "seoflow_cache";

mod cache;
mod entry;
mod error;
mod flight;
mod store;

pub use cache::{CachedValue, ResultCache};
pub use entry::{CacheEntry, CacheKey};
pub use error::{CacheError, Result};
pub use flight::{Flight, SingleFlight};
pub use store::{CacheStore, FileStore, MemoryStore};
