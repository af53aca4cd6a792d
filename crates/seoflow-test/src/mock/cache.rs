//! Unreachable cache backend.

use seoflow_cache::{CacheEntry, CacheError, CacheKey, CacheStore, Result};

/// A cache store whose backend is always unreachable.
///
/// Every operation fails with [`CacheError::Unavailable`], so the pipeline
/// has to treat each lookup as a miss and carry on.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCacheStore;

impl CacheStore for FailingCacheStore {
    fn load(&self, _: &CacheKey) -> Result<Option<CacheEntry>> {
        Err(CacheError::unavailable("mock store is offline"))
    }

    fn save(&self, _: &CacheEntry) -> Result<()> {
        Err(CacheError::unavailable("mock store is offline"))
    }

    fn remove(&self, _: &CacheKey) -> Result<bool> {
        Err(CacheError::unavailable("mock store is offline"))
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        Err(CacheError::unavailable("mock store is offline"))
    }
}
