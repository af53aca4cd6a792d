//! Storage backends for cache entries.
//!
//! Stores are synchronous: cache reads and writes never suspend the pipeline.
//! Every backend replaces entries atomically, so concurrent writers for the
//! same key resolve to last-write-wins without torn entries.

mod file;
mod memory;

use jiff::Timestamp;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;
use crate::{CacheEntry, CacheKey, Result};

/// A keyed store of cache entries.
pub trait CacheStore: Send + Sync {
    /// Loads an entry regardless of expiry.
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Writes an entry, replacing any previous one for the same key.
    fn save(&self, entry: &CacheEntry) -> Result<()>;

    /// Removes an entry, returning whether one existed.
    fn remove(&self, key: &CacheKey) -> Result<bool>;

    /// Lists the keys of every stored entry.
    fn keys(&self) -> Result<Vec<CacheKey>>;

    /// Removes every entry, returning how many were removed.
    fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Removes entries expired at `now`, returning how many were removed.
    fn purge_expired(&self, now: Timestamp) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            let Some(entry) = self.load(&key)? else {
                continue;
            };
            if entry.is_expired_at(now) && self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
