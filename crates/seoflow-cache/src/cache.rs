//! Typed result cache used by the pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use seoflow_core::types::{ArtifactKind, Fingerprint};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{CacheEntry, CacheKey, CacheStore, MemoryStore, Result, TRACING_TARGET};

/// A payload read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<T> {
    /// Deserialized payload.
    pub value: T,
    /// When the entry was written.
    pub created_at: Timestamp,
    /// Whether the entry had outlived its TTL when read.
    pub expired: bool,
}

/// Fingerprint-keyed cache of stage artifacts.
///
/// Lookups are pure reads and a miss is a normal outcome. [`get`] never
/// returns expired entries; [`get_stale`] exists for degraded fallbacks.
/// Store failures are logged and reported as misses, so an unreachable store
/// only costs recomputation.
///
/// [`get`]: ResultCache::get
/// [`get_stale`]: ResultCache::get_stale
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache").finish_non_exhaustive()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ResultCache {
    /// Creates a cache over the given store.
    pub fn new<S>(store: S) -> Self
    where
        S: CacheStore + 'static,
    {
        Self {
            store: Arc::new(store),
        }
    }

    /// Creates a cache over an already shared store.
    pub fn from_shared(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Creates a cache backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Returns a live (non-expired) payload, or `None` on a miss.
    pub fn get<T>(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> Option<CachedValue<T>>
    where
        T: DeserializeOwned,
    {
        match self.try_get(fingerprint, kind) {
            Ok(value) => value.filter(|cached| !cached.expired),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    fingerprint = %fingerprint.short(),
                    kind = kind.as_ref(),
                    error = %error,
                    "Cache lookup failed, treating as miss"
                );
                None
            }
        }
    }

    /// Returns a payload even if it has expired.
    pub fn get_stale<T>(
        &self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
    ) -> Option<CachedValue<T>>
    where
        T: DeserializeOwned,
    {
        self.try_get(fingerprint, kind).ok().flatten()
    }

    /// Reads an entry, surfacing store and decoding errors.
    pub fn try_get<T>(
        &self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
    ) -> Result<Option<CachedValue<T>>>
    where
        T: DeserializeOwned,
    {
        let key = CacheKey::new(fingerprint.clone(), kind);
        let Some(entry) = self.store.load(&key)? else {
            tracing::debug!(
                target: TRACING_TARGET,
                key = %key,
                cache_hit = false,
                "Cache miss"
            );
            return Ok(None);
        };

        let expired = entry.is_expired();
        let value = serde_json::from_value(entry.payload)?;

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            cache_hit = !expired,
            expired,
            "Cache entry found"
        );

        Ok(Some(CachedValue {
            value,
            created_at: entry.created_at,
            expired,
        }))
    }

    /// Writes a payload with the given TTL, superseding any previous entry.
    pub fn put<T>(
        &self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
        value: &T,
        ttl: Duration,
    ) -> Result<()>
    where
        T: Serialize,
    {
        let key = CacheKey::new(fingerprint.clone(), kind);
        let payload = serde_json::to_value(value)?;
        self.store.save(&CacheEntry::new(key.clone(), payload, ttl))?;

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            ttl_secs = ttl.as_secs(),
            "Cached value"
        );
        Ok(())
    }

    /// Removes one entry, returning whether it existed.
    pub fn invalidate(&self, fingerprint: &Fingerprint, kind: ArtifactKind) -> Result<bool> {
        self.store
            .remove(&CacheKey::new(fingerprint.clone(), kind))
    }

    /// Removes every entry, returning how many were removed.
    pub fn invalidate_all(&self) -> Result<usize> {
        let removed = self.store.clear()?;
        tracing::info!(
            target: TRACING_TARGET,
            removed,
            "Cleared cache"
        );
        Ok(removed)
    }

    /// Removes expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired(Timestamp::now())?;
        tracing::info!(
            target: TRACING_TARGET,
            removed,
            "Purged expired cache entries"
        );
        Ok(removed)
    }
}
