//! Cache entries and keys.

use std::fmt;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use seoflow_core::types::{ArtifactKind, Fingerprint};
use serde::{Deserialize, Serialize};

/// Address of a cache entry: a fingerprint within an artifact namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Input fingerprint.
    pub fingerprint: Fingerprint,
    /// Artifact namespace.
    pub kind: ArtifactKind,
}

impl CacheKey {
    /// Creates a key.
    pub fn new(fingerprint: Fingerprint, kind: ArtifactKind) -> Self {
        Self { fingerprint, kind }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.fingerprint.short())
    }
}

/// A stored payload. Entries are immutable; a newer write for the same key
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Input fingerprint.
    pub fingerprint: Fingerprint,
    /// Artifact namespace.
    pub kind: ArtifactKind,
    /// Serialized artifact payload.
    pub payload: serde_json::Value,
    /// When the entry was written.
    pub created_at: Timestamp,
    /// Time to live in milliseconds.
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(key: CacheKey, payload: serde_json::Value, ttl: Duration) -> Self {
        Self {
            fingerprint: key.fingerprint,
            kind: key.kind,
            payload,
            created_at: Timestamp::now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns the entry's key.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.fingerprint.clone(), self.kind)
    }

    /// Time to live.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Age of the entry at `now`.
    pub fn age_at(&self, now: Timestamp) -> SignedDuration {
        now.duration_since(self.created_at)
    }

    /// Returns whether the entry has outlived its TTL at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        let age = self.age_at(now);
        let ttl = SignedDuration::from_millis(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX));
        age > ttl
    }

    /// Returns whether the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }
}
