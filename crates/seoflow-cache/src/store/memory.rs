//! In-process cache store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::CacheStore;
use crate::{CacheEntry, CacheKey, Result};

/// A cache store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, entry: &CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.key(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<CacheKey> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jiff::{SignedDuration, Timestamp};
    use seoflow_core::types::{ArtifactKind, fingerprint};

    use super::*;

    fn key(topic: &str, kind: ArtifactKind) -> CacheKey {
        CacheKey::new(fingerprint(&["hay"], topic, None, None).unwrap(), kind)
    }

    #[test]
    fn test_save_load_remove() {
        let store = MemoryStore::new();
        let entry = CacheEntry::new(
            key("Farming", ArtifactKind::Draft),
            serde_json::json!("body"),
            Duration::from_secs(60),
        );

        store.save(&entry).unwrap();
        assert_eq!(store.load(&entry.key()).unwrap(), Some(entry.clone()));
        assert!(store.remove(&entry.key()).unwrap());
        assert!(!store.remove(&entry.key()).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_kinds_are_namespaced() {
        let store = MemoryStore::new();
        let draft = key("Farming", ArtifactKind::Draft);
        let final_key = key("Farming", ArtifactKind::Final);
        store
            .save(&CacheEntry::new(draft.clone(), serde_json::json!(1), Duration::from_secs(60)))
            .unwrap();

        assert!(store.load(&draft).unwrap().is_some());
        assert!(store.load(&final_key).unwrap().is_none());
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStore::new();
        let short = CacheEntry::new(
            key("Short", ArtifactKind::Landscape),
            serde_json::json!(1),
            Duration::from_secs(1),
        );
        let long = CacheEntry::new(
            key("Long", ArtifactKind::Landscape),
            serde_json::json!(2),
            Duration::from_secs(3600),
        );
        store.save(&short).unwrap();
        store.save(&long).unwrap();

        let later = Timestamp::now() + SignedDuration::from_secs(10);
        assert_eq!(store.purge_expired(later).unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.load(&long.key()).unwrap().is_some());
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        for topic in ["A", "B", "C"] {
            store
                .save(&CacheEntry::new(
                    key(topic, ArtifactKind::Final),
                    serde_json::json!(topic),
                    Duration::from_secs(60),
                ))
                .unwrap();
        }
        assert_eq!(store.clear().unwrap(), 3);
        assert!(store.is_empty());
    }
}
