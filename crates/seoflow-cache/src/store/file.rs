//! Directory-backed cache store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use seoflow_core::types::ArtifactKind;
use strum::IntoEnumIterator;

use super::CacheStore;
use crate::{CacheEntry, CacheKey, Result, TRACING_TARGET};

const EXTENSION: &str = "json";

/// A cache store that keeps one JSON document per entry under
/// `{root}/{kind}/{fingerprint}.json`.
///
/// Writes go to a uniquely named temporary file in the same directory which
/// is then renamed over the target, so readers observe either the old or the
/// new entry and never a partial one.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates, if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        tracing::debug!(
            target: TRACING_TARGET,
            root = %root.display(),
            "Opened file cache store"
        );

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.as_ref())
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.kind_dir(key.kind)
            .join(format!("{}.{EXTENSION}", key.fingerprint.as_str()))
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let contents = match fs::read(self.entry_path(key)) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        Ok(Some(serde_json::from_slice(&contents)?))
    }

    fn save(&self, entry: &CacheEntry) -> Result<()> {
        let key = entry.key();
        let dir = self.kind_dir(key.kind);
        fs::create_dir_all(&dir)?;

        let target = self.entry_path(&key);
        let staging = dir.join(format!(
            ".{}.{}.tmp",
            key.fingerprint.as_str(),
            uuid::Uuid::new_v4().simple()
        ));

        let contents = serde_json::to_vec_pretty(entry)?;
        let write = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(&contents)?;
            file.sync_all()
        });

        if let Err(error) = write.and_then(|()| fs::rename(&staging, &target)) {
            let _ = fs::remove_file(&staging);
            return Err(error.into());
        }

        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();

        for kind in ArtifactKind::iter() {
            let entries = match fs::read_dir(self.kind_dir(kind)) {
                Ok(entries) => entries,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => return Err(error.into()),
            };

            for dir_entry in entries {
                let path = dir_entry?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                    continue;
                }
                let Some(entry) = self.read_entry(&path) else {
                    continue;
                };
                keys.push(entry.key());
            }
        }

        keys.sort();
        Ok(keys)
    }
}

impl FileStore {
    /// Reads an entry file, skipping unreadable ones with a warning.
    fn read_entry(&self, path: &Path) -> Option<CacheEntry> {
        let parsed = fs::read(path)
            .map_err(crate::CacheError::from)
            .and_then(|contents| serde_json::from_slice(&contents).map_err(Into::into));

        match parsed {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    path = %path.display(),
                    error = %error,
                    "Skipping unreadable cache entry"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use seoflow_core::types::fingerprint;

    use super::*;

    fn entry(topic: &str, kind: ArtifactKind, payload: serde_json::Value) -> CacheEntry {
        let fp = fingerprint(&["hay"], topic, None, None).unwrap();
        CacheEntry::new(CacheKey::new(fp, kind), payload, Duration::from_secs(60))
    }

    #[test]
    fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let entry = entry("Farming", ArtifactKind::Landscape, serde_json::json!({"a": 1}));

        store.save(&entry).unwrap();

        let path = dir
            .path()
            .join("landscape")
            .join(format!("{}.json", entry.fingerprint.as_str()));
        assert!(path.exists());
        assert_eq!(store.load(&entry.key()).unwrap(), Some(entry));
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store
            .save(&entry("Farming", ArtifactKind::Draft, serde_json::json!("first")))
            .unwrap();
        let second = entry("Farming", ArtifactKind::Draft, serde_json::json!("second"));
        store.save(&second).unwrap();

        let loaded = store.load(&second.key()).unwrap().unwrap();
        assert_eq!(loaded.payload, serde_json::json!("second"));
        assert_eq!(store.keys().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let missing = entry("Nothing", ArtifactKind::Final, serde_json::json!(null));

        assert!(store.load(&missing.key()).unwrap().is_none());
        assert!(!store.remove(&missing.key()).unwrap());
    }

    #[test]
    fn test_keys_skip_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store
            .save(&entry("Farming", ArtifactKind::Competitor, serde_json::json!([])))
            .unwrap();
        fs::write(dir.path().join("competitor").join("broken.json"), b"{not json").unwrap();

        assert_eq!(store.keys().unwrap().len(), 1);
        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.keys().unwrap().is_empty());
    }
}
