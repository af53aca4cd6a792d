//! Run persistence.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{PipelineRun, RunId};
use crate::{PipelineError, PipelineResult, TRACING_TARGET};

/// Storage for run state.
///
/// `save` replaces the whole run; implementations must never expose a
/// partially written run to `load`.
pub trait RunStore: Send + Sync {
    /// Stores the run, replacing any previous state.
    fn save(&self, run: &PipelineRun) -> PipelineResult<()>;

    /// Loads a run, or `None` if unknown.
    fn load(&self, id: &RunId) -> PipelineResult<Option<PipelineRun>>;

    /// Deletes a run, returning whether it existed.
    fn remove(&self, id: &RunId) -> PipelineResult<bool>;

    /// Lists the identifiers of all stored runs, oldest first.
    fn list(&self) -> PipelineResult<Vec<RunId>>;
}

/// In-process run store.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<RunId, PipelineRun>>,
}

impl MemoryRunStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for MemoryRunStore {
    fn save(&self, run: &PipelineRun) -> PipelineResult<()> {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run.id, run.clone());
        Ok(())
    }

    fn load(&self, id: &RunId) -> PipelineResult<Option<PipelineRun>> {
        Ok(self
            .runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }

    fn remove(&self, id: &RunId) -> PipelineResult<bool> {
        Ok(self
            .runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some())
    }

    fn list(&self) -> PipelineResult<Vec<RunId>> {
        let mut ids: Vec<RunId> = self
            .runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Run store keeping one JSON document per run under `{root}/{id}.json`.
#[derive(Debug, Clone)]
pub struct FileRunStore {
    root: PathBuf,
}

impl FileRunStore {
    /// Opens (and creates, if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> PipelineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error)?;

        tracing::debug!(
            target: TRACING_TARGET,
            root = %root.display(),
            "Opened file run store"
        );

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_path(&self, id: &RunId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl RunStore for FileRunStore {
    fn save(&self, run: &PipelineRun) -> PipelineResult<()> {
        let target = self.run_path(&run.id);
        let staging = self.root.join(format!(".{}.tmp", run.id));

        let contents = serde_json::to_vec_pretty(run)
            .map_err(|error| PipelineError::Internal(format!("failed to encode run: {error}")))?;
        let write = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(&contents)?;
            file.sync_all()
        });

        if let Err(error) = write.and_then(|()| fs::rename(&staging, &target)) {
            let _ = fs::remove_file(&staging);
            return Err(io_error(error));
        }

        Ok(())
    }

    fn load(&self, id: &RunId) -> PipelineResult<Option<PipelineRun>> {
        let contents = match fs::read(self.run_path(id)) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(error)),
        };

        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|error| PipelineError::Internal(format!("failed to decode run {id}: {error}")))
    }

    fn remove(&self, id: &RunId) -> PipelineResult<bool> {
        match fs::remove_file(self.run_path(id)) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(io_error(error)),
        }
    }

    fn list(&self) -> PipelineResult<Vec<RunId>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.root).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<RunId>().ok())
            else {
                continue;
            };
            ids.push(id);
        }

        ids.sort();
        Ok(ids)
    }
}

fn io_error(error: std::io::Error) -> PipelineError {
    PipelineError::CacheUnavailable(format!("run store: {error}"))
}

#[cfg(test)]
mod tests {
    use seoflow_core::types::PipelineRequest;

    use super::*;
    use crate::run::Stage;

    fn run() -> PipelineRun {
        PipelineRun::new(PipelineRequest::new("Farming", 800, ["hay"]))
    }

    fn exercise(store: &dyn RunStore) {
        let mut run = run();
        store.save(&run).unwrap();
        assert_eq!(store.load(&run.id).unwrap(), Some(run.clone()));

        run.stage = Stage::AnalyzingLandscape;
        store.save(&run).unwrap();
        assert_eq!(
            store.load(&run.id).unwrap().map(|run| run.stage),
            Some(Stage::AnalyzingLandscape)
        );
        assert_eq!(store.list().unwrap(), vec![run.id]);

        assert!(store.remove(&run.id).unwrap());
        assert!(!store.remove(&run.id).unwrap());
        assert!(store.load(&run.id).unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryRunStore::new());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRunStore::open(dir.path()).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_file_store_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRunStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("notes.json"), b"{}").unwrap();
        fs::write(dir.path().join("readme.txt"), b"").unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
