//! Cache, run and profile storage arguments.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use seoflow_cache::{FileStore, ResultCache};
use seoflow_core::types::StyleProfile;
use seoflow_pipeline::run::{FileRunStore, MemoryRunStore, RunStore};
use seoflow_test::MockStyleStore;

use crate::TRACING_TARGET_CONFIG;

/// Where results, runs and style profiles live.
///
/// Without directories, everything is kept in memory for the lifetime of the
/// process.
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Directory of the file-backed result cache.
    #[arg(long, env = "SEOFLOW_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory where run state is persisted.
    #[arg(long, env = "SEOFLOW_RUN_DIR")]
    pub run_dir: Option<PathBuf>,

    /// JSON file mapping style profile names to profiles.
    #[arg(long, env = "SEOFLOW_PROFILES")]
    pub profiles: Option<PathBuf>,
}

impl StorageArgs {
    /// Opens the result cache.
    pub fn cache(&self) -> anyhow::Result<ResultCache> {
        match &self.cache_dir {
            Some(dir) => {
                let store = FileStore::open(dir)
                    .with_context(|| format!("failed to open cache at {}", dir.display()))?;
                Ok(ResultCache::new(store))
            }
            None => Ok(ResultCache::in_memory()),
        }
    }

    /// Opens the run store.
    pub fn run_store(&self) -> anyhow::Result<Arc<dyn RunStore>> {
        match &self.run_dir {
            Some(dir) => {
                let store = FileRunStore::open(dir)
                    .with_context(|| format!("failed to open run store at {}", dir.display()))?;
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(MemoryRunStore::new())),
        }
    }

    /// Loads the style profiles file into a store.
    pub fn style_store(&self) -> anyhow::Result<MockStyleStore> {
        let Some(path) = &self.profiles else {
            return Ok(MockStyleStore::new());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read style profiles from {}", path.display()))?;
        let profiles: BTreeMap<String, StyleProfile> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid style profiles in {}", path.display()))?;

        Ok(profiles
            .into_iter()
            .fold(MockStyleStore::new(), |store, (name, profile)| {
                store.with_profile(name, profile)
            }))
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            cache_dir = ?self.cache_dir,
            run_dir = ?self.run_dir,
            profiles = ?self.profiles,
            "Storage configuration"
        );
    }
}
