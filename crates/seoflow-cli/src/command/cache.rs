//! The `cache` subcommand.

use clap::Subcommand;
use seoflow_cache::ResultCache;
use serde_json::json;

use super::print_json;

/// Result cache maintenance.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum CacheCommand {
    /// Remove expired entries.
    Purge,
    /// Remove every entry.
    Clear,
}

impl CacheCommand {
    /// Runs the maintenance action and prints how many entries were removed.
    pub fn execute(self, cache: &ResultCache) -> anyhow::Result<()> {
        let removed = match self {
            Self::Purge => cache.purge_expired()?,
            Self::Clear => cache.invalidate_all()?,
        };
        print_json(&json!({ "removed": removed }))
    }
}
