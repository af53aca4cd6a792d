//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── command: Command            # run, resume, status, cache
//! ├── pipeline: PipelineArgs      # concurrency, timeouts, bands, TTLs
//! ├── storage: StorageArgs        # cache and run directories, profiles
//! └── mock: MockConfig            # offline search behaviour
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod pipeline;
mod storage;

use std::process;

use clap::Parser;
pub use pipeline::PipelineArgs;
use seoflow_test::MockConfig;
pub use storage::StorageArgs;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::command::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "seoflow")]
#[command(about = "SEO content pipeline")]
#[command(version)]
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline tuning.
    #[clap(flatten)]
    pub pipeline: PipelineArgs,

    /// Cache, run and profile storage.
    #[clap(flatten)]
    pub storage: StorageArgs,

    /// Offline capability behaviour.
    #[clap(flatten)]
    pub mock: MockConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments, so its values
    /// act as defaults for every `env`-backed option.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs go to stderr; stdout carries the JSON results.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs configuration at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.pipeline.log();
        self.storage.log();

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            results_per_keyword = self.mock.results_per_keyword,
            search_latency_ms = self.mock.search_latency_ms,
            search_unavailable = self.mock.search_unavailable,
            "Offline capability configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "seoflow",
            "--max-concurrent-runs",
            "2",
            "run",
            "--topic",
            "Compact Tractors",
            "--length",
            "900",
            "--keyword",
            "compact tractors",
            "--keyword",
            "hay",
            "--force-refresh",
        ])
        .unwrap();

        assert_eq!(cli.pipeline.max_concurrent_runs, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.keywords, vec!["compact tractors", "hay"]);
        assert_eq!(args.length, 900);
        assert!(args.force_refresh);
    }
}
