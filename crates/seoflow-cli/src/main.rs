#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;

use std::process;

use seoflow_core::provider::Capabilities;
use seoflow_pipeline::prelude::Orchestrator;
use seoflow_test::{MockGenerator, MockReferenceStore};

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "seoflow_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "seoflow_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "seoflow_cli::config";
pub const TRACING_TARGET_RUN: &str = "seoflow_cli::run";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    Cli::init_tracing();
    cli.log();

    let orchestrator = create_orchestrator(&cli)?;
    cli.command.execute(&orchestrator).await
}

/// Wires the configured storage and offline capabilities into an orchestrator.
fn create_orchestrator(cli: &Cli) -> anyhow::Result<Orchestrator> {
    let capabilities = Capabilities::new(
        cli.mock.search_source(),
        MockGenerator::new(),
        cli.storage.style_store()?,
        MockReferenceStore::new(),
    );

    Ok(Orchestrator::with_run_store(
        cli.pipeline.to_config()?,
        capabilities,
        cli.storage.cache()?,
        cli.storage.run_store()?,
    ))
}
