//! Subcommands.

mod cache;
mod run;

pub use cache::CacheCommand;
use clap::Subcommand;
pub use run::RunArgs;
use seoflow_pipeline::prelude::{Orchestrator, PipelineOutcome, RunId};

/// Top-level subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Produce one optimized article.
    Run(RunArgs),
    /// Continue a failed or interrupted run from its last completed stage.
    Resume {
        /// Identifier of the run.
        run_id: RunId,
    },
    /// Show the current state of a run.
    Status {
        /// Identifier of the run.
        run_id: RunId,
    },
    /// List persisted runs.
    Runs,
    /// Result cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

impl Command {
    /// Executes the subcommand, writing its result to stdout as JSON.
    pub async fn execute(self, orchestrator: &Orchestrator) -> anyhow::Result<()> {
        match self {
            Self::Run(args) => {
                let outcome = args.execute(orchestrator).await?;
                report(&outcome)
            }
            Self::Resume { run_id } => {
                let outcome = orchestrator.resume(&run_id).await?;
                report(&outcome)
            }
            Self::Status { run_id } => print_json(&orchestrator.status(&run_id)?),
            Self::Runs => print_json(&orchestrator.runs()?),
            Self::Cache { action } => action.execute(orchestrator.cache()),
        }
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the outcome and turns a failed run into a non-zero exit.
fn report(outcome: &PipelineOutcome) -> anyhow::Result<()> {
    print_json(outcome)?;
    match outcome {
        PipelineOutcome::Failed { run_id, error, .. } => anyhow::bail!(
            "run {run_id} failed at {}: {}",
            error.stage,
            error.message
        ),
        PipelineOutcome::Cancelled { run_id, .. } => anyhow::bail!("run {run_id} was cancelled"),
        _ => Ok(()),
    }
}
