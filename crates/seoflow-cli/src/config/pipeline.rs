//! Pipeline tuning arguments.

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use seoflow_pipeline::PipelineConfig;

use crate::TRACING_TARGET_CONFIG;

/// Pipeline tuning, mapped onto [`PipelineConfig`].
#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// Maximum number of concurrently executing runs.
    #[arg(long, env = "SEOFLOW_MAX_CONCURRENT_RUNS", default_value = "10")]
    pub max_concurrent_runs: usize,

    /// Maximum number of concurrent keyword lookups within one run.
    #[arg(long, env = "SEOFLOW_SEARCH_CONCURRENCY", default_value = "4")]
    pub search_concurrency: usize,

    /// Deadline for a single keyword lookup, in seconds.
    #[arg(long, env = "SEOFLOW_SEARCH_TIMEOUT_SECS", default_value = "20")]
    pub search_timeout_secs: u64,

    /// Deadline for a single generation call, in seconds.
    #[arg(long, env = "SEOFLOW_GENERATION_TIMEOUT_SECS", default_value = "120")]
    pub generation_timeout_secs: u64,

    /// Deadline for a whole stage, in seconds.
    #[arg(long, env = "SEOFLOW_STAGE_TIMEOUT_SECS", default_value = "600")]
    pub stage_timeout_secs: u64,

    /// Allowed relative deviation from the target length.
    #[arg(long, env = "SEOFLOW_LENGTH_TOLERANCE", default_value = "0.15")]
    pub length_tolerance: f64,

    /// Lower bound of the keyword density band, in percent.
    #[arg(long, env = "SEOFLOW_DENSITY_MIN", default_value = "1.0")]
    pub density_min: f64,

    /// Upper bound of the keyword density band, in percent.
    #[arg(long, env = "SEOFLOW_DENSITY_MAX", default_value = "2.0")]
    pub density_max: f64,

    /// Retries of a stage after a generation or style failure.
    #[arg(long, env = "SEOFLOW_STAGE_RETRIES", default_value = "1")]
    pub stage_retries: u32,

    /// Time to live of landscape results, in hours.
    #[arg(long, env = "SEOFLOW_LANDSCAPE_TTL_HOURS", default_value = "24")]
    pub landscape_ttl_hours: u64,

    /// Time to live of drafts and final content, in hours.
    #[arg(long, env = "SEOFLOW_CONTENT_TTL_HOURS", default_value = "168")]
    pub content_ttl_hours: u64,
}

impl PipelineArgs {
    /// Builds and validates the pipeline configuration.
    pub fn to_config(&self) -> anyhow::Result<PipelineConfig> {
        PipelineConfig::builder()
            .max_concurrent_runs(self.max_concurrent_runs)
            .search_concurrency(self.search_concurrency)
            .search_timeout(Duration::from_secs(self.search_timeout_secs))
            .generation_timeout(Duration::from_secs(self.generation_timeout_secs))
            .stage_timeout(Duration::from_secs(self.stage_timeout_secs))
            .length_tolerance(self.length_tolerance)
            .density_min(self.density_min)
            .density_max(self.density_max)
            .stage_retries(self.stage_retries)
            .landscape_ttl(Duration::from_secs(self.landscape_ttl_hours * 60 * 60))
            .content_ttl(Duration::from_secs(self.content_ttl_hours * 60 * 60))
            .build()
            .context("invalid pipeline configuration")
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            max_concurrent_runs = self.max_concurrent_runs,
            search_concurrency = self.search_concurrency,
            stage_timeout_secs = self.stage_timeout_secs,
            density_min = self.density_min,
            density_max = self.density_max,
            "Pipeline configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[clap(flatten)]
        pipeline: PipelineArgs,
    }

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let harness = Harness::try_parse_from(["seoflow"]).unwrap();
        let config = harness.pipeline.to_config().unwrap();
        let default = PipelineConfig::default();

        assert_eq!(config.max_concurrent_runs, default.max_concurrent_runs);
        assert_eq!(config.stage_timeout, default.stage_timeout);
        assert_eq!(config.landscape_ttl, default.landscape_ttl);
        assert_eq!(config.content_ttl, default.content_ttl);
    }

    #[test]
    fn test_inverted_density_band_is_rejected() {
        let harness =
            Harness::try_parse_from(["seoflow", "--density-min", "3", "--density-max", "2"])
                .unwrap();
        assert!(harness.pipeline.to_config().is_err());
    }
}
