//! Pipeline configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Configuration for the content pipeline.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PipelineConfig {
    /// Maximum number of concurrently executing runs.
    #[builder(default = "10")]
    pub max_concurrent_runs: usize,

    /// Maximum number of concurrent keyword lookups within one run.
    #[builder(default = "4")]
    pub search_concurrency: usize,

    /// Ranked results kept per keyword.
    #[builder(default = "10")]
    pub results_per_keyword: usize,

    /// Deadline for a single keyword lookup.
    #[builder(default = "Duration::from_secs(20)")]
    pub search_timeout: Duration,

    /// Deadline for a single generation call.
    #[builder(default = "Duration::from_secs(120)")]
    pub generation_timeout: Duration,

    /// Deadline for a whole stage, retries included.
    #[builder(default = "Duration::from_secs(600)")]
    pub stage_timeout: Duration,

    /// Allowed relative deviation from the target length.
    #[builder(default = "0.15")]
    pub length_tolerance: f64,

    /// Section headings (H2) a draft must have.
    #[builder(default = "2")]
    pub min_sections: usize,

    /// Lower bound of the keyword density band, in percent.
    #[builder(default = "1.0")]
    pub density_min: f64,

    /// Upper bound of the keyword density band, in percent.
    #[builder(default = "2.0")]
    pub density_max: f64,

    /// Regenerations after a draft fails validation.
    #[builder(default = "2")]
    pub draft_regenerations: u32,

    /// Retries of a stage after a generation or style failure.
    #[builder(default = "1")]
    pub stage_retries: u32,

    /// Delay before the first retry.
    #[builder(default = "Duration::from_millis(250)")]
    pub retry_delay: Duration,

    /// Landscape search results used as competitor documents.
    #[builder(default = "5")]
    pub competitor_documents: usize,

    /// Time to live of landscape and competitor results.
    #[builder(default = "Duration::from_secs(24 * 60 * 60)")]
    pub landscape_ttl: Duration,

    /// Time to live of drafts and final content.
    #[builder(default = "Duration::from_secs(7 * 24 * 60 * 60)")]
    pub content_ttl: Duration,
}

impl PipelineConfig {
    /// Returns a builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Acceptable word-count window for a target length.
    pub fn length_window(&self, target_length: u32) -> (usize, usize) {
        let target = f64::from(target_length);
        let min = (target * (1.0 - self.length_tolerance)).round().max(0.0) as usize;
        let max = (target * (1.0 + self.length_tolerance)).round() as usize;
        (min, max)
    }

    /// Returns whether a keyword density lies inside the target band.
    pub fn density_in_band(&self, density: f64) -> bool {
        density >= self.density_min && density <= self.density_max
    }
}

impl PipelineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_concurrent_runs
            && max == 0
        {
            return Err("max_concurrent_runs must be at least 1".into());
        }

        if let Some(concurrency) = self.search_concurrency
            && concurrency == 0
        {
            return Err("search_concurrency must be at least 1".into());
        }

        if let Some(tolerance) = self.length_tolerance
            && !(0.0..1.0).contains(&tolerance)
        {
            return Err("length_tolerance must be in [0, 1)".into());
        }

        let min = self.density_min.unwrap_or(1.0);
        let max = self.density_max.unwrap_or(2.0);
        if min < 0.0 || min > max {
            return Err("density band must satisfy 0 <= density_min <= density_max".into());
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 10,
            search_concurrency: 4,
            results_per_keyword: 10,
            search_timeout: Duration::from_secs(20),
            generation_timeout: Duration::from_secs(120),
            stage_timeout: Duration::from_secs(600),
            length_tolerance: 0.15,
            min_sections: 2,
            density_min: 1.0,
            density_max: 2.0,
            draft_regenerations: 2,
            stage_retries: 1,
            retry_delay: Duration::from_millis(250),
            competitor_documents: 5,
            landscape_ttl: Duration::from_secs(24 * 60 * 60),
            content_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_default() {
        let built = PipelineConfig::builder().build().unwrap();
        let default = PipelineConfig::default();
        assert_eq!(built.max_concurrent_runs, default.max_concurrent_runs);
        assert_eq!(built.landscape_ttl, default.landscape_ttl);
        assert_eq!(built.content_ttl, default.content_ttl);
        assert_eq!(built.draft_regenerations, 2);
    }

    #[test]
    fn test_length_window() {
        let config = PipelineConfig::default();
        assert_eq!(config.length_window(1200), (1020, 1380));
        assert_eq!(config.length_window(100), (85, 115));
    }

    #[test]
    fn test_density_band() {
        let config = PipelineConfig::default();
        assert!(config.density_in_band(1.0));
        assert!(config.density_in_band(2.0));
        assert!(!config.density_in_band(0.4));
        assert!(!config.density_in_band(2.6));
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::builder().max_concurrent_runs(0usize).build().is_err());
        assert!(PipelineConfig::builder().length_tolerance(1.5).build().is_err());
        assert!(
            PipelineConfig::builder()
                .density_min(3.0)
                .density_max(2.0)
                .build()
                .is_err()
        );
    }
}
