//! Mock capabilities for testing and offline runs.
//!
//! The search and generation mocks are deterministic: the same keyword always
//! yields the same pages and the same request always yields the same draft.
//! Clones share their call counters, so a test can keep one handle and give
//! another to the pipeline.

mod cache;
mod generation;
mod search;
mod store;

use std::time::Duration;

pub use cache::FailingCacheStore;
#[cfg(feature = "config")]
use clap::Args;
pub use generation::MockGenerator;
pub use search::{MockSearchSource, ranked_result};
use seoflow_core::provider::Capabilities;
use serde::{Deserialize, Serialize};
pub use store::{MockReferenceStore, MockStyleStore};

/// Configuration for the offline capability set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MockConfig {
    /// Ranked pages returned per keyword.
    #[cfg_attr(
        feature = "config",
        arg(long = "mock-results", env = "MOCK_RESULTS", default_value = "5")
    )]
    #[serde(default = "default_results")]
    pub results_per_keyword: usize,

    /// Simulated search latency in milliseconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "mock-latency-ms", env = "MOCK_LATENCY_MS", default_value = "0")
    )]
    #[serde(default)]
    pub search_latency_ms: u64,

    /// Makes every search lookup fail, to exercise degraded runs.
    #[cfg_attr(
        feature = "config",
        arg(long = "mock-search-unavailable", env = "MOCK_SEARCH_UNAVAILABLE")
    )]
    #[serde(default)]
    pub search_unavailable: bool,
}

fn default_results() -> usize {
    5
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            results_per_keyword: default_results(),
            search_latency_ms: 0,
            search_unavailable: false,
        }
    }
}

impl MockConfig {
    /// Builds the search source this configuration describes.
    pub fn search_source(&self) -> MockSearchSource {
        let source = MockSearchSource::new()
            .with_results(self.results_per_keyword)
            .with_latency(Duration::from_millis(self.search_latency_ms));
        if self.search_unavailable {
            source.failing_all()
        } else {
            source
        }
    }

    /// Converts the configuration into a full capability set.
    pub fn into_capabilities(self) -> Capabilities {
        mock_capabilities(&self.search_source(), &MockGenerator::new())
    }
}

/// Bundles the given search and generation mocks with empty client stores.
///
/// The mocks are cloned, so the caller's handles keep observing calls.
pub fn mock_capabilities(search: &MockSearchSource, generator: &MockGenerator) -> Capabilities {
    Capabilities::new(
        search.clone(),
        generator.clone(),
        MockStyleStore::new(),
        MockReferenceStore::new(),
    )
}

/// Creates a complete offline capability set from configuration.
pub fn create_mock_capabilities(config: MockConfig) -> Capabilities {
    config.into_capabilities()
}

#[cfg(test)]
mod tests {
    use seoflow_core::provider::SearchSource;

    use super::*;

    #[tokio::test]
    async fn test_config_drives_search_source() {
        let config = MockConfig {
            results_per_keyword: 3,
            ..MockConfig::default()
        };
        let pages = config.search_source().lookup("hay").await.unwrap();
        assert_eq!(pages.len(), 3);

        let unavailable = MockConfig {
            search_unavailable: true,
            ..MockConfig::default()
        };
        assert!(unavailable.search_source().lookup("hay").await.is_err());
    }
}
