//! Search and ranking source.

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;

use crate::TRACING_TARGET_SEARCH;
use crate::error::Result;
use crate::types::RankedResult;

/// A source of ranked search results.
#[async_trait::async_trait]
pub trait SearchSource: Send + Sync {
    /// Looks up the top-ranked pages for a keyword.
    async fn lookup(&self, keyword: &str) -> Result<Vec<RankedResult>>;
}

/// Search source with observability.
#[derive(Clone)]
pub struct SearchService {
    source: Arc<dyn SearchSource>,
}

impl fmt::Debug for SearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchService").finish_non_exhaustive()
    }
}

impl SearchService {
    /// Create a new search service from a source.
    pub fn from_source<S>(source: S) -> Self
    where
        S: SearchSource + 'static,
    {
        Self {
            source: Arc::new(source),
        }
    }

    /// Create a new search service from an already shared source.
    pub fn from_shared(source: Arc<dyn SearchSource>) -> Self {
        Self { source }
    }

    /// Look up the ranked results for a keyword.
    pub async fn lookup(&self, keyword: &str) -> Result<Vec<RankedResult>> {
        let started_at = Timestamp::now();

        tracing::debug!(
            target: TRACING_TARGET_SEARCH,
            keyword = %keyword,
            "Processing search lookup"
        );

        let result = self.source.lookup(keyword).await;
        let elapsed = Timestamp::now().duration_since(started_at);

        match &result {
            Ok(results) => {
                tracing::debug!(
                    target: TRACING_TARGET_SEARCH,
                    keyword = %keyword,
                    results = results.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Search lookup successful"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SEARCH,
                    keyword = %keyword,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Search lookup failed"
                );
            }
        }

        result
    }
}
