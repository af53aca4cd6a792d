//! In-memory client stores.

use std::collections::HashMap;
use std::sync::Arc;

use seoflow_core::provider::{ReferenceStore, StyleStore};
use seoflow_core::types::{ClientRef, CompetitorDocument, StyleProfile, StyleProfileRef};
use seoflow_core::{Error, Result};

/// Style profiles keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct MockStyleStore {
    profiles: Arc<HashMap<String, StyleProfile>>,
}

impl MockStyleStore {
    /// Creates an empty store; every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `profile` under `reference`.
    pub fn with_profile(mut self, reference: impl Into<String>, profile: StyleProfile) -> Self {
        Arc::make_mut(&mut self.profiles).insert(reference.into(), profile);
        self
    }
}

#[async_trait::async_trait]
impl StyleStore for MockStyleStore {
    async fn get_style_profile(&self, reference: &StyleProfileRef) -> Result<Option<StyleProfile>> {
        Ok(self.profiles.get(reference.as_str()).cloned())
    }
}

/// Client reference documents keyed by client.
#[derive(Debug, Clone, Default)]
pub struct MockReferenceStore {
    documents: Arc<HashMap<String, Vec<CompetitorDocument>>>,
    failing: bool,
}

impl MockReferenceStore {
    /// Creates an empty store; every client has no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the documents of `client`.
    pub fn with_documents(
        mut self,
        client: impl Into<String>,
        documents: Vec<CompetitorDocument>,
    ) -> Self {
        Arc::make_mut(&mut self.documents).insert(client.into(), documents);
        self
    }

    /// Makes every listing fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait::async_trait]
impl ReferenceStore for MockReferenceStore {
    async fn list_competitor_documents(&self, client: &ClientRef) -> Result<Vec<CompetitorDocument>> {
        if self.failing {
            return Err(Error::external_source_unavailable()
                .with_message(format!("mock reference store unavailable for '{client}'")));
        }
        Ok(self
            .documents
            .get(client.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_profile_is_none() {
        let store = MockStyleStore::new().with_profile("acme", StyleProfile::neutral());
        assert!(store
            .get_style_profile(&StyleProfileRef::new("acme"))
            .await
            .unwrap()
            .is_some());
        assert!(store
            .get_style_profile(&StyleProfileRef::new("nobody"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reference_documents_per_client() {
        let store = MockReferenceStore::new()
            .with_documents("acme", vec![CompetitorDocument::new("Ours", "Hay storage.")]);
        let acme = store
            .list_competitor_documents(&ClientRef::new("acme"))
            .await
            .unwrap();
        assert_eq!(acme.len(), 1);

        let failing = store.failing();
        assert!(failing
            .list_competitor_documents(&ClientRef::new("acme"))
            .await
            .is_err());
    }
}
