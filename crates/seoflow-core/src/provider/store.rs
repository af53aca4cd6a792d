//! Client-owned stores: style profiles and reference documents.

use crate::error::Result;
use crate::types::{ClientRef, CompetitorDocument, StyleProfile, StyleProfileRef};

/// Lookup of client style profiles.
#[async_trait::async_trait]
pub trait StyleStore: Send + Sync {
    /// Returns the profile, or `None` when the reference is unknown.
    async fn get_style_profile(&self, reference: &StyleProfileRef) -> Result<Option<StyleProfile>>;
}

/// Listing of a client's reference documents.
#[async_trait::async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Returns the competitor documents the client has uploaded.
    async fn list_competitor_documents(&self, client: &ClientRef) -> Result<Vec<CompetitorDocument>>;
}
