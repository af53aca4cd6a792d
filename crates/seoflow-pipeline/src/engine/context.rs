//! Per-run execution context.

use seoflow_core::types::{Fingerprint, PipelineRequest, StyleProfile};
use tokio_util::sync::CancellationToken;

use crate::PipelineResult;
use crate::stage::DraftBrief;

/// Values derived once from the request and shared by every stage of a run.
#[derive(Debug, Clone)]
pub(super) struct RunContext {
    /// Normalized drafting input, including the resolved style profile.
    pub brief: DraftBrief,
    /// Keys landscape artifacts.
    pub landscape_fp: Fingerprint,
    /// Keys competitor insight; landscape scope narrowed to the client.
    pub competitor_fp: Fingerprint,
    /// Keys drafts, adapted drafts and final content.
    pub content_fp: Fingerprint,
    /// Skip cache reads for this run.
    pub force_refresh: bool,
    /// Cooperative cancellation signal of the run.
    pub token: CancellationToken,
}

impl RunContext {
    /// Validates the request and derives the fingerprints and brief.
    pub fn new(
        request: &PipelineRequest,
        profile: StyleProfile,
        token: CancellationToken,
    ) -> PipelineResult<Self> {
        request.validate()?;

        let client = request.client.as_ref().map_or("", |client| client.as_str());
        let landscape_fp = Fingerprint::landscape(request)?;
        let competitor_fp = landscape_fp.derive("client", client);
        let content_fp = Fingerprint::content(request)?.derive("client", client);

        Ok(Self {
            brief: DraftBrief::new(request, profile),
            landscape_fp,
            competitor_fp,
            content_fp,
            force_refresh: request.force_refresh,
            token,
        })
    }

    /// Returns whether the run was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
