//! The `run` subcommand.

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use seoflow_core::types::{ContentType, PipelineRequest};
use seoflow_pipeline::prelude::{Orchestrator, PipelineOutcome, RunId};

use crate::TRACING_TARGET_RUN;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One article request.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Subject of the article.
    #[arg(long)]
    pub topic: String,

    /// Target length in words.
    #[arg(long, default_value = "1200")]
    pub length: u32,

    /// Target keyword; repeat for several, the first is primary.
    #[arg(long = "keyword", required = true)]
    pub keywords: Vec<String>,

    /// Desired tone.
    #[arg(long)]
    pub tone: Option<String>,

    /// Kind of document: article, landing_page, journal or success_story.
    #[arg(long, default_value = "article")]
    pub content_type: ContentType,

    /// Style profile to adapt the draft to.
    #[arg(long)]
    pub style_profile: Option<String>,

    /// Client whose reference documents ground the competitor analysis.
    #[arg(long)]
    pub client: Option<String>,

    /// Recompute every stage instead of reading cached results.
    #[arg(long)]
    pub force_refresh: bool,
}

impl RunArgs {
    /// Builds the pipeline request.
    pub fn into_request(self) -> PipelineRequest {
        let mut request = PipelineRequest::new(self.topic, self.length, self.keywords)
            .with_content_type(self.content_type)
            .with_force_refresh(self.force_refresh);
        if let Some(tone) = self.tone {
            request = request.with_tone(tone);
        }
        if let Some(profile) = self.style_profile {
            request = request.with_style_profile(profile);
        }
        if let Some(client) = self.client {
            request = request.with_client(client);
        }
        request
    }

    /// Submits the request and waits for it, cancelling on Ctrl-C.
    pub async fn execute(self, orchestrator: &Orchestrator) -> anyhow::Result<PipelineOutcome> {
        let run_id = orchestrator
            .submit(self.into_request())
            .context("failed to submit run")?;
        tracing::info!(target: TRACING_TARGET_RUN, run_id = %run_id, "Run submitted");

        wait(orchestrator, run_id).await
    }
}

async fn wait(orchestrator: &Orchestrator, run_id: RunId) -> anyhow::Result<PipelineOutcome> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    let mut interrupted = false;

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if !interrupted => {
                signal.context("failed to listen for ctrl-c")?;
                interrupted = true;
                tracing::warn!(
                    target: TRACING_TARGET_RUN,
                    run_id = %run_id,
                    "Interrupted, cancelling run"
                );
                orchestrator.cancel(&run_id)?;
            }
            _ = interval.tick() => {
                let run = orchestrator.status(&run_id)?;
                if run.is_terminal() {
                    return Ok(run.outcome());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use seoflow_cache::ResultCache;
    use seoflow_pipeline::PipelineConfig;
    use seoflow_test::MockConfig;

    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            topic: "Compact Tractors for Modern Farming".into(),
            length: 900,
            keywords: vec!["compact tractors".into(), "farming equipment".into()],
            tone: Some("friendly".into()),
            content_type: ContentType::Article,
            style_profile: None,
            client: Some("acme".into()),
            force_refresh: false,
        }
    }

    #[test]
    fn test_into_request() {
        let request = args().into_request();
        assert_eq!(request.target_length, 900);
        assert_eq!(request.primary_keyword(), Some("compact tractors"));
        assert_eq!(request.tone.to_string(), "friendly");
        assert!(request.client.is_some());
        assert!(request.style_profile.is_none());
        assert!(!request.force_refresh);
    }

    #[tokio::test]
    async fn test_execute_completes_offline() {
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            MockConfig::default().into_capabilities(),
            ResultCache::in_memory(),
        );

        let outcome = args().execute(&orchestrator).await.unwrap();
        assert!(outcome.is_completed());
        assert!(orchestrator.status(&outcome.run_id()).unwrap().is_terminal());
    }
}
