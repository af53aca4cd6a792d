//! Stage machine execution.

use std::time::Duration;

use jiff::Timestamp;
use seoflow_core::types::{
    AdaptedDraft, Artifact, ArtifactKind, ClientRef, CompetitorDocument, CompetitorInsight, Draft,
    FinalContent, Fingerprint, LandscapeResult, Origin, Recommendation, StyleProfile, Timing,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::Orchestrator;
use super::context::RunContext;
use crate::run::{PipelineRun, RunError, Stage, StageStatus};
use crate::stage::{AdaptParams, DraftParams};
use crate::{PipelineError, PipelineResult, TRACING_TARGET};

/// Payload of the final-content cache entry.
type FinalPayload = (FinalContent, Vec<Recommendation>);

/// Clones the payload of the artifact a previous stage produced.
fn required<T: Clone>(artifact: &Option<Artifact<T>>, producer: Stage) -> PipelineResult<T> {
    artifact
        .as_ref()
        .map(|artifact| artifact.payload.clone())
        .ok_or_else(|| PipelineError::Internal(format!("no artifact from stage {producer}")))
}

/// Bounds one attempt of a generation stage. Running out of time counts as a
/// failed generation, so the stage policy retries it.
async fn within<T>(
    deadline: Duration,
    stage: Stage,
    attempt: impl Future<Output = PipelineResult<T>>,
) -> PipelineResult<T> {
    tokio::time::timeout(deadline, attempt)
        .await
        .unwrap_or_else(|_| {
            Err(PipelineError::GenerationFailed(format!(
                "{stage} exceeded {}ms",
                deadline.as_millis()
            )))
        })
}

impl Orchestrator {
    /// Executes a run until it reaches a terminal stage.
    ///
    /// Waits for a worker slot first. The run is persisted after every
    /// transition and returned in its final state.
    pub(super) async fn execute(
        &self,
        mut run: PipelineRun,
        token: CancellationToken,
    ) -> PipelineRun {
        match self.inner.semaphore.acquire().await {
            Ok(_permit) => self.drive(&mut run, token).await,
            Err(error) => {
                let stage = run.stage;
                let error = PipelineError::Internal(format!("worker pool closed: {error}"));
                self.fail(&mut run, stage, error);
            }
        }

        self.unregister(&run.id);
        run
    }

    async fn drive(&self, run: &mut PipelineRun, token: CancellationToken) {
        let profile = self.resolve_profile(run).await;
        let ctx = match RunContext::new(&run.request, profile, token) {
            Ok(ctx) => ctx,
            Err(error) => {
                let stage = run.stage;
                self.fail(run, stage, error);
                return;
            }
        };

        tracing::debug!(
            target: TRACING_TARGET,
            run_id = %run.id,
            landscape_fp = %ctx.landscape_fp.short(),
            content_fp = %ctx.content_fp.short(),
            "Run context prepared"
        );

        while !run.stage.is_terminal() {
            if ctx.is_cancelled() {
                self.mark_cancelled(run);
                return;
            }

            let stage = run.stage;
            let started_at = Timestamp::now();
            run.set_status(stage, StageStatus::Running);
            self.persist(run);

            let result = if stage.calls_out() {
                self.step(stage, run, &ctx).await
            } else {
                tokio::time::timeout(self.inner.config.stage_timeout, self.step(stage, run, &ctx))
                    .await
                    .unwrap_or(Err(PipelineError::Timeout { stage }))
            };

            let timing = Timing::since(started_at);
            if stage.is_working() {
                run.timings.insert(stage, timing);
            }

            match result {
                Ok(_) if ctx.is_cancelled() => {
                    if let Some(kind) = stage.artifact_kind() {
                        run.artifacts.discard(kind);
                    }
                    run.set_status(stage, StageStatus::Pending);
                    self.mark_cancelled(run);
                    return;
                }
                Ok(next) => {
                    if run.status(stage) == StageStatus::Running {
                        run.set_status(stage, StageStatus::Succeeded);
                    }

                    tracing::info!(
                        target: TRACING_TARGET,
                        run_id = %run.id,
                        stage = %stage,
                        status = %run.status(stage),
                        elapsed_ms = timing.elapsed_ms(),
                        "Stage finished"
                    );
                    self.transition(run, next);
                }
                Err(error) => self.fail(run, stage, error),
            }
        }

        if run.stage == Stage::Completed {
            tracing::info!(
                target: TRACING_TARGET,
                run_id = %run.id,
                degraded = run.degraded,
                "Run completed"
            );
        }
    }

    async fn step(
        &self,
        stage: Stage,
        run: &mut PipelineRun,
        ctx: &RunContext,
    ) -> PipelineResult<Stage> {
        match stage {
            Stage::Queued => Ok(self.check_cache(run, ctx)),
            Stage::AnalyzingLandscape => self.analyze_landscape(run, ctx).await,
            Stage::SynthesizingCompetitors => self.synthesize_competitors(run, ctx).await,
            Stage::Drafting => self.draft(run, ctx).await,
            Stage::AdaptingStyle => self.adapt_style(run, ctx).await,
            Stage::Optimizing => self.optimize(run, ctx),
            Stage::Completed | Stage::Failed | Stage::Cancelled => Err(PipelineError::Internal(
                format!("cannot execute terminal stage {stage}"),
            )),
        }
    }

    /// Moves the run to `next` if the stage machine allows it.
    fn transition(&self, run: &mut PipelineRun, next: Stage) {
        let from = run.stage;
        if !from.can_transition_to(next) {
            let error =
                PipelineError::Internal(format!("illegal transition from {from} to {next}"));
            self.fail(run, from, error);
            return;
        }

        run.stage = next;
        run.updated_at = Timestamp::now();

        tracing::debug!(
            target: TRACING_TARGET,
            run_id = %run.id,
            from = %from,
            to = %next,
            "Run transitioned"
        );
        self.persist(run);
    }

    /// Records `error` against `stage` and moves the run to `Failed`.
    fn fail(&self, run: &mut PipelineRun, stage: Stage, error: PipelineError) {
        run.set_status(stage, StageStatus::Failed);
        run.error = Some(RunError::new(&error, stage, run.last_successful_stage()));
        run.stage = Stage::Failed;
        run.updated_at = Timestamp::now();

        tracing::error!(
            target: TRACING_TARGET,
            run_id = %run.id,
            stage = %stage,
            error_kind = error.kind().as_ref(),
            error = %error,
            "Run failed"
        );
        self.persist(run);
    }

    pub(super) fn mark_cancelled(&self, run: &mut PipelineRun) {
        let from = run.stage;
        run.stage = Stage::Cancelled;
        run.updated_at = Timestamp::now();

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run.id,
            stage = %from,
            "Run cancelled"
        );
        self.persist(run);
    }

    /// Loads the request's style profile.
    ///
    /// An unknown reference means the neutral profile. An unreachable store
    /// also falls back to neutral but marks the run degraded.
    async fn resolve_profile(&self, run: &mut PipelineRun) -> StyleProfile {
        let Some(reference) = run.request.style_profile.clone() else {
            return StyleProfile::neutral();
        };

        let lookup = self.inner.capabilities.styles.get_style_profile(&reference);
        match tokio::time::timeout(self.inner.config.search_timeout, lookup).await {
            Ok(Ok(Some(mut profile))) => {
                profile.reference.get_or_insert(reference);
                profile
            }
            Ok(Ok(None)) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    style_profile = %reference,
                    "Style profile not found, using neutral profile"
                );
                StyleProfile::neutral()
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    style_profile = %reference,
                    error = %error,
                    "Style store unavailable, using neutral profile"
                );
                run.degraded = true;
                StyleProfile::neutral()
            }
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    style_profile = %reference,
                    "Style store timed out, using neutral profile"
                );
                run.degraded = true;
                StyleProfile::neutral()
            }
        }
    }

    /// Satisfies as many stages as possible from live cache entries and
    /// returns the first stage that needs fresh work.
    fn check_cache(&self, run: &mut PipelineRun, ctx: &RunContext) -> Stage {
        if ctx.force_refresh {
            tracing::info!(
                target: TRACING_TARGET,
                run_id = %run.id,
                "Refresh requested, bypassing cached results"
            );
            return Stage::AnalyzingLandscape;
        }

        let cache = &self.inner.cache;

        if let Some(cached) = cache.get::<FinalPayload>(&ctx.content_fp, ArtifactKind::Final) {
            let (content, recommendations) = cached.value;
            run.artifacts.final_content =
                Some(Artifact::new(ArtifactKind::Final, Origin::Cached, content));
            run.artifacts.recommendations = recommendations;
            return self.skip_to(run, Stage::Completed);
        }

        if let Some(cached) = cache.get::<AdaptedDraft>(&ctx.content_fp, ArtifactKind::Adapted) {
            run.artifacts.adapted = Some(Artifact::new(
                ArtifactKind::Adapted,
                Origin::Cached,
                cached.value,
            ));
            return self.skip_to(run, Stage::Optimizing);
        }

        if let Some(cached) = cache.get::<Draft>(&ctx.content_fp, ArtifactKind::Draft) {
            run.artifacts.draft = Some(Artifact::new(
                ArtifactKind::Draft,
                Origin::Cached,
                cached.value,
            ));
            return self.skip_to(run, Stage::AdaptingStyle);
        }

        let Some(landscape) =
            cache.get::<LandscapeResult>(&ctx.landscape_fp, ArtifactKind::Landscape)
        else {
            return Stage::AnalyzingLandscape;
        };
        run.artifacts.landscape = Some(Artifact::new(
            ArtifactKind::Landscape,
            Origin::Cached,
            landscape.value,
        ));

        if let Some(cached) =
            cache.get::<CompetitorInsight>(&ctx.competitor_fp, ArtifactKind::Competitor)
        {
            run.artifacts.competitor = Some(Artifact::new(
                ArtifactKind::Competitor,
                Origin::Cached,
                cached.value,
            ));
            return self.skip_to(run, Stage::Drafting);
        }

        self.skip_to(run, Stage::SynthesizingCompetitors)
    }

    fn skip_to(&self, run: &mut PipelineRun, next: Stage) -> Stage {
        for stage in Stage::WORKING.into_iter().filter(|stage| *stage < next) {
            run.set_status(stage, StageStatus::SkippedViaCache);
        }

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run.id,
            next = %next,
            "Stages satisfied from cache"
        );
        next
    }

    async fn analyze_landscape(
        &self,
        run: &mut PipelineRun,
        ctx: &RunContext,
    ) -> PipelineResult<Stage> {
        let orchestrator = self.clone();
        let context = ctx.clone();

        let flight = self
            .inner
            .landscape_flights
            .run(ctx.landscape_fp.clone(), move || async move {
                orchestrator.compute_landscape(&context).await
            });

        let deadline = self.inner.config.stage_timeout;
        let value = match tokio::time::timeout(deadline, flight).await {
            Ok(flight) => {
                if !flight.leader {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        run_id = %run.id,
                        fingerprint = %ctx.landscape_fp.short(),
                        "Joined in-flight landscape analysis"
                    );
                }
                flight.value
            }
            Err(_) => Err(PipelineError::ExternalSourceUnavailable(format!(
                "landscape analysis exceeded {}ms",
                deadline.as_millis()
            ))),
        };

        let artifact = match value {
            Ok(artifact) => artifact,
            Err(PipelineError::ExternalSourceUnavailable(reason)) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    run_id = %run.id,
                    reason = %reason,
                    "Search landscape unavailable, continuing degraded"
                );
                self.fallback_landscape(ctx)
            }
            Err(error) => return Err(error),
        };

        if artifact.origin.is_degraded() || artifact.payload.is_partial() {
            run.degraded = true;
        }
        if artifact.origin == Origin::Cached {
            run.set_status(Stage::AnalyzingLandscape, StageStatus::SkippedViaCache);
        }

        run.artifacts.landscape = Some(artifact);
        Ok(Stage::SynthesizingCompetitors)
    }

    async fn compute_landscape(
        &self,
        ctx: &RunContext,
    ) -> PipelineResult<Artifact<LandscapeResult>> {
        let fingerprint = &ctx.landscape_fp;
        if let Some(cached) = self.lookup(ctx.force_refresh, fingerprint, ArtifactKind::Landscape) {
            return Ok(Artifact::new(ArtifactKind::Landscape, Origin::Cached, cached));
        }

        let brief = &ctx.brief;
        let landscape = self.inner.analyzer.analyze(&brief.topic, &brief.keywords).await?;

        if landscape.is_partial() {
            tracing::debug!(
                target: TRACING_TARGET,
                fingerprint = %fingerprint.short(),
                failed = landscape.failed_keywords().len(),
                "Partial landscape is not cached"
            );
        } else if !ctx.is_cancelled() {
            self.store(
                fingerprint,
                ArtifactKind::Landscape,
                &landscape,
                self.inner.config.landscape_ttl,
            );
        }

        Ok(Artifact::fresh(ArtifactKind::Landscape, landscape))
    }

    /// Expired landscape data when any is left, neutral defaults otherwise.
    fn fallback_landscape(&self, ctx: &RunContext) -> Artifact<LandscapeResult> {
        match self
            .inner
            .cache
            .get_stale::<LandscapeResult>(&ctx.landscape_fp, ArtifactKind::Landscape)
        {
            Some(stale) => Artifact::new(ArtifactKind::Landscape, Origin::StaleCache, stale.value),
            None => {
                let brief = &ctx.brief;
                let neutral =
                    LandscapeResult::neutral(&brief.topic, &brief.keywords, brief.target_length);
                Artifact::new(ArtifactKind::Landscape, Origin::Default, neutral)
            }
        }
    }

    async fn synthesize_competitors(
        &self,
        run: &mut PipelineRun,
        ctx: &RunContext,
    ) -> PipelineResult<Stage> {
        let landscape = required(&run.artifacts.landscape, Stage::AnalyzingLandscape)?;

        let cached = self.lookup(ctx.force_refresh, &ctx.competitor_fp, ArtifactKind::Competitor);
        if let Some(cached) = cached {
            run.artifacts.competitor =
                Some(Artifact::new(ArtifactKind::Competitor, Origin::Cached, cached));
            run.set_status(Stage::SynthesizingCompetitors, StageStatus::SkippedViaCache);
            return Ok(Stage::Drafting);
        }

        let mut documents: Vec<CompetitorDocument> = landscape
            .top_results(self.inner.config.competitor_documents)
            .into_iter()
            .map(CompetitorDocument::from)
            .collect();

        if let Some(client) = run.request.client.clone() {
            match self.reference_documents(&client).await {
                Some(mut uploaded) => documents.append(&mut uploaded),
                None => run.degraded = true,
            }
        }

        let insight = self.inner.synthesizer.synthesize(&landscape, &documents);
        if self.cacheable(run, ctx) {
            self.store(
                &ctx.competitor_fp,
                ArtifactKind::Competitor,
                &insight,
                self.inner.config.landscape_ttl,
            );
        }

        run.artifacts.competitor = Some(Artifact::fresh(ArtifactKind::Competitor, insight));
        Ok(Stage::Drafting)
    }

    /// Lists a client's uploaded documents, or `None` if the store failed.
    async fn reference_documents(&self, client: &ClientRef) -> Option<Vec<CompetitorDocument>> {
        let listing = self
            .inner
            .capabilities
            .references
            .list_competitor_documents(client);

        match tokio::time::timeout(self.inner.config.search_timeout, listing).await {
            Ok(Ok(documents)) => Some(documents),
            Ok(Err(error)) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    client = %client,
                    error = %error,
                    "Reference store unavailable, using search results only"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    client = %client,
                    "Reference store timed out, using search results only"
                );
                None
            }
        }
    }

    async fn draft(&self, run: &mut PipelineRun, ctx: &RunContext) -> PipelineResult<Stage> {
        let landscape = required(&run.artifacts.landscape, Stage::AnalyzingLandscape)?;
        let insight = required(&run.artifacts.competitor, Stage::SynthesizingCompetitors)?;

        let orchestrator = self.clone();
        let context = ctx.clone();
        let cacheable = !run.degraded;

        let flight = self
            .inner
            .draft_flights
            .run(ctx.content_fp.clone(), move || async move {
                orchestrator
                    .compute_draft(&context, &landscape, &insight, cacheable)
                    .await
            })
            .await;

        if !flight.leader {
            tracing::debug!(
                target: TRACING_TARGET,
                run_id = %run.id,
                fingerprint = %ctx.content_fp.short(),
                "Joined in-flight draft generation"
            );
        }

        let artifact = flight.value?;
        if artifact.origin == Origin::Cached {
            run.set_status(Stage::Drafting, StageStatus::SkippedViaCache);
        }

        run.artifacts.draft = Some(artifact);
        Ok(Stage::AdaptingStyle)
    }

    async fn compute_draft(
        &self,
        ctx: &RunContext,
        landscape: &LandscapeResult,
        insight: &CompetitorInsight,
        cacheable: bool,
    ) -> PipelineResult<Artifact<Draft>> {
        let fingerprint = &ctx.content_fp;
        if let Some(cached) = self.lookup(ctx.force_refresh, fingerprint, ArtifactKind::Draft) {
            return Ok(Artifact::new(ArtifactKind::Draft, Origin::Cached, cached));
        }

        let drafter = &self.inner.drafter;
        let deadline = self.inner.config.stage_timeout;
        let draft = self
            .inner
            .stage_policy
            .execute(DraftParams::default(), |params, _| {
                within(
                    deadline,
                    Stage::Drafting,
                    drafter.generate_with(&ctx.brief, landscape, insight, params),
                )
            })
            .await?;

        if cacheable && !ctx.is_cancelled() {
            self.store(
                fingerprint,
                ArtifactKind::Draft,
                &draft,
                self.inner.config.content_ttl,
            );
        }

        Ok(Artifact::fresh(ArtifactKind::Draft, draft))
    }

    async fn adapt_style(&self, run: &mut PipelineRun, ctx: &RunContext) -> PipelineResult<Stage> {
        let draft = required(&run.artifacts.draft, Stage::Drafting)?;

        let cached = self.lookup::<AdaptedDraft>(
            ctx.force_refresh,
            &ctx.content_fp,
            ArtifactKind::Adapted,
        );
        if let Some(cached) = cached {
            run.artifacts.adapted =
                Some(Artifact::new(ArtifactKind::Adapted, Origin::Cached, cached));
            run.set_status(Stage::AdaptingStyle, StageStatus::SkippedViaCache);
            return Ok(Stage::Optimizing);
        }

        let adapter = &self.inner.adapter;
        let deadline = self.inner.config.stage_timeout;
        let adapted = self
            .inner
            .stage_policy
            .execute(AdaptParams::default(), |params, _| {
                within(
                    deadline,
                    Stage::AdaptingStyle,
                    adapter.adapt_with(&draft, &ctx.brief, params),
                )
            })
            .await?;

        if self.cacheable(run, ctx) {
            self.store(
                &ctx.content_fp,
                ArtifactKind::Adapted,
                &adapted,
                self.inner.config.content_ttl,
            );
        }

        run.artifacts.adapted = Some(Artifact::fresh(ArtifactKind::Adapted, adapted));
        Ok(Stage::Optimizing)
    }

    fn optimize(&self, run: &mut PipelineRun, ctx: &RunContext) -> PipelineResult<Stage> {
        let adapted = required(&run.artifacts.adapted, Stage::AdaptingStyle)?;
        let payload: FinalPayload = self.inner.optimizer.optimize(&adapted, &ctx.brief);

        if self.cacheable(run, ctx) {
            self.store(
                &ctx.content_fp,
                ArtifactKind::Final,
                &payload,
                self.inner.config.content_ttl,
            );
        }

        let (content, recommendations) = payload;
        run.artifacts.final_content = Some(Artifact::fresh(ArtifactKind::Final, content));
        run.artifacts.recommendations = recommendations;
        Ok(Stage::Completed)
    }

    /// Reads a live cache entry. Runs forcing a refresh always miss.
    fn lookup<T: DeserializeOwned>(
        &self,
        refresh: bool,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
    ) -> Option<T> {
        if refresh {
            return None;
        }
        self.inner.cache.get::<T>(fingerprint, kind).map(|cached| cached.value)
    }

    /// Degraded or cancelled runs never write to the cache.
    fn cacheable(&self, run: &PipelineRun, ctx: &RunContext) -> bool {
        !run.degraded && !ctx.is_cancelled()
    }

    /// Writes a cache entry; a failed write only costs a later recomputation.
    fn store<T: Serialize>(
        &self,
        fingerprint: &Fingerprint,
        kind: ArtifactKind,
        value: &T,
        ttl: Duration,
    ) {
        if let Err(error) = self.inner.cache.put(fingerprint, kind, value, ttl) {
            tracing::warn!(
                target: TRACING_TARGET,
                fingerprint = %fingerprint.short(),
                kind = kind.as_ref(),
                error = %error,
                "Cache write failed, continuing without caching"
            );
        }
    }
}
