//! Pipeline orchestrator.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use seoflow_cache::{ResultCache, SingleFlight};
use seoflow_core::ErrorKind;
use seoflow_core::provider::Capabilities;
use seoflow_core::types::{Artifact, Draft, Fingerprint, LandscapeResult, PipelineRequest};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::run::{
    MemoryRunStore, PipelineOutcome, PipelineRun, RunId, RunStore, Stage, StageStatus,
};
use crate::stage::{
    CompetitorSynthesizer, DraftGenerator, LandscapeAnalyzer, SeoOptimizer, StyleAdapter,
};
use crate::{PipelineConfig, PipelineError, PipelineResult, RetryPolicy, TRACING_TARGET};

pub(super) type LandscapeFlights =
    SingleFlight<Fingerprint, PipelineResult<Artifact<LandscapeResult>>>;
pub(super) type DraftFlights = SingleFlight<Fingerprint, PipelineResult<Artifact<Draft>>>;

/// Shared state behind every [`Orchestrator`] handle.
pub(super) struct Inner {
    pub config: PipelineConfig,
    pub capabilities: Capabilities,
    pub cache: ResultCache,
    pub runs: Arc<dyn RunStore>,
    pub semaphore: Semaphore,
    pub analyzer: LandscapeAnalyzer,
    pub synthesizer: CompetitorSynthesizer,
    pub drafter: DraftGenerator,
    pub adapter: StyleAdapter,
    pub optimizer: SeoOptimizer,
    /// Stage-level retry of generation and style failures.
    pub stage_policy: RetryPolicy,
    pub landscape_flights: LandscapeFlights,
    pub draft_flights: DraftFlights,
    /// Cancellation tokens of runs executing in this process.
    pub active: Mutex<HashMap<RunId, CancellationToken>>,
}

/// Drives pipeline runs through the stage machine.
///
/// The orchestrator is cheap to clone; clones share the cache, the run store,
/// the worker pool and the in-flight computations. At most
/// `max_concurrent_runs` runs execute at once; further runs wait for a slot.
#[derive(Clone)]
pub struct Orchestrator {
    pub(super) inner: Arc<Inner>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.inner.config)
            .field("available_slots", &self.inner.semaphore.available_permits())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator keeping run state in memory.
    pub fn new(config: PipelineConfig, capabilities: Capabilities, cache: ResultCache) -> Self {
        Self::with_run_store(config, capabilities, cache, Arc::new(MemoryRunStore::new()))
    }

    /// Creates an orchestrator persisting run state to `runs`.
    pub fn with_run_store(
        config: PipelineConfig,
        capabilities: Capabilities,
        cache: ResultCache,
        runs: Arc<dyn RunStore>,
    ) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_runs = config.max_concurrent_runs,
            search_concurrency = config.search_concurrency,
            draft_regenerations = config.draft_regenerations,
            stage_retries = config.stage_retries,
            "Pipeline orchestrator initialized"
        );

        let inner = Inner {
            semaphore: Semaphore::new(config.max_concurrent_runs),
            analyzer: LandscapeAnalyzer::new(capabilities.search.clone(), &config),
            synthesizer: CompetitorSynthesizer::default(),
            drafter: DraftGenerator::new(capabilities.generation.clone(), &config),
            adapter: StyleAdapter::new(capabilities.generation.clone(), &config),
            optimizer: SeoOptimizer::new(&config),
            stage_policy: RetryPolicy::new(
                config.stage_retries,
                config.retry_delay,
                vec![ErrorKind::GenerationFailed, ErrorKind::StyleViolationUnresolved],
            ),
            landscape_flights: SingleFlight::new(),
            draft_flights: SingleFlight::new(),
            active: Mutex::new(HashMap::new()),
            config,
            capabilities,
            cache,
            runs,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the orchestrator configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Returns the result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// Executes a request to completion and returns its outcome.
    ///
    /// Completed and cancelled runs are removed from the run store once
    /// their outcome is handed back. Failed runs are kept, so they can be
    /// passed to [`resume`](Self::resume).
    pub async fn run(&self, request: PipelineRequest) -> PipelineOutcome {
        let run = self.execute_request(request).await;
        if matches!(run.stage, Stage::Completed | Stage::Cancelled)
            && let Err(error) = self.inner.runs.remove(&run.id)
        {
            tracing::warn!(
                target: TRACING_TARGET,
                run_id = %run.id,
                error = %error,
                "Failed to remove finished run"
            );
        }
        run.outcome()
    }

    /// Executes a request and returns the run in its final state. The run
    /// stays in the run store.
    pub(crate) async fn execute_request(&self, request: PipelineRequest) -> PipelineRun {
        let run = PipelineRun::new(request);
        let token = self.register(run.id).unwrap_or_default();

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run.id,
            topic = %run.request.topic,
            keywords = run.request.keywords.len(),
            target_length = run.request.target_length,
            "Run accepted"
        );

        self.persist(&run);
        self.execute(run, token).await
    }

    /// Starts a request in the background and returns its identifier.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when the initial run state cannot be stored, since
    /// the caller would have nothing to poll.
    pub fn submit(&self, request: PipelineRequest) -> PipelineResult<RunId> {
        let run = PipelineRun::new(request);
        let run_id = run.id;
        self.inner.runs.save(&run)?;

        let token = self.register(run_id).unwrap_or_default();
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.execute(run, token).await;
        });

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run_id,
            "Run submitted"
        );
        Ok(run_id)
    }

    /// Returns the persisted state of a run.
    pub fn status(&self, run_id: &RunId) -> PipelineResult<PipelineRun> {
        self.inner
            .runs
            .load(run_id)?
            .ok_or(PipelineError::RunNotFound(*run_id))
    }

    /// Returns a run's outcome, removing the run once it is terminal.
    ///
    /// Non-terminal runs report [`PipelineOutcome::Pending`] and are kept.
    pub fn take(&self, run_id: &RunId) -> PipelineResult<PipelineOutcome> {
        let run = self.status(run_id)?;
        if run.is_terminal() {
            self.inner.runs.remove(run_id)?;
        }
        Ok(run.outcome())
    }

    /// Lists every stored run, oldest first.
    pub fn runs(&self) -> PipelineResult<Vec<RunId>> {
        self.inner.runs.list()
    }

    /// Requests cancellation of a run.
    ///
    /// A run executing in this process stops before its next stage and
    /// discards the result of the stage in progress. A stored run that is not
    /// executing is marked cancelled directly. Returns `false` when the run
    /// has already finished.
    pub fn cancel(&self, run_id: &RunId) -> PipelineResult<bool> {
        if let Some(token) = self.active_token(run_id) {
            token.cancel();
            tracing::info!(
                target: TRACING_TARGET,
                run_id = %run_id,
                "Run cancellation requested"
            );
            return Ok(true);
        }

        let mut run = self.status(run_id)?;
        if run.is_terminal() {
            return Ok(false);
        }

        for stage in Stage::WORKING {
            if run.status(stage) == StageStatus::Running {
                run.set_status(stage, StageStatus::Pending);
            }
        }
        self.mark_cancelled(&mut run);
        Ok(true)
    }

    /// Continues a failed or interrupted run from its last completed stage.
    ///
    /// Artifacts of completed stages are reused, so a run that failed while
    /// drafting does not look up the landscape again. Completed and
    /// cancelled runs, and runs already executing, report their current
    /// outcome unchanged.
    pub async fn resume(&self, run_id: &RunId) -> PipelineResult<PipelineOutcome> {
        let Some(token) = self.register(*run_id) else {
            return Ok(self.status(run_id)?.outcome());
        };

        let run = match self.prepare_resume(run_id) {
            Ok(Some(run)) => run,
            Ok(None) => {
                self.unregister(run_id);
                return Ok(self.status(run_id)?.outcome());
            }
            Err(error) => {
                self.unregister(run_id);
                return Err(error);
            }
        };

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run_id,
            stage = %run.stage,
            "Resuming run"
        );

        self.persist(&run);
        Ok(self.execute(run, token).await.outcome())
    }

    /// Loads a run and rewinds it to the stage it continues from, or returns
    /// `None` when there is nothing to resume.
    fn prepare_resume(&self, run_id: &RunId) -> PipelineResult<Option<PipelineRun>> {
        let mut run = self.status(run_id)?;

        let restart = match run.stage {
            Stage::Completed | Stage::Cancelled => return Ok(None),
            Stage::Failed => run.resume_stage(),
            stage => stage,
        };

        if run.stage == Stage::Failed && !Stage::Failed.can_transition_to(restart) {
            return Err(PipelineError::Internal(format!(
                "run {run_id} cannot resume at {restart}"
            )));
        }

        for stage in Stage::WORKING.into_iter().filter(|stage| *stage >= restart) {
            run.set_status(stage, StageStatus::Pending);
            if let Some(kind) = stage.artifact_kind() {
                run.artifacts.discard(kind);
            }
        }

        run.error = None;
        run.stage = restart;
        Ok(Some(run))
    }

    /// Registers a run as executing, or returns `None` if it already is.
    fn register(&self, run_id: RunId) -> Option<CancellationToken> {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if active.contains_key(&run_id) {
            return None;
        }

        let token = CancellationToken::new();
        active.insert(run_id, token.clone());
        Some(token)
    }

    pub(super) fn unregister(&self, run_id: &RunId) {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(run_id);
    }

    fn active_token(&self, run_id: &RunId) -> Option<CancellationToken> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .cloned()
    }

    /// Stores the run, logging instead of failing when the store is down.
    pub(super) fn persist(&self, run: &PipelineRun) {
        if let Err(error) = self.inner.runs.save(run) {
            tracing::warn!(
                target: TRACING_TARGET,
                run_id = %run.id,
                stage = %run.stage,
                error = %error,
                "Failed to persist run state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use seoflow_core::text;
    use seoflow_core::types::{
        ArtifactKind, LandscapeResult, Origin, RecommendationKind, StyleProfile, UnmetConstraint,
    };
    use seoflow_test::{
        FailingCacheStore, MockGenerator, MockReferenceStore, MockSearchSource, MockStyleStore,
        mock_capabilities,
    };

    use super::*;
    use crate::run::FileRunStore;

    const KEYWORDS: [&str; 3] = ["compact tractors", "sub-compact tractors", "farming equipment"];

    fn request() -> PipelineRequest {
        PipelineRequest::new("Compact Tractors for Modern Farming", 1200, KEYWORDS)
    }

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .retry_delay(Duration::ZERO)
            .build()
            .unwrap()
    }

    fn orchestrator(search: &MockSearchSource, generator: &MockGenerator) -> Orchestrator {
        Orchestrator::new(
            config(),
            mock_capabilities(search, generator),
            ResultCache::in_memory(),
        )
    }

    async fn wait_terminal(orchestrator: &Orchestrator, run_id: &RunId) -> PipelineRun {
        let mut run = orchestrator.status(run_id).unwrap();
        for _ in 0..200 {
            if run.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            run = orchestrator.status(run_id).unwrap();
        }
        run
    }

    #[tokio::test]
    async fn test_compact_tractors_end_to_end() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let run = orchestrator.execute_request(request()).await;
        let outcome = run.outcome();
        assert!(outcome.is_completed(), "{outcome:?}");
        assert!(!outcome.is_degraded());

        let content = outcome.final_content().unwrap();
        assert!((1020..=1380).contains(&content.metrics.word_count));
        for keyword in KEYWORDS {
            assert!(text::contains_phrase(&content.body, keyword), "missing {keyword}");
        }

        let out_of_band = content
            .metrics
            .keywords
            .iter()
            .any(|stats| !orchestrator.config().density_in_band(stats.density));
        let recommendations = outcome.recommendations();
        if out_of_band {
            assert!(
                recommendations
                    .iter()
                    .any(|r| r.kind == RecommendationKind::KeywordDensity)
            );
        } else {
            assert!(recommendations.is_empty(), "{recommendations:?}");
        }

        assert_eq!(run.stage, Stage::Completed);
        assert!(
            Stage::WORKING
                .iter()
                .all(|stage| run.status(*stage) == StageStatus::Succeeded)
        );
        assert_eq!(run.timings.len(), 5);
        for keyword in KEYWORDS {
            assert_eq!(search.calls(keyword), 1);
        }
    }

    #[tokio::test]
    async fn test_identical_request_is_served_from_cache() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let first = orchestrator.run(request()).await;
        let run = orchestrator.execute_request(request()).await;
        let second = run.outcome();

        assert_eq!(
            first.final_content().map(|content| &content.body),
            second.final_content().map(|content| &content.body)
        );
        assert_eq!(search.total_calls(), 3);
        assert_eq!(generator.draft_calls(), 1);

        assert!(
            Stage::WORKING
                .iter()
                .all(|stage| run.status(*stage) == StageStatus::SkippedViaCache)
        );
        assert_eq!(
            run.artifacts.final_content.as_ref().map(|a| a.origin),
            Some(Origin::Cached)
        );
    }

    #[tokio::test]
    async fn test_shared_landscape_across_tones() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        orchestrator.run(request()).await;
        let run = orchestrator.execute_request(request().with_tone("casual")).await;
        assert_eq!(run.stage, Stage::Completed);

        assert_eq!(run.status(Stage::AnalyzingLandscape), StageStatus::SkippedViaCache);
        assert_eq!(run.status(Stage::SynthesizingCompetitors), StageStatus::SkippedViaCache);
        assert_eq!(run.status(Stage::Drafting), StageStatus::Succeeded);
        assert_eq!(search.total_calls(), 3);
        assert_eq!(generator.draft_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_one_lookup_per_keyword() {
        let search = MockSearchSource::new().with_latency(Duration::from_millis(50));
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.run(request()).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_completed());
        }
        for keyword in KEYWORDS {
            assert_eq!(search.calls(keyword), 1, "{keyword}");
        }
        assert_eq!(generator.draft_calls(), 1);
    }

    #[tokio::test]
    async fn test_resume_after_drafting_failure() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new().failing_first(2);
        let orchestrator = orchestrator(&search, &generator);

        let outcome = orchestrator.run(request()).await;
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::GenerationFailed);
        assert_eq!(error.stage, Stage::Drafting);
        assert_eq!(error.last_successful_stage, Some(Stage::SynthesizingCompetitors));
        assert_eq!(generator.draft_calls(), 2);

        let resumed = orchestrator.resume(&outcome.run_id()).await.unwrap();
        assert!(resumed.is_completed(), "{resumed:?}");
        assert_eq!(resumed.run_id(), outcome.run_id());
        assert_eq!(search.total_calls(), 3);
        assert_eq!(generator.draft_calls(), 3);

        let run = orchestrator.status(&outcome.run_id()).unwrap();
        assert_eq!(run.status(Stage::AnalyzingLandscape), StageStatus::Succeeded);
        assert!(run.error.is_none());

        let again = orchestrator.resume(&outcome.run_id()).await.unwrap();
        assert_eq!(again, resumed);
        assert_eq!(generator.draft_calls(), 3);
    }

    #[tokio::test]
    async fn test_generation_failure_is_retried_once() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new().failing_first(1);
        let orchestrator = orchestrator(&search, &generator);

        let outcome = orchestrator.run(request()).await;
        assert!(outcome.is_completed());
        assert_eq!(generator.draft_calls(), 2);
    }

    #[tokio::test]
    async fn test_run_forgets_finished_runs() {
        let orchestrator = orchestrator(&MockSearchSource::new(), &MockGenerator::new());
        let outcome = orchestrator.run(request()).await;
        assert!(outcome.is_completed());
        assert!(matches!(
            orchestrator.status(&outcome.run_id()),
            Err(PipelineError::RunNotFound(_))
        ));

        let failing = self::orchestrator(
            &MockSearchSource::new(),
            &MockGenerator::new().failing_first(2),
        );
        let failed = failing.run(request()).await;
        assert!(failed.error().is_some());
        assert_eq!(failing.runs().unwrap(), vec![failed.run_id()]);
    }

    #[tokio::test]
    async fn test_unresolvable_style_violation_is_retried_once() {
        let generator = MockGenerator::new();
        let profile = StyleProfile {
            prohibited_terms: vec!["tractors".into()],
            ..StyleProfile::default()
        };
        let capabilities = Capabilities::new(
            MockSearchSource::new(),
            generator.clone(),
            MockStyleStore::new().with_profile("acme", profile),
            MockReferenceStore::new(),
        );
        let orchestrator = Orchestrator::new(config(), capabilities, ResultCache::in_memory());

        let outcome = orchestrator
            .run(request().with_style_profile("acme"))
            .await;
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::StyleViolationUnresolved);
        assert_eq!(error.stage, Stage::AdaptingStyle);
        assert_eq!(error.last_successful_stage, Some(Stage::Drafting));
        assert_eq!(error.unresolved_terms, vec!["tractors".to_owned()]);
        assert_eq!(generator.rewrite_calls(), 2);
    }

    #[tokio::test]
    async fn test_unsatisfiable_draft_carries_best_draft() {
        let body = "# Short\n\nToo short to use.";
        let generator = MockGenerator::new().returning(body);
        let orchestrator = orchestrator(&MockSearchSource::new(), &generator);

        let outcome = orchestrator.run(request()).await;
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::ConstraintUnsatisfied);
        assert_eq!(error.stage, Stage::Drafting);
        assert_eq!(error.best_draft.as_ref().map(|draft| draft.body.as_str()), Some(body));
        assert!(
            error
                .unmet
                .iter()
                .any(|unmet| matches!(unmet, UnmetConstraint::Length { .. }))
        );
        assert_eq!(generator.draft_calls(), 1 + config().draft_regenerations);
    }

    #[tokio::test]
    async fn test_partial_landscape_degrades_without_caching() {
        let search = MockSearchSource::new().failing("farming equipment");
        let orchestrator = orchestrator(&search, &MockGenerator::new());

        let run = orchestrator.execute_request(request()).await;
        assert_eq!(run.stage, Stage::Completed, "{:?}", run.error);
        assert!(run.degraded);
        assert!(run.artifacts.landscape.as_ref().unwrap().payload.is_partial());

        let landscape_fp = Fingerprint::landscape(&request()).unwrap();
        let content_fp = Fingerprint::content(&request()).unwrap().derive("client", "");
        let cache = orchestrator.cache();
        assert!(
            cache
                .get::<LandscapeResult>(&landscape_fp, ArtifactKind::Landscape)
                .is_none()
        );
        assert!(cache.get::<Draft>(&content_fp, ArtifactKind::Draft).is_none());
    }

    #[tokio::test]
    async fn test_landscape_past_stage_deadline_degrades() {
        let config = PipelineConfig::builder()
            .retry_delay(Duration::ZERO)
            .stage_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let search = MockSearchSource::new().with_latency(Duration::from_secs(1));
        let orchestrator = Orchestrator::new(
            config,
            mock_capabilities(&search, &MockGenerator::new()),
            ResultCache::in_memory(),
        );

        let run = orchestrator.execute_request(request()).await;
        assert_eq!(run.stage, Stage::Completed, "{:?}", run.error);
        assert!(run.degraded);
        assert_eq!(run.artifacts.landscape.as_ref().unwrap().origin, Origin::Default);
    }

    #[tokio::test]
    async fn test_draft_past_stage_deadline_is_retried_as_generation_failure() {
        let config = PipelineConfig::builder()
            .retry_delay(Duration::ZERO)
            .stage_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let generator = MockGenerator::new().with_latency(Duration::from_secs(1));
        let orchestrator = Orchestrator::new(
            config,
            mock_capabilities(&MockSearchSource::new(), &generator),
            ResultCache::in_memory(),
        );

        let outcome = orchestrator.run(request()).await;
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::GenerationFailed);
        assert_eq!(error.stage, Stage::Drafting);
        assert_eq!(generator.draft_calls(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_recomputes_and_rewrites_cache() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        orchestrator.run(request()).await;
        let run = orchestrator
            .execute_request(request().with_force_refresh(true))
            .await;
        assert_eq!(run.stage, Stage::Completed);
        assert!(
            Stage::WORKING
                .iter()
                .all(|stage| run.status(*stage) == StageStatus::Succeeded)
        );
        assert_eq!(search.total_calls(), 6);
        assert_eq!(generator.draft_calls(), 2);

        let cached = orchestrator.execute_request(request()).await;
        assert_eq!(cached.status(Stage::Optimizing), StageStatus::SkippedViaCache);
        assert_eq!(search.total_calls(), 6);
        assert_eq!(generator.draft_calls(), 2);
    }

    #[tokio::test]
    async fn test_search_outage_degrades_to_defaults() {
        let search = MockSearchSource::new().failing_all();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let run = orchestrator.execute_request(request()).await;
        let outcome = run.outcome();
        assert!(outcome.is_completed(), "{outcome:?}");
        assert!(outcome.is_degraded());

        let landscape = run.artifacts.landscape.as_ref().unwrap();
        assert_eq!(landscape.origin, Origin::Default);
        assert!(landscape.payload.is_default);

        let landscape_fp = Fingerprint::landscape(&request()).unwrap();
        let content_fp = Fingerprint::content(&request()).unwrap().derive("client", "");
        let cache = orchestrator.cache();
        assert!(
            cache
                .get::<LandscapeResult>(&landscape_fp, ArtifactKind::Landscape)
                .is_none()
        );
        assert!(cache.get::<Draft>(&content_fp, ArtifactKind::Draft).is_none());
    }

    #[tokio::test]
    async fn test_search_outage_prefers_stale_landscape() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let warm = orchestrator(&search, &generator);
        let landscape = warm
            .inner
            .analyzer
            .analyze(&request().topic, &request().keywords)
            .await
            .unwrap();

        let cache = ResultCache::in_memory();
        let landscape_fp = Fingerprint::landscape(&request()).unwrap();
        cache
            .put(&landscape_fp, ArtifactKind::Landscape, &landscape, Duration::from_millis(1))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let orchestrator = Orchestrator::new(
            config(),
            mock_capabilities(&MockSearchSource::new().failing_all(), &generator),
            cache,
        );
        let run = orchestrator.execute_request(request()).await;
        assert!(run.outcome().is_completed());
        assert!(run.degraded);

        let artifact = run.artifacts.landscape.unwrap();
        assert_eq!(artifact.origin, Origin::StaleCache);
        assert!(!artifact.payload.is_default);
    }

    #[tokio::test]
    async fn test_invalid_request_fails_at_queued() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let outcome = orchestrator
            .run(PipelineRequest::new("  ", 1200, ["hay"]))
            .await;
        let error = outcome.error().unwrap();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
        assert_eq!(error.stage, Stage::Queued);
        assert_eq!(error.last_successful_stage, None);
        assert_eq!(search.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_discards_stage_result() {
        let search = MockSearchSource::new().with_latency(Duration::from_millis(150));
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let run_id = orchestrator.submit(request()).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(orchestrator.cancel(&run_id).unwrap());

        let run = wait_terminal(&orchestrator, &run_id).await;
        assert_eq!(run.stage, Stage::Cancelled);
        assert!(run.artifacts.landscape.is_none());
        assert_eq!(run.status(Stage::AnalyzingLandscape), StageStatus::Pending);
        assert_eq!(generator.draft_calls(), 0);

        let landscape_fp = Fingerprint::landscape(&request()).unwrap();
        assert!(
            orchestrator
                .cache()
                .get::<LandscapeResult>(&landscape_fp, ArtifactKind::Landscape)
                .is_none()
        );
        assert!(!orchestrator.cancel(&run_id).unwrap());
        assert!(matches!(
            orchestrator.take(&run_id).unwrap(),
            PipelineOutcome::Cancelled { .. }
        ));
    }

    #[tokio::test]
    async fn test_take_removes_finished_runs() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = orchestrator(&search, &generator);

        let run_id = orchestrator.submit(request()).unwrap();
        let outcome = wait_terminal(&orchestrator, &run_id).await.outcome();
        assert!(outcome.is_completed());

        assert_eq!(orchestrator.take(&run_id).unwrap(), outcome);
        assert!(matches!(
            orchestrator.status(&run_id),
            Err(PipelineError::RunNotFound(id)) if id == run_id
        ));
        assert!(orchestrator.runs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_style_profile_is_applied() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new().including("Cheap models are easy to find.");
        let mut profile = StyleProfile {
            tone: Some("friendly".into()),
            prohibited_terms: vec!["cheap".into()],
            ..StyleProfile::default()
        };
        profile
            .replacements
            .insert("cheap".into(), "affordable".into());

        let capabilities = Capabilities::new(
            search,
            generator.clone(),
            MockStyleStore::new().with_profile("acme", profile),
            MockReferenceStore::new(),
        );
        let orchestrator = Orchestrator::new(config(), capabilities, ResultCache::in_memory());

        let outcome = orchestrator
            .run(request().with_style_profile("acme"))
            .await;
        let content = outcome.final_content().unwrap();
        assert!(!text::contains_phrase(&content.body, "cheap"));
        assert!(text::contains_phrase(&content.body, "affordable models"));
        assert_eq!(generator.rewrite_calls(), 1);

        let unknown = orchestrator
            .run(request().with_style_profile("nobody"))
            .await;
        assert!(unknown.is_completed());
        assert!(!unknown.is_degraded());
    }

    #[tokio::test]
    async fn test_reference_store_failure_degrades() {
        let capabilities = Capabilities::new(
            MockSearchSource::new(),
            MockGenerator::new(),
            MockStyleStore::new(),
            MockReferenceStore::new().failing(),
        );
        let orchestrator = Orchestrator::new(config(), capabilities, ResultCache::in_memory());

        let outcome = orchestrator.run(request().with_client("acme")).await;
        assert!(outcome.is_completed());
        assert!(outcome.is_degraded());
    }

    #[tokio::test]
    async fn test_unreachable_cache_is_a_miss() {
        let search = MockSearchSource::new();
        let generator = MockGenerator::new();
        let orchestrator = Orchestrator::new(
            config(),
            mock_capabilities(&search, &generator),
            ResultCache::new(FailingCacheStore),
        );

        assert!(orchestrator.run(request()).await.is_completed());
        let outcome = orchestrator.run(request()).await;
        assert!(outcome.is_completed());
        assert!(!outcome.is_degraded());
        assert_eq!(search.total_calls(), 6);
    }

    #[tokio::test]
    async fn test_file_run_store_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileRunStore::open(dir.path()).unwrap());
        let orchestrator = Orchestrator::with_run_store(
            config(),
            mock_capabilities(&MockSearchSource::new(), &MockGenerator::new()),
            ResultCache::in_memory(),
            store.clone(),
        );

        let run = orchestrator.execute_request(request()).await;
        let stored = store.load(&run.id).unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Completed);
        assert_eq!(stored.statuses, run.statuses);
        assert_eq!(
            stored.outcome().final_content().map(|content| &content.body),
            run.outcome().final_content().map(|content| &content.body)
        );

        let outcome = orchestrator.run(request()).await;
        assert!(outcome.is_completed());
        assert!(store.load(&outcome.run_id()).unwrap().is_none());
    }
}
