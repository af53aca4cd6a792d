//! Draft generation and validation.

use std::time::Duration;

use seoflow_core::ErrorKind;
use seoflow_core::provider::{GenerationConstraints, GenerationService};
use seoflow_core::text::{self, Outline};
use seoflow_core::types::{CompetitorInsight, Draft, LandscapeResult, UnmetConstraint};

use super::{DraftBrief, prompt};
use crate::{PipelineConfig, PipelineError, PipelineResult, Relax, RetryPolicy, TRACING_TARGET_STAGE};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const TEMPERATURE_STEP: f32 = 0.3;
const MIN_TEMPERATURE: f32 = 0.1;

/// Parameters for one drafting attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Whether landscape and competitor findings go into the prompt.
    pub include_grounding: bool,
    /// Corrections derived from the previous attempt.
    pub feedback: Vec<String>,
    /// Closest draft so far and the constraints it fails.
    pub best: Option<(Draft, Vec<UnmetConstraint>)>,
}

impl Default for DraftParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            include_grounding: true,
            feedback: Vec::new(),
            best: None,
        }
    }
}

impl Relax for DraftParams {
    fn relax(&self, error: &PipelineError, _attempt: u32) -> Self {
        let mut next = self.clone();
        match error {
            PipelineError::ConstraintUnsatisfied { best_draft, unmet } => {
                next.feedback = unmet.iter().map(feedback).collect();
                next.best = Some((best_draft.as_ref().clone(), unmet.clone()));
            }
            _ => {
                // A failed call gets a simpler, more conservative prompt.
                next.temperature = (self.temperature - TEMPERATURE_STEP).max(MIN_TEMPERATURE);
                next.include_grounding = false;
            }
        }
        next
    }
}

fn feedback(constraint: &UnmetConstraint) -> String {
    match constraint {
        UnmetConstraint::Length { actual, min, max } => {
            format!("The draft had {actual} words; write between {min} and {max} words.")
        }
        UnmetConstraint::MissingKeywords { keywords } => format!(
            "The draft never used {}; use each of them several times.",
            keywords.join(", ")
        ),
        UnmetConstraint::MissingTitle => "Start the document with a single '# ' title line.".into(),
        UnmetConstraint::FlatStructure { sections, required } => format!(
            "The draft had {sections} '## ' sections; use at least {required}."
        ),
    }
}

/// Orders drafts by how close they are to acceptable: fewer unmet
/// constraints first, then smaller distance from the target length.
fn closeness(draft: &Draft, unmet: &[UnmetConstraint], target: u32) -> (usize, usize) {
    (unmet.len(), draft.word_count.abs_diff(target as usize))
}

/// Generates drafts and validates them against hard constraints, feeding the
/// violations back into a bounded number of regenerations.
#[derive(Debug, Clone)]
pub struct DraftGenerator {
    generation: GenerationService,
    config: PipelineConfig,
    policy: RetryPolicy,
}

impl DraftGenerator {
    /// Creates a generator over a generation service.
    pub fn new(generation: GenerationService, config: &PipelineConfig) -> Self {
        Self {
            generation,
            policy: RetryPolicy::new(
                config.draft_regenerations,
                Duration::ZERO,
                vec![ErrorKind::ConstraintUnsatisfied],
            ),
            config: config.clone(),
        }
    }

    /// Generates a validated draft.
    ///
    /// # Errors
    ///
    /// [`PipelineError::GenerationFailed`] when the capability errors, times
    /// out or returns nothing, and [`PipelineError::ConstraintUnsatisfied`]
    /// (carrying the closest draft) when every regeneration still violates a
    /// constraint.
    pub async fn generate(
        &self,
        brief: &DraftBrief,
        landscape: &LandscapeResult,
        insight: &CompetitorInsight,
    ) -> PipelineResult<Draft> {
        self.generate_with(brief, landscape, insight, DraftParams::default())
            .await
    }

    /// Generates a validated draft starting from explicit parameters.
    pub async fn generate_with(
        &self,
        brief: &DraftBrief,
        landscape: &LandscapeResult,
        insight: &CompetitorInsight,
        params: DraftParams,
    ) -> PipelineResult<Draft> {
        self.policy
            .execute(params, |params, attempt| {
                self.attempt(brief, landscape, insight, params, attempt)
            })
            .await
    }

    async fn attempt(
        &self,
        brief: &DraftBrief,
        landscape: &LandscapeResult,
        insight: &CompetitorInsight,
        params: DraftParams,
        attempt: u32,
    ) -> PipelineResult<Draft> {
        let window = self.config.length_window(brief.target_length);
        let prompt = prompt::draft_prompt(
            brief,
            landscape,
            insight,
            window,
            self.config.min_sections,
            &params,
        );
        let constraints = GenerationConstraints::draft(brief.target_length, brief.keywords.clone())
            .with_temperature(params.temperature)
            .with_prohibited_terms(
                brief.profile.prohibited_terms.clone(),
                brief.profile.replacements.clone(),
            );

        let timeout = self.config.generation_timeout;
        let generated = tokio::time::timeout(timeout, self.generation.invoke(&prompt, &constraints))
            .await
            .map_err(|_| {
                PipelineError::GenerationFailed(format!(
                    "generation timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|error| PipelineError::GenerationFailed(error.to_string()))?;

        let draft = Draft::new(text::strip_code_fences(&generated), attempt + 1);
        let unmet = self.validate(&draft, brief);

        if unmet.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_STAGE,
                attempt = draft.attempt,
                word_count = draft.word_count,
                "Draft accepted"
            );
            return Ok(draft);
        }

        tracing::warn!(
            target: TRACING_TARGET_STAGE,
            attempt = draft.attempt,
            word_count = draft.word_count,
            unmet = unmet.len(),
            "Draft rejected"
        );

        let (best_draft, unmet) = match params.best {
            Some((best, best_unmet))
                if closeness(&best, &best_unmet, brief.target_length)
                    <= closeness(&draft, &unmet, brief.target_length) =>
            {
                (best, best_unmet)
            }
            _ => (draft, unmet),
        };

        Err(PipelineError::ConstraintUnsatisfied {
            best_draft: Box::new(best_draft),
            unmet,
        })
    }

    /// Lists the hard constraints a draft fails.
    pub fn validate(&self, draft: &Draft, brief: &DraftBrief) -> Vec<UnmetConstraint> {
        let mut unmet = Vec::new();

        let (min, max) = self.config.length_window(brief.target_length);
        if !(min..=max).contains(&draft.word_count) {
            unmet.push(UnmetConstraint::Length {
                actual: draft.word_count,
                min,
                max,
            });
        }

        let missing: Vec<String> = brief
            .keywords
            .iter()
            .filter(|keyword| !text::contains_phrase(&draft.body, keyword))
            .cloned()
            .collect();
        if !missing.is_empty() {
            unmet.push(UnmetConstraint::MissingKeywords { keywords: missing });
        }

        let outline = Outline::parse(&draft.body);
        if outline.title().is_none() {
            unmet.push(UnmetConstraint::MissingTitle);
        }

        let sections = outline.count_level(2);
        if sections < self.config.min_sections {
            unmet.push(UnmetConstraint::FlatStructure {
                sections,
                required: self.config.min_sections,
            });
        }

        unmet
    }
}

#[cfg(test)]
mod tests {
    use seoflow_core::types::{PipelineRequest, StyleProfile};
    use seoflow_test::MockGenerator;

    use super::*;

    fn brief() -> DraftBrief {
        DraftBrief::new(
            &PipelineRequest::new(
                "Compact Tractors for Modern Farming",
                1200,
                ["compact tractors", "sub-compact tractors", "farming equipment"],
            ),
            StyleProfile::neutral(),
        )
    }

    fn generator(mock: &MockGenerator) -> DraftGenerator {
        DraftGenerator::new(
            GenerationService::from_capability(mock.clone()),
            &PipelineConfig::default(),
        )
    }

    fn landscape(brief: &DraftBrief) -> LandscapeResult {
        LandscapeResult::neutral(&brief.topic, &brief.keywords, brief.target_length)
    }

    #[tokio::test]
    async fn test_generates_valid_draft() {
        let mock = MockGenerator::new();
        let brief = brief();
        let draft = generator(&mock)
            .generate(&brief, &landscape(&brief), &CompetitorInsight::default())
            .await
            .unwrap();

        assert!((1020..=1380).contains(&draft.word_count));
        for keyword in &brief.keywords {
            assert!(text::contains_phrase(&draft.body, keyword), "missing {keyword}");
        }
        assert_eq!(draft.attempt, 1);
        assert_eq!(mock.draft_calls(), 1);
    }

    #[tokio::test]
    async fn test_regenerates_then_reports_best_draft() {
        let mock = MockGenerator::new().returning("# Tractors\n\nToo short.");
        let brief = brief();
        let error = generator(&mock)
            .generate(&brief, &landscape(&brief), &CompetitorInsight::default())
            .await
            .unwrap_err();

        let PipelineError::ConstraintUnsatisfied { best_draft, unmet } = error else {
            panic!("expected ConstraintUnsatisfied");
        };
        assert_eq!(mock.draft_calls(), 3);
        assert_eq!(best_draft.attempt, 1);
        assert!(unmet.iter().any(|u| matches!(u, UnmetConstraint::Length { .. })));
        assert!(unmet.iter().any(|u| matches!(u, UnmetConstraint::MissingKeywords { .. })));
        assert!(unmet.iter().any(|u| matches!(u, UnmetConstraint::FlatStructure { .. })));
        assert!(!unmet.contains(&UnmetConstraint::MissingTitle));
    }

    #[tokio::test]
    async fn test_feedback_reaches_regeneration() {
        let mock = MockGenerator::new().returning("No title here.");
        let brief = brief();
        let _ = generator(&mock)
            .generate(&brief, &landscape(&brief), &CompetitorInsight::default())
            .await;

        let prompt = mock.last_prompt().unwrap();
        assert!(prompt.instructions.contains("previous attempt was rejected"));
        assert!(prompt.instructions.contains("'# ' title line"));
    }

    #[tokio::test]
    async fn test_capability_failure_is_generation_failed() {
        let mock = MockGenerator::new().failing_first(1);
        let brief = brief();
        let error = generator(&mock)
            .generate(&brief, &landscape(&brief), &CompetitorInsight::default())
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::GenerationFailed(_)));
        assert_eq!(mock.draft_calls(), 1);
    }

    #[test]
    fn test_relax_after_generation_failure() {
        let params = DraftParams::default()
            .relax(&PipelineError::GenerationFailed("empty".into()), 0);
        assert!(!params.include_grounding);
        assert!(params.temperature < DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_fenced_output_is_unwrapped() {
        let generator = DraftGenerator::new(
            GenerationService::from_capability(MockGenerator::new()),
            &PipelineConfig::default(),
        );
        let draft = Draft::new(text::strip_code_fences("```markdown\n# T\n## A\n## B\n```"), 1);
        let unmet = generator.validate(&draft, &brief());
        assert!(!unmet.contains(&UnmetConstraint::MissingTitle));
        assert!(!unmet.iter().any(|u| matches!(u, UnmetConstraint::FlatStructure { .. })));
    }
}
