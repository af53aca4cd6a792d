//! Style adaptation.

use seoflow_core::provider::{GenerationConstraints, GenerationService};
use seoflow_core::text::{self, Outline};
use seoflow_core::types::{AdaptedDraft, Draft, StyleProfile, Tone};

use super::{DraftBrief, prompt};
use crate::{PipelineConfig, PipelineError, PipelineResult, Relax, TRACING_TARGET_STAGE};

const DEFAULT_TEMPERATURE: f32 = 0.3;
const STRICT_TEMPERATURE: f32 = 0.1;

/// Parameters for one adaptation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptParams {
    /// Sampling temperature of the rewrite.
    pub temperature: f32,
    /// Terms the previous attempt failed to remove.
    pub flagged_terms: Vec<String>,
}

impl Default for AdaptParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            flagged_terms: Vec::new(),
        }
    }
}

impl Relax for AdaptParams {
    fn relax(&self, error: &PipelineError, _attempt: u32) -> Self {
        let mut next = self.clone();
        next.temperature = STRICT_TEMPERATURE;
        if let PipelineError::StyleViolationUnresolved { terms } = error {
            next.flagged_terms = terms.clone();
        }
        next
    }
}

/// What a rewrite must keep from the draft.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Invariants<'a> {
    original: &'a str,
    keywords: &'a [String],
    window: (usize, usize),
}

impl<'a> Invariants<'a> {
    pub(crate) fn new(original: &'a str, keywords: &'a [String], window: (usize, usize)) -> Self {
        Self {
            original,
            keywords,
            window,
        }
    }

    /// Distance in words from the length window; zero inside it.
    fn outside_window(&self, words: usize) -> usize {
        let (min, max) = self.window;
        min.saturating_sub(words) + words.saturating_sub(max)
    }

    /// Returns a description of every broken invariant.
    ///
    /// Heading levels must be unchanged, no keyword may occur less often,
    /// every figure must survive, and the length may not leave the window
    /// (or drift further from it when the original was already outside).
    pub(crate) fn breaches(&self, candidate: &str) -> Vec<String> {
        let mut breaches = Vec::new();

        if Outline::parse(self.original).levels() != Outline::parse(candidate).levels() {
            breaches.push("heading structure changed".to_owned());
        }

        for keyword in self.keywords {
            let before = text::count_occurrences(self.original, keyword);
            let after = text::count_occurrences(candidate, keyword);
            if after < before {
                breaches.push(format!("\"{keyword}\" dropped from {before} to {after} occurrences"));
            }
        }

        let kept = text::numeric_facts(candidate);
        let lost: Vec<String> = text::numeric_facts(self.original)
            .into_iter()
            .filter(|fact| kept.binary_search(fact).is_err())
            .collect();
        if !lost.is_empty() {
            breaches.push(format!("figures lost: {}", lost.join(", ")));
        }

        let words = text::word_count(candidate);
        let drift = self.outside_window(words);
        if drift > 0 && drift > self.outside_window(text::word_count(self.original)) {
            let (min, max) = self.window;
            breaches.push(format!("length {words} outside {min}..={max} words"));
        }

        breaches
    }
}

/// Rewrites drafts to a client's voice and removes prohibited terms.
///
/// The generative rewrite is only accepted when it keeps the draft's
/// structure, keyword occurrences, figures and length band; otherwise the
/// draft itself is used. Prohibited terms left after that are replaced
/// locally, one at a time, as long as each replacement keeps the same
/// invariants.
#[derive(Debug, Clone)]
pub struct StyleAdapter {
    generation: GenerationService,
    config: PipelineConfig,
}

impl StyleAdapter {
    /// Creates an adapter over a generation service.
    pub fn new(generation: GenerationService, config: &PipelineConfig) -> Self {
        Self {
            generation,
            config: config.clone(),
        }
    }

    /// Adapts a draft to the brief's profile.
    ///
    /// A neutral profile passes the draft through unchanged. The profile's
    /// own tone takes precedence over the requested one.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StyleViolationUnresolved`] when a prohibited term
    /// cannot be removed without breaking an invariant.
    pub async fn adapt(&self, draft: &Draft, brief: &DraftBrief) -> PipelineResult<AdaptedDraft> {
        self.adapt_with(draft, brief, AdaptParams::default()).await
    }

    /// Adapts a draft starting from explicit parameters.
    pub async fn adapt_with(
        &self,
        draft: &Draft,
        brief: &DraftBrief,
        params: AdaptParams,
    ) -> PipelineResult<AdaptedDraft> {
        let profile = &brief.profile;
        if profile.is_neutral() {
            tracing::debug!(
                target: TRACING_TARGET_STAGE,
                "Neutral style profile, passing draft through"
            );
            return Ok(AdaptedDraft::passthrough(draft));
        }

        let tone = profile.tone.clone().unwrap_or_else(|| brief.tone.clone());
        let invariants = Invariants::new(
            &draft.body,
            &brief.keywords,
            self.config.length_window(brief.target_length),
        );

        let candidate = match self.rewrite(draft, profile, &tone, &brief.keywords, &params).await {
            Ok(rewritten) => {
                let breaches = invariants.breaches(&rewritten);
                if breaches.is_empty() {
                    rewritten
                } else {
                    tracing::warn!(
                        target: TRACING_TARGET_STAGE,
                        breaches = %breaches.join("; "),
                        "Rewrite broke draft invariants, keeping original wording"
                    );
                    draft.body.clone()
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_STAGE,
                    error = %error,
                    "Style rewrite failed, keeping original wording"
                );
                draft.body.clone()
            }
        };

        let (body, unresolved) = scrub(&invariants, candidate, profile);
        if !unresolved.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET_STAGE,
                terms = %unresolved.join(", "),
                "Prohibited terms could not be removed"
            );
            return Err(PipelineError::StyleViolationUnresolved { terms: unresolved });
        }

        let removed_terms = profile
            .prohibited_terms
            .iter()
            .filter(|term| text::contains_phrase(&draft.body, term))
            .cloned()
            .collect();

        Ok(AdaptedDraft {
            word_count: text::word_count(&body),
            body,
            tone: Some(tone),
            removed_terms,
            passthrough: false,
        })
    }

    async fn rewrite(
        &self,
        draft: &Draft,
        profile: &StyleProfile,
        tone: &Tone,
        keywords: &[String],
        params: &AdaptParams,
    ) -> PipelineResult<String> {
        let prompt = prompt::rewrite_prompt(draft, profile, tone, keywords, params);
        let constraints = GenerationConstraints::rewrite(draft.body.clone(), keywords.to_vec())
            .with_temperature(params.temperature)
            .with_prohibited_terms(profile.prohibited_terms.clone(), profile.replacements.clone());

        let rewritten = tokio::time::timeout(
            self.config.generation_timeout,
            self.generation.invoke(&prompt, &constraints),
        )
        .await
        .map_err(|_| PipelineError::GenerationFailed("style rewrite timed out".into()))?
        .map_err(|error| PipelineError::GenerationFailed(error.to_string()))?;

        Ok(text::strip_code_fences(&rewritten))
    }
}

/// Replaces prohibited terms still present in `candidate`, longest first.
///
/// Returns the scrubbed body and the terms that could not be removed.
fn scrub(
    invariants: &Invariants<'_>,
    mut candidate: String,
    profile: &StyleProfile,
) -> (String, Vec<String>) {
    let mut terms: Vec<&String> = profile
        .prohibited_terms
        .iter()
        .filter(|term| !term.trim().is_empty())
        .collect();
    terms.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    terms.dedup_by(|a, b| text::normalize(a) == text::normalize(b));

    let mut unresolved = Vec::new();
    for term in terms {
        if !text::contains_phrase(&candidate, term) {
            continue;
        }

        let (scrubbed, replaced) =
            text::replace_phrase(&candidate, term, profile.replacement_for(term));
        if replaced == 0
            || text::contains_phrase(&scrubbed, term)
            || !invariants.breaches(&scrubbed).is_empty()
        {
            unresolved.push(term.clone());
            continue;
        }

        candidate = scrubbed;
    }

    (candidate, unresolved)
}
