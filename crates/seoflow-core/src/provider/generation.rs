//! Generative text capability.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::TRACING_TARGET_GENERATION;
use crate::error::{Error, Result};

/// Instructions sent to a generative capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Role and ground rules.
    pub system: String,
    /// The task itself.
    pub instructions: String,
}

impl Prompt {
    /// Creates a prompt from system and task instructions.
    pub fn new(system: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            instructions: instructions.into(),
        }
    }

    /// Combined character length, for logging.
    pub fn len(&self) -> usize {
        self.system.len() + self.instructions.len()
    }

    /// Returns whether both parts are empty.
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.instructions.is_empty()
    }
}

/// What a generation call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationPurpose {
    /// Produce a new article draft.
    Draft,
    /// Rewrite an existing draft to a voice profile.
    StyleRewrite,
}

/// Structured constraints accompanying a prompt.
///
/// Capabilities that only accept free text may ignore everything except the
/// sampling parameters; the same information is also spelled out in the
/// prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    /// Purpose of the call.
    pub purpose: GenerationPurpose,
    /// Desired length in words.
    #[serde(default)]
    pub target_words: Option<u32>,
    /// Keywords that must appear.
    #[serde(default)]
    pub required_keywords: Vec<String>,
    /// Terms that must not appear.
    #[serde(default)]
    pub prohibited_terms: Vec<String>,
    /// Preferred substitutes for prohibited terms.
    #[serde(default)]
    pub replacements: BTreeMap<String, String>,
    /// Document being rewritten, for style rewrites.
    #[serde(default)]
    pub source_text: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl GenerationConstraints {
    /// Constraints for a fresh draft.
    pub fn draft(target_words: u32, required_keywords: Vec<String>) -> Self {
        Self {
            purpose: GenerationPurpose::Draft,
            target_words: Some(target_words),
            required_keywords,
            prohibited_terms: Vec::new(),
            replacements: BTreeMap::new(),
            source_text: None,
            temperature: 0.7,
            // Roughly 1.5 tokens per word plus headroom.
            max_tokens: Some(target_words.saturating_mul(2)),
        }
    }

    /// Constraints for a style rewrite of `source_text`.
    pub fn rewrite(source_text: impl Into<String>, required_keywords: Vec<String>) -> Self {
        Self {
            purpose: GenerationPurpose::StyleRewrite,
            target_words: None,
            required_keywords,
            prohibited_terms: Vec::new(),
            replacements: BTreeMap::new(),
            source_text: Some(source_text.into()),
            temperature: 0.3,
            max_tokens: None,
        }
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets prohibited terms and their substitutes.
    pub fn with_prohibited_terms(
        mut self,
        terms: Vec<String>,
        replacements: BTreeMap<String, String>,
    ) -> Self {
        self.prohibited_terms = terms;
        self.replacements = replacements;
        self
    }
}

/// A capability that turns a prompt into text.
#[async_trait::async_trait]
pub trait GenerativeCapability: Send + Sync {
    /// Generates text for the prompt under the given constraints.
    async fn invoke(&self, prompt: &Prompt, constraints: &GenerationConstraints) -> Result<String>;
}

/// Generative capability with observability.
///
/// Blank responses are turned into generation failures here so that no stage
/// has to special-case them.
#[derive(Clone)]
pub struct GenerationService {
    capability: Arc<dyn GenerativeCapability>,
}

impl fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationService").finish_non_exhaustive()
    }
}

impl GenerationService {
    /// Create a new generation service from a capability.
    pub fn from_capability<G>(capability: G) -> Self
    where
        G: GenerativeCapability + 'static,
    {
        Self {
            capability: Arc::new(capability),
        }
    }

    /// Create a new generation service from an already shared capability.
    pub fn from_shared(capability: Arc<dyn GenerativeCapability>) -> Self {
        Self { capability }
    }

    /// Generate text for the prompt.
    pub async fn invoke(
        &self,
        prompt: &Prompt,
        constraints: &GenerationConstraints,
    ) -> Result<String> {
        let started_at = Timestamp::now();

        tracing::debug!(
            target: TRACING_TARGET_GENERATION,
            purpose = constraints.purpose.as_ref(),
            prompt_length = prompt.len(),
            target_words = constraints.target_words,
            temperature = constraints.temperature,
            "Processing generation request"
        );

        let result = self
            .capability
            .invoke(prompt, constraints)
            .await
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(Error::generation_failed().with_message("capability returned empty text"))
                } else {
                    Ok(text)
                }
            });
        let elapsed = Timestamp::now().duration_since(started_at);

        match &result {
            Ok(text) => {
                tracing::debug!(
                    target: TRACING_TARGET_GENERATION,
                    purpose = constraints.purpose.as_ref(),
                    content_length = text.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Generation successful"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_GENERATION,
                    purpose = constraints.purpose.as_ref(),
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Generation failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl GenerativeCapability for Echo {
        async fn invoke(&self, _: &Prompt, _: &GenerationConstraints) -> Result<String> {
            Ok(self.0.to_owned())
        }
    }

    #[tokio::test]
    async fn test_blank_output_is_generation_failure() {
        let service = GenerationService::from_capability(Echo("  \n"));
        let prompt = Prompt::new("system", "write");
        let constraints = GenerationConstraints::draft(500, vec!["hay".into()]);

        let error = service.invoke(&prompt, &constraints).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::GenerationFailed);
    }

    #[tokio::test]
    async fn test_passes_text_through() {
        let service = GenerationService::from_capability(Echo("# Title"));
        let prompt = Prompt::new("system", "write");
        let constraints = GenerationConstraints::rewrite("# Title", Vec::new());

        let text = service.invoke(&prompt, &constraints).await.unwrap();
        assert_eq!(text, "# Title");
    }

    #[test]
    fn test_draft_constraints() {
        let constraints = GenerationConstraints::draft(1200, vec!["hay".into()]);
        assert_eq!(constraints.purpose, GenerationPurpose::Draft);
        assert_eq!(constraints.max_tokens, Some(2400));
        assert!(constraints.source_text.is_none());
    }
}
