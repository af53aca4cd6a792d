//! Client style profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{StyleProfileRef, Tone};

/// Target voice for a client.
///
/// A profile with no tone, voice attributes or prohibited terms is *neutral*
/// and leaves drafts untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Reference this profile was loaded from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<StyleProfileRef>,
    /// Preferred tone; overrides the request tone during adaptation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Free-form voice attributes ("plain-spoken", "no jargon").
    #[serde(default)]
    pub voice: Vec<String>,
    /// Intended readership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Terms that must not appear in published content.
    #[serde(default)]
    pub prohibited_terms: Vec<String>,
    /// Preferred substitutes for prohibited terms, keyed by lower-case term.
    #[serde(default)]
    pub replacements: BTreeMap<String, String>,
    /// Domain vocabulary the client wants used.
    #[serde(default)]
    pub industry_terms: Vec<String>,
    /// Themes the client wants emphasized.
    #[serde(default)]
    pub key_themes: Vec<String>,
}

impl StyleProfile {
    /// The neutral profile used when none is configured.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Returns whether adaptation would have nothing to do.
    pub fn is_neutral(&self) -> bool {
        self.tone.is_none() && self.voice.is_empty() && self.prohibited_terms.is_empty()
    }

    /// Replacement for a prohibited term; empty when the term should simply go.
    pub fn replacement_for(&self, term: &str) -> &str {
        self.replacements
            .get(&crate::text::normalize(term))
            .map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_profile() {
        assert!(StyleProfile::neutral().is_neutral());

        let profile = StyleProfile {
            industry_terms: vec!["PTO".into()],
            ..Default::default()
        };
        assert!(profile.is_neutral());

        let profile = StyleProfile {
            prohibited_terms: vec!["cheap".into()],
            ..Default::default()
        };
        assert!(!profile.is_neutral());
    }

    #[test]
    fn test_replacement_lookup() {
        let mut profile = StyleProfile::neutral();
        profile.replacements.insert("cheap".into(), "affordable".into());
        assert_eq!(profile.replacement_for("Cheap"), "affordable");
        assert_eq!(profile.replacement_for("basically"), "");
    }

    #[test]
    fn test_deserialize_partial_profile() {
        let profile: StyleProfile =
            serde_json::from_str(r#"{"tone":"friendly","prohibited_terms":["cheap"]}"#).unwrap();
        assert_eq!(profile.tone, Some(Tone::Friendly));
        assert!(profile.voice.is_empty());
    }
}
