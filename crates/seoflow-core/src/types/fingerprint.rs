//! Deterministic cache keys derived from request inputs.
//!
//! Two fingerprint scopes exist. The *landscape* fingerprint covers only the
//! keyword set and topic, so landscape and competitor results are shared by
//! every request about the same subject. The *content* fingerprint adds tone,
//! style profile, target length and content type, and keys drafts and final
//! content.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{PipelineRequest, StyleProfileRef, Tone};
use crate::error::{Error, Result};
use crate::text::normalize;

const FIELD_SEPARATOR: char = '\u{1e}';
const VALUE_SEPARATOR: char = '\u{1f}';

/// Hex-encoded SHA-256 digest over normalized inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Landscape-scoped fingerprint for a request.
    pub fn landscape(request: &PipelineRequest) -> Result<Self> {
        FingerprintBuilder::new(request.keywords.as_slice(), &request.topic).build()
    }

    /// Content-scoped fingerprint for a request.
    pub fn content(request: &PipelineRequest) -> Result<Self> {
        let base = FingerprintBuilder::new(request.keywords.as_slice(), &request.topic)
            .tone(&request.tone)
            .style_profile(request.style_profile.as_ref())
            .build()?;

        Ok(base
            .derive("target_length", &request.target_length.to_string())
            .derive("content_type", request.content_type.as_ref()))
    }

    /// Derives a child fingerprint scoped by an additional named value.
    pub fn derive(&self, name: &str, value: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hasher.update([FIELD_SEPARATOR as u8]);
        hasher.update(name.as_bytes());
        hasher.update([VALUE_SEPARATOR as u8]);
        hasher.update(normalize(value).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened digest for log output.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds a [`Fingerprint`] from keywords, topic and optional tone and style.
///
/// Keywords are trimmed, lower-cased, whitespace-collapsed, de-duplicated and
/// sorted, so ordering and casing never change the digest.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    keywords: Vec<String>,
    topic: String,
    tone: Option<String>,
    style_profile: Option<String>,
}

impl FingerprintBuilder {
    /// Starts a builder over the keyword set and topic.
    pub fn new<S: AsRef<str>>(keywords: &[S], topic: &str) -> Self {
        let mut keywords: Vec<String> = keywords
            .iter()
            .map(|keyword| normalize(keyword.as_ref()))
            .filter(|keyword| !keyword.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();

        Self {
            keywords,
            topic: normalize(topic),
            tone: None,
            style_profile: None,
        }
    }

    /// Includes the tone in the digest.
    pub fn tone(mut self, tone: &Tone) -> Self {
        self.tone = Some(tone.label());
        self
    }

    /// Includes the style profile reference in the digest, when present.
    pub fn style_profile(mut self, profile: Option<&StyleProfileRef>) -> Self {
        self.style_profile = profile.map(|profile| normalize(profile));
        self
    }

    /// Computes the fingerprint.
    pub fn build(self) -> Result<Fingerprint> {
        if self.keywords.is_empty() {
            return Err(Error::invalid_input().with_message("keyword set must not be empty"));
        }
        if self.topic.is_empty() {
            return Err(Error::invalid_input().with_message("topic must not be blank"));
        }

        let mut hasher = Sha256::new();
        hasher.update(b"topic");
        hasher.update([VALUE_SEPARATOR as u8]);
        hasher.update(self.topic.as_bytes());

        hasher.update([FIELD_SEPARATOR as u8]);
        hasher.update(b"keywords");
        for keyword in &self.keywords {
            hasher.update([VALUE_SEPARATOR as u8]);
            hasher.update(keyword.as_bytes());
        }

        if let Some(tone) = &self.tone {
            hasher.update([FIELD_SEPARATOR as u8]);
            hasher.update(b"tone");
            hasher.update([VALUE_SEPARATOR as u8]);
            hasher.update(tone.as_bytes());
        }

        if let Some(profile) = &self.style_profile {
            hasher.update([FIELD_SEPARATOR as u8]);
            hasher.update(b"style_profile");
            hasher.update([VALUE_SEPARATOR as u8]);
            hasher.update(profile.as_bytes());
        }

        Ok(Fingerprint(hex::encode(hasher.finalize())))
    }
}

/// Convenience wrapper over [`FingerprintBuilder`].
pub fn fingerprint<S: AsRef<str>>(
    keywords: &[S],
    topic: &str,
    tone: Option<&Tone>,
    style_profile: Option<&StyleProfileRef>,
) -> Result<Fingerprint> {
    let mut builder = FingerprintBuilder::new(keywords, topic).style_profile(style_profile);
    if let Some(tone) = tone {
        builder = builder.tone(tone);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ContentType;

    #[test]
    fn test_order_and_case_insensitive() {
        let a = fingerprint(&["Compact Tractors", "farm  equipment"], "Modern Farming", None, None);
        let b = fingerprint(&["farm equipment", "compact tractors"], "  modern FARMING", None, None);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn test_duplicates_do_not_change_digest() {
        let a = fingerprint(&["hay", "Hay ", "tractor"], "Farming", None, None).unwrap();
        let b = fingerprint(&["tractor", "hay"], "farming", None, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tone_and_style_broaden_the_key() {
        let keywords = ["compact tractors"];
        let narrow = fingerprint(&keywords, "Farming", None, None).unwrap();
        let toned = fingerprint(&keywords, "Farming", Some(&Tone::Casual), None).unwrap();
        let styled = fingerprint(
            &keywords,
            "Farming",
            Some(&Tone::Casual),
            Some(&StyleProfileRef::new("acme")),
        )
        .unwrap();

        assert_ne!(narrow, toned);
        assert_ne!(toned, styled);
        assert_eq!(narrow.as_str().len(), 64);
    }

    #[test]
    fn test_empty_inputs_are_invalid() {
        let empty: [&str; 0] = [];
        let error = fingerprint(&empty, "Farming", None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);

        let error = fingerprint(&["  "], "Farming", None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);

        let error = fingerprint(&["hay"], " \t", None, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_request_scopes() {
        let request = PipelineRequest::new("Farming", 1200, ["hay"]);
        let longer = PipelineRequest::new("Farming", 1500, ["hay"]);
        let landing = request.clone().with_content_type(ContentType::LandingPage);

        assert_eq!(
            Fingerprint::landscape(&request).unwrap(),
            Fingerprint::landscape(&longer).unwrap()
        );
        assert_ne!(
            Fingerprint::content(&request).unwrap(),
            Fingerprint::content(&longer).unwrap()
        );
        assert_ne!(
            Fingerprint::content(&request).unwrap(),
            Fingerprint::content(&landing).unwrap()
        );

        let refresh = request.clone().with_force_refresh(true);
        assert_eq!(
            Fingerprint::content(&request).unwrap(),
            Fingerprint::content(&refresh).unwrap()
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let base = fingerprint(&["hay"], "Farming", None, None).unwrap();
        assert_eq!(base.derive("client", "Acme"), base.derive("client", "acme"));
        assert_ne!(base.derive("client", "acme"), base.derive("client", "other"));
    }
}
