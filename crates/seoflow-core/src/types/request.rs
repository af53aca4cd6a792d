//! Pipeline request and its input vocabulary.

use std::fmt;
use std::str::FromStr;

use derive_more::{AsRef, Deref, Display};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

/// Smallest target length accepted for a request.
pub const MIN_TARGET_LENGTH: u32 = 100;

/// Largest target length accepted for a request.
pub const MAX_TARGET_LENGTH: u32 = 20_000;

/// Voice the finished article should be written in.
///
/// Known tones parse case-insensitively; anything else is kept verbatim as a
/// free-text label.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Tone {
    #[default]
    Professional,
    Conversational,
    Casual,
    Authoritative,
    Friendly,
    Persuasive,
    Custom(String),
}

impl Tone {
    /// Canonical lower-case label.
    pub fn label(&self) -> String {
        match self {
            Self::Professional => "professional".into(),
            Self::Conversational => "conversational".into(),
            Self::Casual => "casual".into(),
            Self::Authoritative => "authoritative".into(),
            Self::Friendly => "friendly".into(),
            Self::Persuasive => "persuasive".into(),
            Self::Custom(label) => crate::text::normalize(label),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<String> for Tone {
    fn from(value: String) -> Self {
        match crate::text::normalize(&value).as_str() {
            "professional" => Self::Professional,
            "conversational" => Self::Conversational,
            "casual" => Self::Casual,
            "authoritative" => Self::Authoritative,
            "friendly" => Self::Friendly,
            "persuasive" => Self::Persuasive,
            _ => Self::Custom(value.trim().to_owned()),
        }
    }
}

impl From<&str> for Tone {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<Tone> for String {
    fn from(value: Tone) -> Self {
        value.label()
    }
}

impl FromStr for Tone {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Kind of document being produced; each has its own structure guidance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, IntoStaticStr, EnumString, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Long-form informational article.
    #[default]
    Article,
    /// Conversion-focused landing page.
    LandingPage,
    /// Reflective journal or blog entry.
    Journal,
    /// Customer success story.
    SuccessStory,
}

impl ContentType {
    /// Structure guidance handed to the generative capability.
    pub fn structure_guidance(self) -> &'static str {
        match self {
            Self::Article => {
                "Open with an engaging introduction, cover the topic in clearly separated \
                 sections with descriptive H2 headings (H3 for sub-points), and finish with \
                 a conclusion that summarizes the key takeaways."
            }
            Self::LandingPage => {
                "Lead with a strong value proposition, follow with benefit-focused sections, \
                 include social proof, and close with a clear call to action."
            }
            Self::Journal => {
                "Write in a reflective, narrative voice: set the context, walk through the \
                 experience in chronological sections, and end with lessons learned."
            }
            Self::SuccessStory => {
                "Describe the customer and their challenge, the solution that was applied, \
                 the measurable results, and close with a quote or testimonial."
            }
        }
    }
}

/// Opaque reference to a client style profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRef, Deref, Display, Serialize, Deserialize)]
#[as_ref(str)]
#[serde(transparent)]
pub struct StyleProfileRef(String);

impl StyleProfileRef {
    /// Creates a new style profile reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Opaque reference to a client whose reference documents ground the
/// competitor analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRef, Deref, Display, Serialize, Deserialize)]
#[as_ref(str)]
#[serde(transparent)]
pub struct ClientRef(String);

impl ClientRef {
    /// Creates a new client reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// A request to produce one optimized article. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Subject of the article.
    pub topic: String,
    /// Desired voice.
    #[serde(default)]
    pub tone: Tone,
    /// Target length in words.
    pub target_length: u32,
    /// Ordered keyword set; the first keyword is the primary one.
    pub keywords: Vec<String>,
    /// Optional client style profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_profile: Option<StyleProfileRef>,
    /// Optional client whose reference documents are competitors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientRef>,
    /// Kind of document to produce.
    #[serde(default)]
    pub content_type: ContentType,
    /// Recompute every stage instead of reading cached results. Fresh
    /// results are still written to the cache.
    #[serde(default)]
    pub force_refresh: bool,
}

impl PipelineRequest {
    /// Creates a request with the default tone and content type.
    pub fn new<I, S>(topic: impl Into<String>, target_length: u32, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topic: topic.into(),
            tone: Tone::default(),
            target_length,
            keywords: keywords.into_iter().map(Into::into).collect(),
            style_profile: None,
            client: None,
            content_type: ContentType::default(),
            force_refresh: false,
        }
    }

    /// Sets the tone.
    pub fn with_tone(mut self, tone: impl Into<Tone>) -> Self {
        self.tone = tone.into();
        self
    }

    /// Sets the style profile reference.
    pub fn with_style_profile(mut self, profile: impl Into<String>) -> Self {
        self.style_profile = Some(StyleProfileRef::new(profile));
        self
    }

    /// Sets the client reference.
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(ClientRef::new(client));
        self
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Bypasses cached results for this request.
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// The first keyword, which anchors titles and search queries.
    pub fn primary_keyword(&self) -> Option<&str> {
        self.keywords
            .iter()
            .map(|keyword| keyword.trim())
            .find(|keyword| !keyword.is_empty())
    }

    /// Search query combining the topic with the primary keyword.
    pub fn search_query(&self) -> String {
        match self.primary_keyword() {
            Some(keyword) => format!("{} {}", self.topic.trim(), keyword),
            None => self.topic.trim().to_owned(),
        }
    }

    /// Validates the request, failing with an invalid input error.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::invalid_input().with_message("topic must not be blank"));
        }

        if self.keywords.is_empty() {
            return Err(Error::invalid_input().with_message("keyword set must not be empty"));
        }

        if let Some(position) = self.keywords.iter().position(|k| k.trim().is_empty()) {
            return Err(Error::invalid_input()
                .with_message(format!("keyword at position {position} is blank")));
        }

        if !(MIN_TARGET_LENGTH..=MAX_TARGET_LENGTH).contains(&self.target_length) {
            return Err(Error::invalid_input().with_message(format!(
                "target length {} is outside {MIN_TARGET_LENGTH}..={MAX_TARGET_LENGTH}",
                self.target_length
            )));
        }

        Ok(())
    }
}
