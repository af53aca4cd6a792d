//! Drafts, final content and the optimization report.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, IntoStaticStr};

use super::Tone;
use crate::text::{ContentMetrics, Outline, word_count};

/// A generated article body in markdown, title included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Markdown document.
    pub body: String,
    /// Words in the body.
    pub word_count: usize,
    /// Which generation attempt produced this draft (1-based).
    pub attempt: u32,
}

impl Draft {
    /// Wraps a generated body, counting its words.
    pub fn new(body: impl Into<String>, attempt: u32) -> Self {
        let body = body.into();
        Self {
            word_count: word_count(&body),
            body,
            attempt,
        }
    }

    /// Parses the heading outline.
    pub fn outline(&self) -> Outline {
        Outline::parse(&self.body)
    }
}

/// A draft rewritten to a client's voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptedDraft {
    /// Markdown document.
    pub body: String,
    /// Words in the body.
    pub word_count: usize,
    /// Tone the draft was adapted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Prohibited terms that were removed or replaced.
    #[serde(default)]
    pub removed_terms: Vec<String>,
    /// Whether the draft passed through unchanged.
    pub passthrough: bool,
}

impl AdaptedDraft {
    /// An unchanged draft, used for neutral profiles.
    pub fn passthrough(draft: &Draft) -> Self {
        Self {
            body: draft.body.clone(),
            word_count: draft.word_count,
            tone: None,
            removed_terms: Vec::new(),
            passthrough: true,
        }
    }
}

/// A hard constraint a draft failed to meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum UnmetConstraint {
    /// Word count outside the tolerance band.
    Length {
        actual: usize,
        min: usize,
        max: usize,
    },
    /// Keywords that never occur.
    MissingKeywords { keywords: Vec<String> },
    /// No H1 title.
    MissingTitle,
    /// Too few section headings to decompose the topic.
    FlatStructure { sections: usize, required: usize },
}

impl fmt::Display for UnmetConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length { actual, min, max } => {
                write!(f, "length {actual} words is outside {min}..={max}")
            }
            Self::MissingKeywords { keywords } => {
                write!(f, "missing keywords: {}", keywords.join(", "))
            }
            Self::MissingTitle => f.write_str("missing H1 title"),
            Self::FlatStructure { sections, required } => {
                write!(f, "{sections} section headings, at least {required} required")
            }
        }
    }
}

/// Area of the document a recommendation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Keyword density outside the target band.
    KeywordDensity,
    /// Keyword missing from a prominent position.
    KeywordPlacement,
    /// Heading levels out of order or duplicated.
    HeadingHierarchy,
    /// Meta description missing or off-length.
    Metadata,
    /// Overall length.
    Length,
}

/// One optimization finding. Applied changes are listed here too, so nothing
/// is changed without an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Area concerned.
    pub kind: RecommendationKind,
    /// Human-readable explanation.
    pub message: String,
    /// Keyword concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Whether the optimizer already applied the change.
    pub applied: bool,
}

impl Recommendation {
    /// A change the optimizer applied.
    pub fn applied(kind: RecommendationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            keyword: None,
            applied: true,
        }
    }

    /// A change left to the editor.
    pub fn suggested(kind: RecommendationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            keyword: None,
            applied: false,
        }
    }

    /// Attaches the keyword this recommendation concerns.
    pub fn for_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }
}

/// The finished, optimized article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalContent {
    /// Title text of the H1.
    pub title: String,
    /// Meta description.
    pub meta_description: String,
    /// Markdown document, meta comment included.
    pub body: String,
    /// Validation metrics of the body.
    pub metrics: ContentMetrics,
}

impl FinalContent {
    /// Words in the body.
    pub fn word_count(&self) -> usize {
        self.metrics.word_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_counts_words() {
        let draft = Draft::new("# Title\n\nTwo words.", 1);
        assert_eq!(draft.word_count, 3);
        assert_eq!(draft.outline().levels(), vec![1]);
    }

    #[test]
    fn test_unmet_constraint_display() {
        let constraint = UnmetConstraint::Length {
            actual: 900,
            min: 1020,
            max: 1380,
        };
        assert_eq!(constraint.to_string(), "length 900 words is outside 1020..=1380");

        let constraint = UnmetConstraint::MissingKeywords {
            keywords: vec!["hay".into(), "barn".into()],
        };
        assert_eq!(constraint.to_string(), "missing keywords: hay, barn");
    }

    #[test]
    fn test_recommendation_serialization() {
        let recommendation =
            Recommendation::suggested(RecommendationKind::KeywordDensity, "Use it more")
                .for_keyword("hay");
        let json = serde_json::to_value(&recommendation).unwrap();
        assert_eq!(json["kind"], "keyword_density");
        assert_eq!(json["keyword"], "hay");
        assert_eq!(json["applied"], false);
    }
}
