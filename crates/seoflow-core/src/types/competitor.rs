//! Competitor documents and the insight distilled from them.

use serde::{Deserialize, Serialize};

use super::RankedResult;

/// Longest snippet of a reference document kept for prompting.
pub const SNIPPET_LENGTH: usize = 300;

/// A document published by a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorDocument {
    /// Document title.
    pub title: String,
    /// Where the document lives, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Markdown or plain-text body.
    pub content: String,
}

impl CompetitorDocument {
    /// Creates a document from a title and body.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            content: content.into(),
        }
    }

    /// First [`SNIPPET_LENGTH`] characters of the body.
    pub fn snippet(&self) -> &str {
        match self.content.char_indices().nth(SNIPPET_LENGTH) {
            Some((index, _)) => &self.content[..index],
            None => &self.content,
        }
    }
}

impl From<&RankedResult> for CompetitorDocument {
    fn from(result: &RankedResult) -> Self {
        let headings = result
            .headings
            .iter()
            .map(|heading| format!("{} {}", "#".repeat(usize::from(heading.level)), heading.text))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            title: result.title.clone(),
            url: Some(result.url.clone()),
            content: format!("{headings}\n\n{}", result.content),
        }
    }
}

/// A ranked theme in a competitor comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Theme label.
    pub theme: String,
    /// Ranking score; higher ranks first.
    pub score: f64,
    /// How many competitor documents mention the theme.
    pub coverage: usize,
}

/// Comparative summary of the competitor field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorInsight {
    /// Angles in the brief that few competitors cover, strongest first.
    pub differentiators: Vec<Insight>,
    /// Themes competitors cover that the brief does not, most common first.
    pub gaps: Vec<Insight>,
    /// Number of competitor documents considered.
    pub documents_considered: usize,
}
