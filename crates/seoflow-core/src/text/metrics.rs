//! Content validation metrics.

use serde::{Deserialize, Serialize};

use super::{Outline, count_occurrences, contains_phrase, density, meta_description, word_count};

/// Usage statistics for a single keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordStats {
    /// The keyword as supplied by the request.
    pub keyword: String,
    /// Word-bounded occurrences in the body.
    pub count: usize,
    /// Occurrences as a percentage of total words.
    pub density: f64,
    /// Whether the keyword appears in the H1 title.
    pub in_title: bool,
    /// Whether the keyword appears in any heading.
    pub in_headings: bool,
}

/// Measurements of a finished document used for validation and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    /// Words in the body, excluding comments and markup.
    pub word_count: usize,
    /// Per-keyword statistics in request order.
    pub keywords: Vec<KeywordStats>,
    /// Heading counts; index 0 holds H1.
    pub heading_counts: [usize; 6],
    /// Length in characters of the meta description, if any.
    pub meta_description_length: Option<usize>,
    /// Whether the meta description mentions at least one keyword.
    pub meta_has_keyword: bool,
}

impl ContentMetrics {
    /// Measures `text` against the given keywords.
    pub fn compute<S: AsRef<str>>(text: &str, keywords: &[S]) -> Self {
        let words = word_count(text);
        let outline = Outline::parse(text);
        let meta = meta_description(text);

        let keywords = keywords
            .iter()
            .map(|keyword| {
                let keyword = keyword.as_ref();
                let count = count_occurrences(text, keyword);
                KeywordStats {
                    keyword: keyword.to_owned(),
                    count,
                    density: density(count, words),
                    in_title: outline
                        .title()
                        .is_some_and(|title| contains_phrase(&title.text, keyword)),
                    in_headings: outline
                        .headings
                        .iter()
                        .any(|heading| contains_phrase(&heading.text, keyword)),
                }
            })
            .collect::<Vec<_>>();

        let meta_has_keyword = meta.as_deref().is_some_and(|meta| {
            keywords
                .iter()
                .any(|stats| contains_phrase(meta, &stats.keyword))
        });

        Self {
            word_count: words,
            keywords,
            heading_counts: outline.counts(),
            meta_description_length: meta.map(|meta| meta.chars().count()),
            meta_has_keyword,
        }
    }

    /// Returns keywords that never occur in the body.
    pub fn missing_keywords(&self) -> Vec<&str> {
        self.keywords
            .iter()
            .filter(|stats| stats.count == 0)
            .map(|stats| stats.keyword.as_str())
            .collect()
    }

    /// Returns the statistics for a keyword, if it was measured.
    pub fn keyword(&self, keyword: &str) -> Option<&KeywordStats> {
        self.keywords.iter().find(|stats| stats.keyword == keyword)
    }
}
