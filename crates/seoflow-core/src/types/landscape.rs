//! Search landscape signals.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::text::Heading;

/// One ranked page returned by a search source for a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// One-based rank in the result list.
    pub rank: u32,
    /// Page URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Meta description, when the page has one.
    #[serde(default)]
    pub meta_description: Option<String>,
    /// Page headings in document order.
    #[serde(default)]
    pub headings: Vec<Heading>,
    /// Main-content word count.
    pub word_count: usize,
    /// Main-content text, possibly truncated by the source.
    #[serde(default)]
    pub content: String,
    /// Links pointing at the same site.
    #[serde(default)]
    pub internal_links: usize,
    /// Links pointing elsewhere.
    #[serde(default)]
    pub external_links: usize,
    /// Hostnames of outbound links.
    #[serde(default)]
    pub external_domains: Vec<String>,
}

/// Outcome of the lookup for a single keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KeywordStatus {
    /// The lookup returned this many results.
    Analyzed { results: usize },
    /// The lookup failed or timed out.
    Failed { reason: String },
}

impl KeywordStatus {
    /// Returns whether the lookup succeeded.
    pub fn is_analyzed(&self) -> bool {
        matches!(self, Self::Analyzed { .. })
    }
}

/// Per-keyword lookup record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    /// Keyword as requested.
    pub keyword: String,
    /// Lookup outcome.
    pub status: KeywordStatus,
    /// Ranked results; empty when the lookup failed.
    #[serde(default)]
    pub results: Vec<RankedResult>,
}

/// Dominant heading structure among ranking pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadingPattern {
    /// Average H1 count per page.
    pub avg_h1: f64,
    /// Average H2 count per page.
    pub avg_h2: f64,
    /// Average H3 count per page.
    pub avg_h3: f64,
    /// Most common section headings, most frequent first.
    pub common_headings: Vec<String>,
}

/// Typical content length among ranking pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthProfile {
    /// Shortest page.
    pub min: usize,
    /// Median page.
    pub median: usize,
    /// Mean page length.
    pub mean: usize,
    /// Longest page.
    pub max: usize,
}

/// Observed frequency band for one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordBand {
    /// Keyword as requested.
    pub keyword: String,
    /// Lowest observed density (percent).
    pub min_density: f64,
    /// Average observed density (percent).
    pub avg_density: f64,
    /// Highest observed density (percent).
    pub max_density: f64,
    /// Share of pages with the keyword in the title (percent).
    pub in_title_pct: f64,
    /// Share of pages with the keyword in a heading (percent).
    pub in_headings_pct: f64,
}

/// Outbound linking patterns among ranking pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPattern {
    /// Average internal links per page.
    pub avg_internal: f64,
    /// Average external links per page.
    pub avg_external: f64,
    /// Most frequently linked external domains.
    pub common_domains: Vec<String>,
}

/// Structural signals extracted from the search landscape of a keyword set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeResult {
    /// Topic the landscape was gathered for.
    pub topic: String,
    /// Keywords in request order.
    pub keywords: Vec<String>,
    /// Per-keyword lookup records.
    pub analyses: Vec<KeywordAnalysis>,
    /// Heading structure signal.
    pub headings: HeadingPattern,
    /// Length signal.
    pub length: LengthProfile,
    /// Keyword frequency bands.
    pub keyword_bands: Vec<KeywordBand>,
    /// Linking signal.
    pub links: LinkPattern,
    /// Drafting guidance derived from the signals.
    pub recommendations: Vec<String>,
    /// Whether these are neutral defaults rather than observed signals.
    #[serde(default)]
    pub is_default: bool,
    /// When the landscape was gathered.
    pub generated_at: Timestamp,
}

impl LandscapeResult {
    /// Neutral signals used when no search source is reachable and nothing
    /// is cached.
    pub fn neutral(topic: &str, keywords: &[String], target_length: u32) -> Self {
        let target_length = target_length as usize;
        Self {
            topic: topic.to_owned(),
            keywords: keywords.to_vec(),
            analyses: keywords
                .iter()
                .map(|keyword| KeywordAnalysis {
                    keyword: keyword.clone(),
                    status: KeywordStatus::Failed {
                        reason: "search landscape unavailable".into(),
                    },
                    results: Vec::new(),
                })
                .collect(),
            headings: HeadingPattern {
                avg_h1: 1.0,
                avg_h2: 4.0,
                avg_h3: 2.0,
                common_headings: Vec::new(),
            },
            length: LengthProfile {
                min: target_length,
                median: target_length,
                mean: target_length,
                max: target_length,
            },
            keyword_bands: Vec::new(),
            links: LinkPattern::default(),
            recommendations: vec![
                format!("Aim for roughly {target_length} words."),
                "Use one H1 title and break the body into four to six H2 sections.".into(),
                "Keep each keyword between 1% and 2% density.".into(),
            ],
            is_default: true,
            generated_at: Timestamp::now(),
        }
    }

    /// Returns whether at least one keyword lookup failed.
    pub fn is_partial(&self) -> bool {
        self.analyses.iter().any(|a| !a.status.is_analyzed())
    }

    /// Keywords whose lookup failed.
    pub fn failed_keywords(&self) -> Vec<&str> {
        self.analyses
            .iter()
            .filter(|a| !a.status.is_analyzed())
            .map(|a| a.keyword.as_str())
            .collect()
    }

    /// The best-ranked distinct pages across all keywords.
    pub fn top_results(&self, limit: usize) -> Vec<&RankedResult> {
        let mut results: Vec<&RankedResult> =
            self.analyses.iter().flat_map(|a| a.results.iter()).collect();
        results.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.url.cmp(&b.url)));

        let mut seen = std::collections::HashSet::new();
        results.retain(|result| seen.insert(result.url.as_str()));
        results.truncate(limit);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rank: u32, url: &str) -> RankedResult {
        RankedResult {
            rank,
            url: url.into(),
            title: url.into(),
            meta_description: None,
            headings: Vec::new(),
            word_count: 1000,
            content: String::new(),
            internal_links: 0,
            external_links: 0,
            external_domains: Vec::new(),
        }
    }

    #[test]
    fn test_neutral_landscape() {
        let landscape = LandscapeResult::neutral("Farming", &["hay".into()], 800);
        assert!(landscape.is_default);
        assert!(landscape.is_partial());
        assert_eq!(landscape.failed_keywords(), vec!["hay"]);
        assert_eq!(landscape.length.median, 800);
    }

    #[test]
    fn test_top_results_dedup_by_url() {
        let mut landscape = LandscapeResult::neutral("Farming", &[], 800);
        landscape.analyses = vec![
            KeywordAnalysis {
                keyword: "a".into(),
                status: KeywordStatus::Analyzed { results: 2 },
                results: vec![result(2, "https://b"), result(1, "https://a")],
            },
            KeywordAnalysis {
                keyword: "b".into(),
                status: KeywordStatus::Analyzed { results: 1 },
                results: vec![result(1, "https://a")],
            },
        ];

        let top: Vec<&str> = landscape.top_results(5).iter().map(|r| r.url.as_str()).collect();
        assert_eq!(top, vec!["https://a", "https://b"]);
        assert!(!landscape.is_partial());
    }
}
