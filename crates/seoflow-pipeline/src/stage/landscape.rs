//! Search landscape analysis.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use futures::StreamExt;
use jiff::Timestamp;
use seoflow_core::provider::SearchService;
use seoflow_core::text::{self, Outline};
use seoflow_core::types::{
    HeadingPattern, KeywordAnalysis, KeywordBand, KeywordStatus, LandscapeResult, LengthProfile,
    LinkPattern, RankedResult,
};

use crate::{PipelineConfig, PipelineError, PipelineResult, TRACING_TARGET_STAGE};

const COMMON_HEADINGS: usize = 10;
const COMMON_DOMAINS: usize = 5;
const TITLE_SIGNAL_PCT: f64 = 70.0;
const HEADING_SIGNAL_PCT: f64 = 50.0;

/// Looks up ranked results for every keyword and summarizes what the
/// top-ranking pages have in common.
#[derive(Debug, Clone)]
pub struct LandscapeAnalyzer {
    search: SearchService,
    concurrency: usize,
    lookup_timeout: Duration,
    results_per_keyword: usize,
}

impl LandscapeAnalyzer {
    /// Creates an analyzer over a search service.
    pub fn new(search: SearchService, config: &PipelineConfig) -> Self {
        Self {
            search,
            concurrency: config.search_concurrency.max(1),
            lookup_timeout: config.search_timeout,
            results_per_keyword: config.results_per_keyword,
        }
    }

    /// Analyzes the landscape for a topic's keywords.
    ///
    /// Keywords are looked up concurrently; a keyword whose lookup fails or
    /// times out is recorded as failed and the rest are still summarized.
    /// Only when every lookup fails is the source considered unavailable.
    pub async fn analyze(&self, topic: &str, keywords: &[String]) -> PipelineResult<LandscapeResult> {
        let keywords = distinct_keywords(keywords);
        if keywords.is_empty() {
            return Err(PipelineError::InvalidInput(
                "keyword set must not be empty".into(),
            ));
        }

        tracing::info!(
            target: TRACING_TARGET_STAGE,
            keywords = keywords.len(),
            concurrency = self.concurrency,
            "Analyzing search landscape"
        );

        let analyses: Vec<KeywordAnalysis> = futures::stream::iter(keywords.iter().cloned())
            .map(|keyword| self.lookup(keyword))
            .buffered(self.concurrency)
            .collect()
            .await;

        let failures: Vec<String> = analyses
            .iter()
            .filter_map(|analysis| match &analysis.status {
                KeywordStatus::Failed { reason } => Some(format!("{}: {reason}", analysis.keyword)),
                KeywordStatus::Analyzed { .. } => None,
            })
            .collect();

        if failures.len() == analyses.len() {
            return Err(PipelineError::ExternalSourceUnavailable(format!(
                "all {} keyword lookups failed ({})",
                analyses.len(),
                failures.join("; ")
            )));
        }

        if !failures.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET_STAGE,
                failed = failures.len(),
                total = analyses.len(),
                "Landscape is partial"
            );
        }

        Ok(summarize(topic, &keywords, analyses))
    }

    async fn lookup(&self, keyword: String) -> KeywordAnalysis {
        let status_and_results =
            match tokio::time::timeout(self.lookup_timeout, self.search.lookup(&keyword)).await {
                Ok(Ok(mut results)) => {
                    results.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.url.cmp(&b.url)));
                    results.truncate(self.results_per_keyword);
                    (
                        KeywordStatus::Analyzed {
                            results: results.len(),
                        },
                        results,
                    )
                }
                Ok(Err(error)) => (
                    KeywordStatus::Failed {
                        reason: error.to_string(),
                    },
                    Vec::new(),
                ),
                Err(_) => (
                    KeywordStatus::Failed {
                        reason: format!("timed out after {}ms", self.lookup_timeout.as_millis()),
                    },
                    Vec::new(),
                ),
            };

        let (status, results) = status_and_results;
        KeywordAnalysis {
            keyword,
            status,
            results,
        }
    }
}

/// Trims keywords and drops case-insensitive duplicates, keeping first
/// occurrences in order.
fn distinct_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|keyword| keyword.trim())
        .filter(|keyword| !keyword.is_empty() && seen.insert(text::normalize(keyword)))
        .map(str::to_owned)
        .collect()
}

/// Derives landscape signals from per-keyword results.
pub(crate) fn summarize(
    topic: &str,
    keywords: &[String],
    analyses: Vec<KeywordAnalysis>,
) -> LandscapeResult {
    let mut seen = HashSet::new();
    let pages: Vec<&RankedResult> = analyses
        .iter()
        .flat_map(|analysis| analysis.results.iter())
        .filter(|result| seen.insert(result.url.as_str()))
        .collect();

    let headings = heading_pattern(&pages);
    let length = length_profile(&pages);
    let keyword_bands: Vec<KeywordBand> = analyses
        .iter()
        .filter(|analysis| !analysis.results.is_empty())
        .map(|analysis| keyword_band(&analysis.keyword, &analysis.results))
        .collect();
    let links = link_pattern(&pages);
    let recommendations = recommendations(&headings, &length, &keyword_bands, &links);

    LandscapeResult {
        topic: topic.trim().to_owned(),
        keywords: keywords.to_vec(),
        analyses,
        headings,
        length,
        keyword_bands,
        links,
        recommendations,
        is_default: false,
        generated_at: Timestamp::now(),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn pct(matching: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matching as f64 / total as f64 * 100.0
    }
}

/// Ranks labels by how many pages use them, most common first.
fn most_common(counts: BTreeMap<String, usize>, min_count: usize, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(label, _)| label).collect()
}

fn page_outline(page: &RankedResult) -> Outline {
    if page.headings.is_empty() {
        Outline::parse(&page.content)
    } else {
        Outline {
            headings: page.headings.clone(),
        }
    }
}

fn heading_pattern(pages: &[&RankedResult]) -> HeadingPattern {
    let outlines: Vec<Outline> = pages.iter().map(|page| page_outline(page)).collect();

    let mut counts = BTreeMap::new();
    for outline in &outlines {
        let labels: HashSet<String> = outline
            .headings
            .iter()
            .filter(|heading| (2..=3).contains(&heading.level))
            .map(|heading| text::normalize(&heading.text))
            .filter(|label| !label.is_empty())
            .collect();
        for label in labels {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    HeadingPattern {
        avg_h1: mean(outlines.iter().map(|o| o.count_level(1) as f64)),
        avg_h2: mean(outlines.iter().map(|o| o.count_level(2) as f64)),
        avg_h3: mean(outlines.iter().map(|o| o.count_level(3) as f64)),
        common_headings: most_common(counts, 2, COMMON_HEADINGS),
    }
}

fn page_words(page: &RankedResult) -> usize {
    if page.word_count > 0 {
        page.word_count
    } else {
        text::word_count(&page.content)
    }
}

fn length_profile(pages: &[&RankedResult]) -> LengthProfile {
    let mut words: Vec<usize> = pages
        .iter()
        .map(|page| page_words(page))
        .filter(|words| *words > 0)
        .collect();
    if words.is_empty() {
        return LengthProfile::default();
    }
    words.sort_unstable();

    let middle = words.len() / 2;
    let median = if words.len() % 2 == 0 {
        (words[middle - 1] + words[middle]) / 2
    } else {
        words[middle]
    };

    LengthProfile {
        min: words[0],
        median,
        mean: words.iter().sum::<usize>() / words.len(),
        max: words[words.len() - 1],
    }
}

fn keyword_band(keyword: &str, results: &[RankedResult]) -> KeywordBand {
    let densities: Vec<f64> = results
        .iter()
        .filter(|page| !page.content.trim().is_empty())
        .map(|page| {
            text::density(
                text::count_occurrences(&page.content, keyword),
                text::word_count(&page.content),
            )
        })
        .collect();

    let in_title = results
        .iter()
        .filter(|page| text::contains_phrase(&page.title, keyword))
        .count();
    let in_headings = results
        .iter()
        .filter(|page| {
            page_outline(page)
                .headings
                .iter()
                .any(|heading| heading.level > 1 && text::contains_phrase(&heading.text, keyword))
        })
        .count();

    KeywordBand {
        keyword: keyword.to_owned(),
        min_density: densities.iter().copied().reduce(f64::min).unwrap_or(0.0),
        avg_density: mean(densities.iter().copied()),
        max_density: densities.iter().copied().reduce(f64::max).unwrap_or(0.0),
        in_title_pct: pct(in_title, results.len()),
        in_headings_pct: pct(in_headings, results.len()),
    }
}

fn link_pattern(pages: &[&RankedResult]) -> LinkPattern {
    let mut domains = BTreeMap::new();
    for page in pages {
        let distinct: HashSet<String> = page
            .external_domains
            .iter()
            .map(|domain| domain.trim().to_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();
        for domain in distinct {
            *domains.entry(domain).or_insert(0) += 1;
        }
    }

    LinkPattern {
        avg_internal: mean(pages.iter().map(|page| page.internal_links as f64)),
        avg_external: mean(pages.iter().map(|page| page.external_links as f64)),
        common_domains: most_common(domains, 1, COMMON_DOMAINS),
    }
}

fn recommendations(
    headings: &HeadingPattern,
    length: &LengthProfile,
    bands: &[KeywordBand],
    links: &LinkPattern,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if length.median > 0 {
        recommendations.push(format!(
            "Aim for about {} words; top-ranking pages run {}-{} words.",
            length.median, length.min, length.max
        ));
    }

    let sections = headings.avg_h2.round().max(2.0);
    if headings.avg_h3 >= 1.0 {
        recommendations.push(format!(
            "Use one H1 title, about {sections:.0} H2 sections and {:.0} H3 sub-sections.",
            headings.avg_h3.round()
        ));
    } else {
        recommendations.push(format!("Use one H1 title and about {sections:.0} H2 sections."));
    }

    for band in bands {
        if band.in_title_pct > TITLE_SIGNAL_PCT {
            recommendations.push(format!(
                "Include \"{}\" in the title; {:.0}% of top pages do.",
                band.keyword, band.in_title_pct
            ));
        }
        if band.in_headings_pct > HEADING_SIGNAL_PCT {
            recommendations.push(format!(
                "Use \"{}\" in at least one H2 or H3 heading.",
                band.keyword
            ));
        }
        if band.avg_density > 0.0 {
            recommendations.push(format!(
                "Keep \"{}\" near {:.1}% density (top pages range {:.1}-{:.1}%).",
                band.keyword, band.avg_density, band.min_density, band.max_density
            ));
        }
    }

    if !headings.common_headings.is_empty() {
        let common: Vec<&str> = headings
            .common_headings
            .iter()
            .take(5)
            .map(String::as_str)
            .collect();
        recommendations.push(format!(
            "Cover the sections competitors share: {}.",
            common.join(", ")
        ));
    }

    if links.avg_internal >= 1.0 || links.avg_external >= 1.0 {
        recommendations.push(format!(
            "Include about {:.0} internal and {:.0} external links.",
            links.avg_internal, links.avg_external
        ));
    }

    recommendations
}
