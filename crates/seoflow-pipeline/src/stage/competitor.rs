//! Competitor synthesis.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use seoflow_core::text::{self, Outline};
use seoflow_core::types::{CompetitorDocument, CompetitorInsight, Insight, LandscapeResult};

use crate::TRACING_TARGET_STAGE;

const MIN_TERM_LENGTH: usize = 4;
const DIFFERENTIATOR_COVERAGE: f64 = 0.5;

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "because", "been", "before", "being", "best",
    "both", "could", "does", "doing", "down", "during", "each", "even", "every", "from", "have",
    "having", "here", "into", "just", "like", "made", "make", "many", "more", "most", "much",
    "must", "need", "only", "other", "over", "same", "should", "some", "such", "than", "that",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "under",
    "very", "want", "well", "were", "what", "when", "where", "which", "while", "will", "with",
    "within", "without", "would", "your", "yours",
];

/// A competitor document, tokenized once.
struct Corpus {
    tokens: Vec<String>,
    headings: BTreeSet<String>,
}

impl Corpus {
    fn new(document: &CompetitorDocument) -> Self {
        let headings = Outline::parse(&document.content)
            .headings
            .into_iter()
            .filter(|heading| (2..=3).contains(&heading.level))
            .map(|heading| text::tokens(&heading.text).join(" "))
            .filter(|label| !label.is_empty())
            .collect();

        Self {
            tokens: text::tokens(&format!("{}\n{}", document.title, document.content)),
            headings,
        }
    }

    fn mentions(&self, phrase: &[String]) -> bool {
        !phrase.is_empty()
            && self.tokens.len() >= phrase.len()
            && self.tokens.windows(phrase.len()).any(|window| window == phrase)
    }
}

fn is_significant(token: &str) -> bool {
    token.chars().count() >= MIN_TERM_LENGTH
        && token.chars().all(char::is_alphabetic)
        && !STOPWORDS.contains(&token)
}

/// Compares the brief against competitor documents.
///
/// Synthesis is pure and deterministic: the same landscape and documents
/// always produce the same insight, including ordering.
#[derive(Debug, Clone)]
pub struct CompetitorSynthesizer {
    max_insights: usize,
}

impl Default for CompetitorSynthesizer {
    fn default() -> Self {
        Self { max_insights: 10 }
    }
}

impl CompetitorSynthesizer {
    /// Creates a synthesizer keeping at most `max_insights` per list.
    pub fn new(max_insights: usize) -> Self {
        Self { max_insights }
    }

    /// Ranks gaps (themes competitors cover that the brief does not) and
    /// differentiators (brief angles few competitors cover).
    pub fn synthesize(
        &self,
        landscape: &LandscapeResult,
        documents: &[CompetitorDocument],
    ) -> CompetitorInsight {
        if documents.is_empty() {
            return CompetitorInsight::default();
        }

        let corpora: Vec<Corpus> = documents.iter().map(Corpus::new).collect();
        let brief_terms: HashSet<String> = std::iter::once(landscape.topic.as_str())
            .chain(landscape.keywords.iter().map(String::as_str))
            .flat_map(text::tokens)
            .collect();

        let gaps = self.gaps(&corpora, &brief_terms);
        let differentiators = self.differentiators(landscape, &corpora);

        tracing::debug!(
            target: TRACING_TARGET_STAGE,
            documents = documents.len(),
            gaps = gaps.len(),
            differentiators = differentiators.len(),
            "Synthesized competitor insight"
        );

        CompetitorInsight {
            differentiators,
            gaps,
            documents_considered: documents.len(),
        }
    }

    fn gaps(&self, corpora: &[Corpus], brief_terms: &HashSet<String>) -> Vec<Insight> {
        let total = corpora.len();
        let min_coverage = if total >= 2 { 2 } else { 1 };

        // Heading themes first, then single terms; a heading theme shadows
        // the terms it is made of.
        let mut themes: BTreeMap<String, bool> = BTreeMap::new();
        for corpus in corpora {
            for heading in &corpus.headings {
                themes.insert(heading.clone(), true);
            }
        }
        for corpus in corpora {
            for token in corpus.tokens.iter().filter(|token| is_significant(token)) {
                themes.entry(token.clone()).or_insert(false);
            }
        }

        let mut insights: Vec<Insight> = themes
            .into_iter()
            .filter_map(|(theme, is_heading)| {
                let phrase: Vec<String> = theme.split(' ').map(str::to_owned).collect();
                let significant: Vec<&String> =
                    phrase.iter().filter(|token| is_significant(token)).collect();
                if significant.is_empty()
                    || significant.iter().any(|token| brief_terms.contains(*token))
                {
                    return None;
                }

                let coverage = corpora.iter().filter(|corpus| corpus.mentions(&phrase)).count();
                if coverage < min_coverage {
                    return None;
                }

                let mut score = coverage as f64 / total as f64;
                if is_heading {
                    score += 0.5;
                }
                Some(Insight {
                    theme,
                    score,
                    coverage,
                })
            })
            .collect();

        rank(&mut insights, self.max_insights);
        insights
    }

    fn differentiators(&self, landscape: &LandscapeResult, corpora: &[Corpus]) -> Vec<Insight> {
        let total = corpora.len() as f64;
        let mut seen = HashSet::new();

        let brief_themes = landscape
            .keywords
            .iter()
            .map(|keyword| text::tokens(keyword))
            .chain(
                text::tokens(&landscape.topic)
                    .into_iter()
                    .filter(|token| is_significant(token))
                    .map(|token| vec![token]),
            )
            .filter(|phrase| !phrase.is_empty() && seen.insert(phrase.join(" ")));

        let mut insights: Vec<Insight> = brief_themes
            .filter_map(|phrase| {
                let coverage = corpora.iter().filter(|corpus| corpus.mentions(&phrase)).count();
                let share = coverage as f64 / total;
                (share < DIFFERENTIATOR_COVERAGE).then(|| Insight {
                    theme: phrase.join(" "),
                    score: 1.0 - share,
                    coverage,
                })
            })
            .collect();

        rank(&mut insights, self.max_insights);
        insights
    }
}

fn rank(insights: &mut Vec<Insight>, limit: usize) {
    insights.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.coverage.cmp(&a.coverage))
            .then_with(|| a.theme.cmp(&b.theme))
    });
    insights.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landscape() -> LandscapeResult {
        LandscapeResult::neutral(
            "Compact Tractors for Modern Farming",
            &["compact tractors".to_owned(), "orchard mowing".to_owned()],
            1200,
        )
    }

    fn documents() -> Vec<CompetitorDocument> {
        vec![
            CompetitorDocument::new(
                "Compact tractors buyer guide",
                "## Financing Options\n\nCompact tractors need hydraulics and financing.",
            ),
            CompetitorDocument::new(
                "Choosing compact tractors",
                "## Financing options\n\nLook at hydraulics, warranty and dealer support.",
            ),
            CompetitorDocument::new(
                "Tractor maintenance",
                "Hydraulics fail when neglected. Check the warranty.",
            ),
        ]
    }

    #[test]
    fn test_gaps_rank_shared_themes() {
        let insight = CompetitorSynthesizer::default().synthesize(&landscape(), &documents());

        assert_eq!(insight.documents_considered, 3);
        let themes: Vec<&str> = insight.gaps.iter().map(|g| g.theme.as_str()).collect();
        assert_eq!(themes[0], "financing options");
        assert!(themes.contains(&"hydraulics"));
        assert!(themes.contains(&"warranty"));
        assert!(!themes.contains(&"dealer"));
        assert!(!themes.iter().any(|theme| theme.contains("tractors")));
    }

    #[test]
    fn test_differentiators_are_rarely_covered_brief_angles() {
        let insight = CompetitorSynthesizer::default().synthesize(&landscape(), &documents());

        let themes: Vec<&str> = insight
            .differentiators
            .iter()
            .map(|d| d.theme.as_str())
            .collect();
        assert!(themes.contains(&"orchard mowing"));
        assert!(themes.contains(&"modern"));
        assert!(!themes.contains(&"compact tractors"));
        assert!(insight.differentiators.iter().all(|d| d.score > 0.5));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let synthesizer = CompetitorSynthesizer::default();
        let first = synthesizer.synthesize(&landscape(), &documents());
        let second = synthesizer.synthesize(&landscape(), &documents());
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_documents() {
        let insight = CompetitorSynthesizer::default().synthesize(&landscape(), &[]);
        assert_eq!(insight, CompetitorInsight::default());
    }
}
