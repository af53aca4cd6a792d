//! SEO optimization pass.

use seoflow_core::text::{self, ContentMetrics, Outline};
use seoflow_core::types::{AdaptedDraft, FinalContent, Recommendation, RecommendationKind};

use super::DraftBrief;
use crate::{PipelineConfig, TRACING_TARGET_STAGE};

const META_MAX: usize = 160;
const META_MIN: usize = 50;
const META_TARGET: usize = 155;
const MAX_ADDED_MENTIONS: usize = 25;

/// Final pass over an adapted draft.
///
/// Structural problems (missing or duplicate H1, skipped heading levels,
/// missing meta description, keywords never mentioned or mentioned below the
/// density floor) are fixed in place; excess density and length findings are
/// left as suggestions. Every change made is listed among the
/// recommendations, and the pass never removes content.
#[derive(Debug, Clone)]
pub struct SeoOptimizer {
    config: PipelineConfig,
}

impl SeoOptimizer {
    /// Creates an optimizer using the config's density band and tolerance.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Optimizes a draft, returning the final content and the findings.
    pub fn optimize(
        &self,
        adapted: &AdaptedDraft,
        brief: &DraftBrief,
    ) -> (FinalContent, Vec<Recommendation>) {
        let mut recommendations = Vec::new();

        let body = fix_headings(&adapted.body, &brief.topic, &mut recommendations);
        let body = add_missing_keywords(&body, &brief.keywords, &mut recommendations);
        let body = self.fix_meta(&body, brief, &mut recommendations);
        let body = self.raise_density(&body, &brief.keywords, &mut recommendations);

        let metrics = ContentMetrics::compute(&body, &brief.keywords);
        self.suggest_density(&metrics, &mut recommendations);
        self.suggest_placement(&metrics, brief, &mut recommendations);
        self.suggest_length(&metrics, brief, &mut recommendations);

        let outline = Outline::parse(&body);
        let title = outline
            .title()
            .map_or_else(|| brief.topic.clone(), |heading| heading.text.clone());
        let meta_description = text::meta_description(&body).unwrap_or_default();

        tracing::info!(
            target: TRACING_TARGET_STAGE,
            word_count = metrics.word_count,
            applied = recommendations.iter().filter(|r| r.applied).count(),
            suggested = recommendations.iter().filter(|r| !r.applied).count(),
            "Optimized content"
        );

        let content = FinalContent {
            title,
            meta_description,
            body,
            metrics,
        };
        (content, recommendations)
    }

    fn fix_meta(
        &self,
        body: &str,
        brief: &DraftBrief,
        recommendations: &mut Vec<Recommendation>,
    ) -> String {
        let primary = brief.primary_keyword().unwrap_or(brief.topic.as_str());

        let Some(meta) = text::meta_description(body) else {
            let description = build_meta(body, primary);
            recommendations.push(Recommendation::applied(
                RecommendationKind::Metadata,
                format!(
                    "Added a {}-character meta description.",
                    description.chars().count()
                ),
            ));
            return text::with_meta_description(body, &description);
        };

        let length = meta.chars().count();
        if length > META_MAX {
            recommendations.push(Recommendation::suggested(
                RecommendationKind::Metadata,
                format!("Shorten the meta description to {META_MAX} characters or fewer (currently {length})."),
            ));
        } else if length < META_MIN {
            recommendations.push(Recommendation::suggested(
                RecommendationKind::Metadata,
                format!("Expand the meta description to at least {META_MIN} characters (currently {length})."),
            ));
        }

        if !brief
            .keywords
            .iter()
            .any(|keyword| text::contains_phrase(&meta, keyword))
        {
            recommendations.push(
                Recommendation::suggested(
                    RecommendationKind::Metadata,
                    format!("Mention \"{primary}\" in the meta description."),
                )
                .for_keyword(primary),
            );
        }

        body.to_owned()
    }

    /// Adds mentions of keywords below the density floor, spreading them
    /// across section endings, until each reaches `density_min`.
    fn raise_density(
        &self,
        body: &str,
        keywords: &[String],
        recommendations: &mut Vec<Recommendation>,
    ) -> String {
        let floor = self.config.density_min;
        let mut body = body.to_owned();

        for keyword in keywords {
            let mut added = 0;
            while added < MAX_ADDED_MENTIONS {
                let count = text::count_occurrences(&body, keyword);
                if count == 0 || text::density(count, text::word_count(&body)) >= floor {
                    break;
                }
                body = insert_mention(&body, &mention(keyword, added), added);
                added += 1;
            }

            if added > 0 {
                let density = text::density(
                    text::count_occurrences(&body, keyword),
                    text::word_count(&body),
                );
                tracing::debug!(
                    target: TRACING_TARGET_STAGE,
                    keyword = %keyword,
                    added,
                    density,
                    "Raised keyword density"
                );
                recommendations.push(
                    Recommendation::applied(
                        RecommendationKind::KeywordDensity,
                        format!(
                            "Added {added} mention{} of \"{keyword}\" to bring its density to {density:.2}%.",
                            if added > 1 { "s" } else { "" }
                        ),
                    )
                    .for_keyword(keyword.as_str()),
                );
            }
        }

        body
    }

    fn suggest_density(&self, metrics: &ContentMetrics, recommendations: &mut Vec<Recommendation>) {
        let words = metrics.word_count as f64;
        let (min, max) = (self.config.density_min, self.config.density_max);

        for stats in &metrics.keywords {
            if stats.density < min {
                let needed = ((min * words / 100.0).ceil() as usize).saturating_sub(stats.count);
                recommendations.push(
                    Recommendation::suggested(
                        RecommendationKind::KeywordDensity,
                        format!(
                            "\"{}\" density is {:.2}%, below the {min}-{max}% band; add about {} mention{}.",
                            stats.keyword,
                            stats.density,
                            needed.max(1),
                            if needed > 1 { "s" } else { "" }
                        ),
                    )
                    .for_keyword(&stats.keyword),
                );
            } else if stats.density > max {
                let excess = stats.count.saturating_sub((max * words / 100.0).floor() as usize);
                recommendations.push(
                    Recommendation::suggested(
                        RecommendationKind::KeywordDensity,
                        format!(
                            "\"{}\" density is {:.2}%, above the {min}-{max}% band; remove about {} mention{}.",
                            stats.keyword,
                            stats.density,
                            excess.max(1),
                            if excess > 1 { "s" } else { "" }
                        ),
                    )
                    .for_keyword(&stats.keyword),
                );
            }
        }
    }

    fn suggest_placement(
        &self,
        metrics: &ContentMetrics,
        brief: &DraftBrief,
        recommendations: &mut Vec<Recommendation>,
    ) {
        let Some(primary) = brief.primary_keyword() else {
            return;
        };
        if metrics.keyword(primary).is_some_and(|stats| !stats.in_title) {
            recommendations.push(
                Recommendation::suggested(
                    RecommendationKind::KeywordPlacement,
                    format!("Use \"{primary}\" in the title."),
                )
                .for_keyword(primary),
            );
        }
    }

    fn suggest_length(
        &self,
        metrics: &ContentMetrics,
        brief: &DraftBrief,
        recommendations: &mut Vec<Recommendation>,
    ) {
        let (min, max) = self.config.length_window(brief.target_length);
        if !(min..=max).contains(&metrics.word_count) {
            recommendations.push(Recommendation::suggested(
                RecommendationKind::Length,
                format!(
                    "The body has {} words; the target is {} ({min}-{max}).",
                    metrics.word_count, brief.target_length
                ),
            ));
        }
    }
}

fn rejoin(lines: Vec<String>, original: &str) -> String {
    let mut body = lines.join("\n");
    if original.ends_with('\n') {
        body.push('\n');
    }
    body
}

fn heading_line(level: u8, text: &str) -> String {
    format!("{} {}", "#".repeat(usize::from(level)), text)
}

/// Ensures exactly one H1 and no skipped heading levels.
fn fix_headings(body: &str, topic: &str, recommendations: &mut Vec<Recommendation>) -> String {
    let mut lines: Vec<String> = body.lines().map(str::to_owned).collect();
    let outline = Outline::parse(body);

    let mut first_h1 = true;
    let mut previous = 0u8;
    for heading in &outline.headings {
        let mut level = heading.level;

        if level == 1 {
            if first_h1 {
                first_h1 = false;
            } else {
                level = 2;
                recommendations.push(Recommendation::applied(
                    RecommendationKind::HeadingHierarchy,
                    format!("Demoted extra H1 \"{}\" to H2.", heading.text),
                ));
            }
        }

        // Below the title, nothing may jump more than one level deeper.
        let floor = previous.max(1);
        if level > floor + 1 {
            recommendations.push(Recommendation::applied(
                RecommendationKind::HeadingHierarchy,
                format!(
                    "Changed \"{}\" from H{} to H{} to keep heading levels sequential.",
                    heading.text,
                    level,
                    floor + 1
                ),
            ));
            level = floor + 1;
        }

        if level != heading.level {
            lines[heading.line] = heading_line(level, &heading.text);
        }
        previous = level;
    }

    if first_h1 {
        lines.insert(0, String::new());
        lines.insert(0, heading_line(1, topic));
        recommendations.push(Recommendation::applied(
            RecommendationKind::HeadingHierarchy,
            format!("Added the H1 title \"{topic}\"."),
        ));
    }

    rejoin(lines, body)
}

/// Mentions keywords the body never uses in a short paragraph before the
/// first section.
fn add_missing_keywords(
    body: &str,
    keywords: &[String],
    recommendations: &mut Vec<Recommendation>,
) -> String {
    let missing: Vec<&String> = keywords
        .iter()
        .filter(|keyword| !text::contains_phrase(body, keyword))
        .collect();
    if missing.is_empty() {
        return body.to_owned();
    }

    let mut lines: Vec<String> = body.lines().map(str::to_owned).collect();
    let names: Vec<&str> = missing.iter().map(|keyword| keyword.as_str()).collect();
    let paragraph = format!("This guide also covers {}.", names.join(", "));

    let outline = Outline::parse(body);
    match outline.headings.iter().find(|heading| heading.level >= 2) {
        Some(section) => {
            lines.insert(section.line, String::new());
            lines.insert(section.line, paragraph);
        }
        None => {
            lines.push(String::new());
            lines.push(paragraph);
        }
    }

    for keyword in missing {
        recommendations.push(
            Recommendation::applied(
                RecommendationKind::KeywordPlacement,
                format!("Added a mention of \"{keyword}\", which the body never used."),
            )
            .for_keyword(keyword.as_str()),
        );
    }

    rejoin(lines, body)
}

fn mention(keyword: &str, index: usize) -> String {
    match index % 3 {
        0 => format!("The same holds for {keyword}."),
        1 => format!("Keep {keyword} in mind here."),
        _ => format!("This matters for {keyword} too."),
    }
}

/// Appends a one-sentence paragraph to the end of a section, rotating
/// through the sections by `slot`.
fn insert_mention(body: &str, sentence: &str, slot: usize) -> String {
    let mut lines: Vec<String> = body.lines().map(str::to_owned).collect();
    let mut ends: Vec<usize> = Outline::parse(body)
        .headings
        .iter()
        .filter(|heading| heading.level >= 2)
        .skip(1)
        .map(|heading| heading.line)
        .collect();
    ends.push(lines.len());

    let at = ends[slot % ends.len()];
    if at == lines.len() {
        lines.push(String::new());
        lines.push(sentence.to_owned());
    } else {
        lines.insert(at, String::new());
        lines.insert(at, sentence.to_owned());
    }

    rejoin(lines, body)
}

/// Builds a meta description from the opening paragraph.
fn build_meta(body: &str, primary: &str) -> String {
    let opening = text::strip_comments(body)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or_default()
        .to_owned();

    let mut description = if text::contains_phrase(&opening, primary) {
        opening
    } else {
        let mut chars = primary.chars();
        let capitalized: String = chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        format!("{capitalized}: {opening}")
    };

    if description.chars().count() > META_TARGET {
        let mut truncated = String::new();
        for word in description.split_whitespace() {
            if truncated.chars().count() + word.chars().count() + 1 > META_TARGET {
                break;
            }
            if !truncated.is_empty() {
                truncated.push(' ');
            }
            truncated.push_str(word);
        }
        description = truncated;
    }

    description.trim_end_matches([':', ',', ';']).trim().to_owned()
}
