//! Prompt construction for drafting and style rewrites.

use std::fmt::Write;

use seoflow_core::provider::Prompt;
use seoflow_core::types::{CompetitorInsight, Draft, LandscapeResult, StyleProfile, Tone};

use super::{AdaptParams, DraftBrief, DraftParams};

const META_LENGTH: usize = 155;
const GROUNDING_INSIGHTS: usize = 5;

fn join_themes<'a>(themes: impl Iterator<Item = &'a str>) -> String {
    themes.take(GROUNDING_INSIGHTS).collect::<Vec<_>>().join(", ")
}

fn prohibited_line(profile: &StyleProfile) -> Option<String> {
    if profile.prohibited_terms.is_empty() {
        return None;
    }

    let terms: Vec<String> = profile
        .prohibited_terms
        .iter()
        .map(|term| match profile.replacement_for(term) {
            "" => format!("\"{term}\""),
            replacement => format!("\"{term}\" (write \"{replacement}\" instead)"),
        })
        .collect();
    Some(format!("Never use these terms: {}.", terms.join(", ")))
}

/// Prompt for a new draft.
pub(crate) fn draft_prompt(
    brief: &DraftBrief,
    landscape: &LandscapeResult,
    insight: &CompetitorInsight,
    window: (usize, usize),
    min_sections: usize,
    params: &DraftParams,
) -> Prompt {
    let system = format!(
        "You are an expert SEO content writer. You write original, accurate and well-structured \
         {} content in markdown. Respond with the markdown document only.",
        brief.content_type.as_ref().replace('_', " ")
    );

    let mut instructions = String::new();
    let _ = writeln!(instructions, "Topic: {}", brief.topic);
    let _ = writeln!(instructions, "Tone: {}", brief.tone);
    let _ = writeln!(
        instructions,
        "Length: about {} words, never fewer than {} or more than {}.",
        brief.target_length, window.0, window.1
    );
    let _ = writeln!(
        instructions,
        "Keywords: {}. Use every keyword naturally, keep each near 1-2% density and put the \
         first one in the title.",
        brief.keywords.join(", ")
    );
    let _ = writeln!(instructions, "Structure: {}", brief.content_type.structure_guidance());
    let _ = writeln!(
        instructions,
        "Format: start with a single '# ' title line, follow it with a \
         '<!-- Meta: ... -->' line of at most {META_LENGTH} characters, then use at least \
         {min_sections} '## ' sections and '### ' only below a '## '."
    );

    if params.include_grounding {
        if !landscape.recommendations.is_empty() {
            let _ = writeln!(instructions, "\nWhat top-ranking pages do:");
            for recommendation in &landscape.recommendations {
                let _ = writeln!(instructions, "- {recommendation}");
            }
        }
        if !insight.gaps.is_empty() {
            let _ = writeln!(
                instructions,
                "Themes competitors cover that you should address: {}.",
                join_themes(insight.gaps.iter().map(|gap| gap.theme.as_str()))
            );
        }
        if !insight.differentiators.is_empty() {
            let _ = writeln!(
                instructions,
                "Angles few competitors cover, emphasize them: {}.",
                join_themes(insight.differentiators.iter().map(|d| d.theme.as_str()))
            );
        }
    }

    let profile = &brief.profile;
    if let Some(audience) = &profile.audience {
        let _ = writeln!(instructions, "Audience: {audience}.");
    }
    if !profile.industry_terms.is_empty() {
        let _ = writeln!(
            instructions,
            "Use this industry vocabulary where it fits: {}.",
            profile.industry_terms.join(", ")
        );
    }
    if !profile.key_themes.is_empty() {
        let _ = writeln!(instructions, "Weave in these themes: {}.", profile.key_themes.join(", "));
    }
    if let Some(line) = prohibited_line(profile) {
        let _ = writeln!(instructions, "{line}");
    }

    if !params.feedback.is_empty() {
        let _ = writeln!(instructions, "\nThe previous attempt was rejected. Fix these problems:");
        for feedback in &params.feedback {
            let _ = writeln!(instructions, "- {feedback}");
        }
    }

    Prompt::new(system, instructions.trim_end())
}

/// Prompt for rewriting a draft to a voice profile.
pub(crate) fn rewrite_prompt(
    draft: &Draft,
    profile: &StyleProfile,
    tone: &Tone,
    keywords: &[String],
    params: &AdaptParams,
) -> Prompt {
    let system = "You are an editor who rewrites content to match a brand voice without \
                  changing its facts or structure. Respond with the rewritten markdown only.";

    let mut instructions = String::new();
    let _ = writeln!(instructions, "Rewrite the document below in a {tone} tone.");
    if !profile.voice.is_empty() {
        let _ = writeln!(instructions, "Voice: {}.", profile.voice.join(", "));
    }
    if let Some(audience) = &profile.audience {
        let _ = writeln!(instructions, "Audience: {audience}.");
    }
    let _ = writeln!(
        instructions,
        "Keep every heading at its level, keep every figure, date and price, keep the meta \
         comment, and keep each of these keywords at least as often as it appears now: {}.",
        keywords.join(", ")
    );
    let _ = writeln!(
        instructions,
        "Keep the length close to the current {} words.",
        draft.word_count
    );
    if let Some(line) = prohibited_line(profile) {
        let _ = writeln!(instructions, "{line}");
    }
    if !params.flagged_terms.is_empty() {
        let _ = writeln!(
            instructions,
            "The previous rewrite still contained {}. Rephrase every sentence that uses them.",
            params.flagged_terms.join(", ")
        );
    }
    let _ = writeln!(instructions, "\nDocument:\n{}", draft.body);

    Prompt::new(system, instructions.trim_end())
}

#[cfg(test)]
mod tests {
    use seoflow_core::types::{Insight, PipelineRequest};

    use super::*;

    fn brief(profile: StyleProfile) -> DraftBrief {
        DraftBrief::new(
            &PipelineRequest::new("Compact Tractors", 1200, ["compact tractors", "hay"]),
            profile,
        )
    }

    fn insight() -> CompetitorInsight {
        CompetitorInsight {
            differentiators: Vec::new(),
            gaps: vec![Insight {
                theme: "financing options".into(),
                score: 1.0,
                coverage: 2,
            }],
            documents_considered: 2,
        }
    }

    #[test]
    fn test_draft_prompt_carries_brief() {
        let brief = brief(StyleProfile::neutral());
        let landscape = LandscapeResult::neutral(&brief.topic, &brief.keywords, 1200);
        let prompt = draft_prompt(
            &brief,
            &landscape,
            &insight(),
            (1020, 1380),
            2,
            &DraftParams::default(),
        );

        assert!(prompt.instructions.contains("Topic: Compact Tractors"));
        assert!(prompt.instructions.contains("never fewer than 1020 or more than 1380"));
        assert!(prompt.instructions.contains("compact tractors, hay"));
        assert!(prompt.instructions.contains("financing options"));
        assert!(!prompt.instructions.contains("previous attempt"));
    }

    #[test]
    fn test_relaxed_prompt_drops_grounding() {
        let brief = brief(StyleProfile::neutral());
        let landscape = LandscapeResult::neutral(&brief.topic, &brief.keywords, 1200);
        let params = DraftParams {
            include_grounding: false,
            feedback: vec!["Write between 1020 and 1380 words.".into()],
            ..DraftParams::default()
        };
        let prompt = draft_prompt(&brief, &landscape, &insight(), (1020, 1380), 2, &params);

        assert!(!prompt.instructions.contains("financing options"));
        assert!(prompt.instructions.contains("Fix these problems"));
    }

    #[test]
    fn test_rewrite_prompt_lists_prohibited_terms() {
        let mut profile = StyleProfile {
            prohibited_terms: vec!["cheap".into(), "basically".into()],
            ..StyleProfile::default()
        };
        profile.replacements.insert("cheap".into(), "affordable".into());

        let prompt = rewrite_prompt(
            &Draft::new("# Title\n\nBody", 1),
            &profile,
            &Tone::Friendly,
            &["hay".to_owned()],
            &AdaptParams::default(),
        );

        assert!(prompt.instructions.contains("in a friendly tone"));
        assert!(prompt.instructions.contains("\"cheap\" (write \"affordable\" instead)"));
        assert!(prompt.instructions.contains("\"basically\""));
        assert!(prompt.instructions.contains("close to the current 2 words"));
        assert!(prompt.instructions.ends_with("# Title\n\nBody"));
    }
}
