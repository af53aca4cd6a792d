//! Text analysis over markdown article bodies.
//!
//! Everything in this module is pure and synchronous. Word counts ignore
//! HTML comments (where the meta description lives) and markdown markup, and
//! phrase matching is case-insensitive on word boundaries, so
//! `"compact tractors"` matches inside `"Sub-compact tractors"` but not inside
//! `"compactors"`.

mod meta;
mod metrics;
mod outline;

pub use meta::{META_PREFIX, meta_description, with_meta_description};
pub use metrics::{ContentMetrics, KeywordStats};
pub use outline::{Heading, Outline};
use regex::{NoExpand, Regex, RegexBuilder};

/// Lower-cases and collapses all whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes `<!-- ... -->` blocks. An unterminated comment runs to the end.
pub fn strip_comments(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        output.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => return output,
        }
    }

    output.push_str(rest);
    output
}

/// Counts whitespace-delimited words containing at least one alphanumeric
/// character, outside of comments.
pub fn word_count(text: &str) -> usize {
    strip_comments(text)
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .count()
}

/// Splits text into lower-cased alphanumeric tokens.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Builds a case-insensitive, word-bounded matcher for `phrase`.
///
/// Words of the phrase may be separated by any run of non-word characters,
/// so `"compact tractors"` also matches `"compact-tractors"`.
pub fn phrase_matcher(phrase: &str) -> Option<Regex> {
    let words = tokens(phrase);
    if words.is_empty() {
        return None;
    }

    let body = words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join(r"[^\p{Alphabetic}\p{N}]+");

    RegexBuilder::new(&format!(r"\b{body}\b"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Counts case-insensitive, word-bounded occurrences of `phrase` in `text`,
/// outside of comments.
pub fn count_occurrences(text: &str, phrase: &str) -> usize {
    phrase_matcher(phrase).map_or(0, |matcher| matcher.find_iter(&strip_comments(text)).count())
}

/// Returns whether `phrase` occurs in `text` at least once.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    count_occurrences(text, phrase) > 0
}

/// Keyword density as a percentage of total words.
pub fn density(occurrences: usize, words: usize) -> f64 {
    if words == 0 {
        return 0.0;
    }
    occurrences as f64 / words as f64 * 100.0
}

/// Replaces every word-bounded, case-insensitive occurrence of `phrase`.
///
/// Returns the rewritten text and the number of replacements made. Runs of
/// whitespace left behind by an empty replacement are collapsed.
pub fn replace_phrase(text: &str, phrase: &str, replacement: &str) -> (String, usize) {
    let Some(matcher) = phrase_matcher(phrase) else {
        return (text.to_owned(), 0);
    };

    let replaced = matcher.find_iter(text).count();
    if replaced == 0 {
        return (text.to_owned(), 0);
    }
    let mut output = matcher.replace_all(text, NoExpand(replacement)).into_owned();

    if replacement.is_empty() {
        output = output
            .lines()
            .map(|line| {
                let indent_len = line.len() - line.trim_start().len();
                let body = line[indent_len..]
                    .split(' ')
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .replace(" ,", ",")
                    .replace(" .", ".");
                format!("{}{}", &line[..indent_len], body)
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    (output, replaced)
}

/// Collects tokens that carry a digit, used as a proxy for factual claims
/// (figures, years, prices, measurements).
pub fn numeric_facts(text: &str) -> Vec<String> {
    let mut facts: Vec<String> = strip_comments(text)
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '%' && c != '$'))
        .filter(|word| word.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_owned)
        .collect();
    facts.sort();
    facts.dedup();
    facts
}

/// Strips a surrounding markdown code fence that generative models sometimes
/// wrap whole documents in.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_owned();
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Compact\t  TRACTORS \n"), "compact tractors");
    }

    #[test]
    fn test_word_count_ignores_markup_and_comments() {
        let text = "# Title Here\n\n<!-- Meta: not counted at all -->\nOne two - three.";
        assert_eq!(word_count(text), 5);
    }

    #[test]
    fn test_count_occurrences_is_word_bounded() {
        let text = "Compact tractors are great. Sub-compact tractors too. Compactors are not.";
        assert_eq!(count_occurrences(text, "compact tractors"), 2);
        assert_eq!(count_occurrences(text, "compact"), 2);
        assert_eq!(count_occurrences(text, ""), 0);
    }

    #[test]
    fn test_count_occurrences_skips_comments() {
        let text = "<!-- Meta: farm equipment -->\nFarm equipment matters.";
        assert_eq!(count_occurrences(text, "farm equipment"), 1);
    }

    #[test]
    fn test_density() {
        assert!((density(12, 1200) - 1.0).abs() < 1e-9);
        assert_eq!(density(3, 0), 0.0);
    }

    #[test]
    fn test_replace_phrase() {
        let (text, count) = replace_phrase("A cheap, Cheap tractor. Cheapest!", "cheap", "affordable");
        assert_eq!(text, "A affordable, affordable tractor. Cheapest!");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_replace_phrase_outside_ascii() {
        let (text, count) = replace_phrase("İzmir sells CHEAP hay. Öl is cheap.", "cheap", "affordable");
        assert_eq!(text, "İzmir sells affordable hay. Öl is affordable.");
        assert_eq!(count, 2);
        assert_eq!(count_occurrences("İzmir cheap hay", "cheap hay"), 1);
    }

    #[test]
    fn test_replace_phrase_keeps_dollar_signs_literal() {
        let (text, count) = replace_phrase("A cheap deal.", "cheap", "$1 off");
        assert_eq!(text, "A $1 off deal.");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_replace_phrase_with_empty_collapses_spaces() {
        let (text, count) = replace_phrase("This is basically fine.", "basically", "");
        assert_eq!(text, "This is fine.");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_numeric_facts() {
        let facts = numeric_facts("Rated at 25 hp, priced $18,000 in 2024. Costs (25%).");
        assert_eq!(facts, vec!["$18,000", "2024", "25", "25%"]);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```markdown\n# Title\nBody\n```"), "# Title\nBody");
        assert_eq!(strip_code_fences("# Plain"), "# Plain");
    }
}
