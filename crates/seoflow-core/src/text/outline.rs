//! Markdown heading outline.

use serde::{Deserialize, Serialize};

/// A single ATX markdown heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level, 1 through 6.
    pub level: u8,
    /// Heading text without the leading hashes.
    pub text: String,
    /// Zero-based line index in the source document.
    pub line: usize,
}

/// The ordered headings of a markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Headings in document order.
    pub headings: Vec<Heading>,
}

impl Outline {
    /// Parses ATX headings (`# Title`, `## Section`), skipping fenced code.
    pub fn parse(text: &str) -> Self {
        let mut headings = Vec::new();
        let mut in_fence = false;

        for (line, raw) in text.lines().enumerate() {
            let trimmed = raw.trim_start();
            if trimmed.starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            if let Some(heading) = parse_heading(trimmed, line) {
                headings.push(heading);
            }
        }

        Self { headings }
    }

    /// Returns the first level-1 heading.
    pub fn title(&self) -> Option<&Heading> {
        self.headings.iter().find(|heading| heading.level == 1)
    }

    /// Counts headings per level; index 0 holds H1.
    pub fn counts(&self) -> [usize; 6] {
        let mut counts = [0; 6];
        for heading in &self.headings {
            counts[usize::from(heading.level - 1)] += 1;
        }
        counts
    }

    /// Returns the heading levels in document order.
    pub fn levels(&self) -> Vec<u8> {
        self.headings.iter().map(|heading| heading.level).collect()
    }

    /// Number of headings at the given level.
    pub fn count_level(&self, level: u8) -> usize {
        self.headings.iter().filter(|h| h.level == level).count()
    }

    /// Returns whether the outline has no headings.
    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

fn parse_heading(line: &str, index: usize) -> Option<Heading> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }

    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let text = rest.trim().trim_end_matches('#').trim();
    if text.is_empty() {
        return None;
    }

    Some(Heading {
        level: hashes as u8,
        text: text.to_owned(),
        line: index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "# Compact Tractors\n\nIntro.\n\n## Choosing a Model\n\n### Horsepower\n\n```\n# not a heading\n```\n\n## Maintenance ##\n#hashtag\n";

    #[test]
    fn test_parse_outline() {
        let outline = Outline::parse(DOCUMENT);
        assert_eq!(outline.levels(), vec![1, 2, 3, 2]);
        assert_eq!(outline.title().map(|h| h.text.as_str()), Some("Compact Tractors"));
        assert_eq!(outline.headings[3].text, "Maintenance");
    }

    #[test]
    fn test_counts() {
        let outline = Outline::parse(DOCUMENT);
        assert_eq!(outline.counts(), [1, 2, 1, 0, 0, 0]);
        assert_eq!(outline.count_level(2), 2);
    }

    #[test]
    fn test_empty_document() {
        let outline = Outline::parse("Just a paragraph.");
        assert!(outline.is_empty());
        assert!(outline.title().is_none());
    }
}
