//! Mock generative capability.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use seoflow_core::provider::{
    GenerationConstraints, GenerationPurpose, GenerativeCapability, Prompt,
};
use seoflow_core::text::{self, META_PREFIX};
use seoflow_core::{Error, Result};

const DEFAULT_TARGET: u32 = 800;
const KEYWORD_SHARE: f64 = 0.015;

const SECTIONS: [&str; 4] = [
    "Overview",
    "Choosing the Right Option",
    "Practical Tips",
    "Conclusion",
];

const KEYWORD_SENTENCES: [&str; 4] = [
    "Many buyers begin their research with {} and compare several options.",
    "Experienced owners often recommend {} for demanding seasonal work.",
    "A careful look at {} pays off over the years of ownership.",
    "Local dealers can explain how {} fits a particular budget.",
];

const FILLER: [&str; 8] = [
    "Start by listing the jobs you need done every week.",
    "Running costs often matter more than the purchase price.",
    "Regular servicing keeps small problems from growing into expensive repairs.",
    "Ask neighbours and local groups about their own experiences.",
    "Compare warranty terms before signing anything.",
    "A short test drive reveals more than any brochure.",
    "Plan storage space before the delivery date arrives.",
    "Keep receipts and service records together in one place.",
];

const SENTENCES_PER_PARAGRAPH: usize = 4;

#[derive(Debug, Default)]
struct GeneratorState {
    draft_calls: AtomicU32,
    rewrite_calls: AtomicU32,
    last_prompt: Mutex<Option<Prompt>>,
}

/// Mock generative capability.
///
/// Drafts are composed from the structured constraints: a title taken from
/// the prompt's `Topic:` line, a meta description, four sections, every
/// required keyword near 1.5% density and filler up to the target length.
/// Rewrites drop or substitute prohibited terms.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator {
    fixed: Option<String>,
    fail_first: u32,
    echo_rewrites: bool,
    condense_rewrites: bool,
    latency: Duration,
    including: Vec<String>,
    state: Arc<GeneratorState>,
}

impl MockGenerator {
    /// Creates a generator that composes valid drafts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `text` for every draft call instead of composing one.
    pub fn returning(mut self, text: impl Into<String>) -> Self {
        self.fixed = Some(text.into());
        self
    }

    /// Fails the first `calls` draft calls.
    pub fn failing_first(mut self, calls: u32) -> Self {
        self.fail_first = calls;
        self
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns rewrite sources unchanged, ignoring every instruction.
    pub fn echo_rewrites(mut self) -> Self {
        self.echo_rewrites = true;
        self
    }

    /// Drops every other prose line without keywords or figures from
    /// rewrites, keeping headings, keyword counts and figures intact.
    pub fn condense_rewrites(mut self) -> Self {
        self.condense_rewrites = true;
        self
    }

    /// Adds a sentence to every composed draft.
    pub fn including(mut self, sentence: impl Into<String>) -> Self {
        self.including.push(sentence.into());
        self
    }

    /// Number of draft calls, failed ones included.
    pub fn draft_calls(&self) -> u32 {
        self.state.draft_calls.load(Ordering::SeqCst)
    }

    /// Number of style rewrite calls.
    pub fn rewrite_calls(&self) -> u32 {
        self.state.rewrite_calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received.
    pub fn last_prompt(&self) -> Option<Prompt> {
        self.state
            .last_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn compose(&self, prompt: &Prompt, constraints: &GenerationConstraints) -> String {
        let target = constraints.target_words.unwrap_or(DEFAULT_TARGET) as usize;
        let keywords = &constraints.required_keywords;
        let primary = keywords.first().map_or("the topic", String::as_str);

        let title = prompt
            .instructions
            .lines()
            .find_map(|line| line.strip_prefix("Topic:"))
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .map_or_else(|| primary.to_owned(), str::to_owned);
        let meta = format!("A practical guide to {primary} with advice, comparisons and tips.");

        let mut sections: [Vec<String>; 4] = Default::default();
        sections[0].extend(self.including.iter().cloned());

        // Longer keywords first, so shorter keywords they contain are only
        // topped up to the share they still lack.
        let desired = ((target as f64 * KEYWORD_SHARE).round() as usize).max(1);
        let mut ordered: Vec<&String> = keywords.iter().collect();
        ordered.sort_by_key(|keyword| Reverse(keyword.chars().count()));

        let mut slot = 0;
        for keyword in ordered {
            let present = text::count_occurrences(&render(&title, &meta, &sections), keyword);
            for _ in present..desired {
                let template = KEYWORD_SENTENCES[slot % KEYWORD_SENTENCES.len()];
                sections[slot % SECTIONS.len()].push(template.replace("{}", keyword));
                slot += 1;
            }
        }

        let mut words = text::word_count(&render(&title, &meta, &sections));
        let mut index = 0;
        while words < target {
            let sentence = FILLER[index % FILLER.len()];
            sections[index % SECTIONS.len()].push(sentence.to_owned());
            words += text::word_count(sentence);
            index += 1;
        }

        render(&title, &meta, &sections)
    }
}

fn render(title: &str, meta: &str, sections: &[Vec<String>; 4]) -> String {
    let mut body = format!("# {title}\n<!-- {META_PREFIX} {meta} -->\n");
    for (heading, sentences) in SECTIONS.iter().zip(sections) {
        body.push_str(&format!("\n## {heading}\n"));
        for paragraph in sentences.chunks(SENTENCES_PER_PARAGRAPH) {
            body.push('\n');
            body.push_str(&paragraph.join(" "));
            body.push('\n');
        }
    }
    body
}

fn scrub(source: &str, constraints: &GenerationConstraints) -> String {
    let mut terms: Vec<&String> = constraints.prohibited_terms.iter().collect();
    terms.sort_by_key(|term| Reverse(term.chars().count()));

    terms.into_iter().fold(source.to_owned(), |body, term| {
        let replacement = constraints
            .replacements
            .get(&text::normalize(term))
            .map_or("", String::as_str);
        text::replace_phrase(&body, term, replacement).0
    })
}

fn condense(source: &str, keywords: &[String]) -> String {
    let mut eligible = 0;
    source
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            let prose = !trimmed.is_empty()
                && !trimmed.starts_with('#')
                && !trimmed.starts_with("<!--")
                && !trimmed.chars().any(|c| c.is_ascii_digit())
                && !keywords.iter().any(|keyword| text::contains_phrase(trimmed, keyword));
            if !prose {
                return true;
            }
            eligible += 1;
            eligible % 2 == 1
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait::async_trait]
impl GenerativeCapability for MockGenerator {
    async fn invoke(&self, prompt: &Prompt, constraints: &GenerationConstraints) -> Result<String> {
        *self
            .state
            .last_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(prompt.clone());

        let counter = match constraints.purpose {
            GenerationPurpose::Draft => &self.state.draft_calls,
            GenerationPurpose::StyleRewrite => &self.state.rewrite_calls,
        };
        let call = counter.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match constraints.purpose {
            GenerationPurpose::Draft => {
                if call < self.fail_first {
                    return Err(Error::generation_failed()
                        .with_message(format!("mock draft call {} failed", call + 1)));
                }
                Ok(self
                    .fixed
                    .clone()
                    .unwrap_or_else(|| self.compose(prompt, constraints)))
            }
            GenerationPurpose::StyleRewrite => {
                let source = constraints.source_text.as_deref().unwrap_or_default();
                if self.echo_rewrites {
                    return Ok(source.to_owned());
                }
                let scrubbed = scrub(source, constraints);
                if self.condense_rewrites {
                    return Ok(condense(&scrubbed, &constraints.required_keywords));
                }
                Ok(scrubbed)
            }
        }
    }
}
