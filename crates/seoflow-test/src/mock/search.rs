//! Mock search source.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use seoflow_core::provider::SearchSource;
use seoflow_core::text::{self, Outline};
use seoflow_core::types::RankedResult;
use seoflow_core::{Error, Result};

const DEFAULT_RESULTS: usize = 5;

const TITLES: [&str; 3] = [
    "The Complete Guide to {}",
    "How to Choose {}",
    "{}: Buying Guide and Costs",
];

const PARAGRAPHS: [&str; 6] = [
    "Buyers usually start with their budget and the work they expect to do every week. \
     Dealers recommend writing down the tasks first and comparing models only afterwards.",
    "Running costs matter as much as the price on the sticker. Fuel, servicing and spare \
     parts add up over the years and differ a lot between brands.",
    "Most owners keep a simple maintenance log. Regular checks of fluids, filters and \
     tyres prevent the breakdowns that cost the most during busy seasons.",
    "Financing options range from dealer plans to leasing. Reading the small print on \
     interest and early repayment saves money over the full term.",
    "Attachments decide how versatile a machine really is. Loaders, mowers and blades \
     turn one purchase into a tool for the whole year.",
    "Reviews from other owners are the best guide to reliability. Forums and local \
     groups share honest experiences that brochures leave out.",
];

#[derive(Debug, Default)]
struct SearchState {
    calls: Mutex<HashMap<String, u32>>,
}

/// Mock search source returning synthetic ranked pages.
///
/// Every keyword yields the same pages on every call. Lookups are counted
/// per normalized keyword, including lookups that fail.
#[derive(Debug, Clone)]
pub struct MockSearchSource {
    results: usize,
    latency: Duration,
    failing: HashSet<String>,
    failing_all: bool,
    state: Arc<SearchState>,
}

impl Default for MockSearchSource {
    fn default() -> Self {
        Self {
            results: DEFAULT_RESULTS,
            latency: Duration::ZERO,
            failing: HashSet::new(),
            failing_all: false,
            state: Arc::default(),
        }
    }
}

impl MockSearchSource {
    /// Creates a source returning five pages per keyword.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of pages returned per keyword.
    pub fn with_results(mut self, results: usize) -> Self {
        self.results = results;
        self
    }

    /// Delays every lookup by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes lookups for `keyword` fail.
    pub fn failing(mut self, keyword: &str) -> Self {
        self.failing.insert(text::normalize(keyword));
        self
    }

    /// Makes every lookup fail.
    pub fn failing_all(mut self) -> Self {
        self.failing_all = true;
        self
    }

    /// Number of lookups made for `keyword`.
    pub fn calls(&self, keyword: &str) -> u32 {
        self.lock_calls()
            .get(&text::normalize(keyword))
            .copied()
            .unwrap_or(0)
    }

    /// Number of lookups made for any keyword.
    pub fn total_calls(&self) -> u32 {
        self.lock_calls().values().sum()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.state
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl SearchSource for MockSearchSource {
    async fn lookup(&self, keyword: &str) -> Result<Vec<RankedResult>> {
        let key = text::normalize(keyword);
        *self.lock_calls().entry(key.clone()).or_insert(0) += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing_all || self.failing.contains(&key) {
            return Err(Error::external_source_unavailable()
                .with_message(format!("mock search unavailable for '{key}'")));
        }

        Ok((1..=self.results).map(|rank| page(&key, rank)).collect())
    }
}

fn title_case(phrase: &str) -> String {
    phrase
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn page(keyword: &str, rank: usize) -> RankedResult {
    let title = TITLES[rank % TITLES.len()].replace("{}", &title_case(keyword));
    let host = format!("site{rank}.example.com");
    let url = format!("https://{host}/{}", keyword.replace(' ', "-"));

    let mut content = format!(
        "## What to know about {keyword}\n\n\
         Choosing {keyword} starts with an honest look at your needs. {}\n\n\
         ## Buying guide\n\n{}\n\n### Maintenance\n\n{}\n\n\
         ## Costs and financing\n\n{} Prices for {keyword} vary by region and season.\n",
        PARAGRAPHS[0], PARAGRAPHS[1], PARAGRAPHS[2], PARAGRAPHS[3],
    );
    // Lower-ranked pages run longer so the length profile has a spread.
    for extra in 0..rank * 3 {
        content.push('\n');
        content.push_str(PARAGRAPHS[(rank + extra) % PARAGRAPHS.len()]);
        content.push('\n');
    }
    if rank % 2 == 0 {
        content.push_str(&format!(
            "\n## Frequently asked questions\n\nIs {keyword} worth it? For most owners, yes.\n"
        ));
    }

    let mut result = ranked_result(rank as u32, &url, &title, &content);
    result.meta_description = Some(format!(
        "Everything you need to know about {keyword}: costs, maintenance and buying tips."
    ));
    result.internal_links = 2 + rank;
    result.external_links = 2;
    result.external_domains = vec![
        "extension.example.org".to_owned(),
        format!("dealer{rank}.example.net"),
    ];
    result
}

/// Builds a ranked page from markdown content, deriving its headings and
/// word count.
pub fn ranked_result(rank: u32, url: &str, title: &str, content: &str) -> RankedResult {
    RankedResult {
        rank,
        url: url.to_owned(),
        title: title.to_owned(),
        meta_description: None,
        headings: Outline::parse(content).headings,
        word_count: text::word_count(content),
        content: content.to_owned(),
        internal_links: 0,
        external_links: 0,
        external_domains: Vec::new(),
    }
}
