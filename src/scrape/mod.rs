//! Journal website scraping: issue PDFs and article titles.
//!
//! HTML heuristics live in [`links`] as pure functions over page text; the
//! network side ([`client`], [`issue`], [`titles`]) is async and meant to
//! run on a current-thread runtime, one request at a time.

pub mod client;
pub mod issue;
pub mod links;
pub mod titles;

use std::path::PathBuf;
use std::time::Duration;

pub use client::HttpClient;
pub use issue::{ArticleOutcome, IssueScraper, IssueSummary};
pub use links::{parse_article_links, parse_issue_titles, parse_pdf_link, ArticleLink};
pub use titles::TitleCollector;

/// Default journal site.
pub const DEFAULT_BASE_URL: &str = "https://intjexersci.com";
/// Default URL path segment of the journal.
pub const DEFAULT_SLUG: &str = "ijes";
/// Default folder label.
pub const DEFAULT_LABEL: &str = "IJES";

/// Which journal to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub base_url: String,
    pub slug: String,
    pub label: String,
}

impl Site {
    pub fn new(base_url: impl Into<String>, slug: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            slug: slug.into(),
            label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Table-of-contents URL of one issue.
    pub fn issue_url(&self, volume: u32, issue: u32) -> String {
        format!("{}/{}/vol{}/iss{}/", self.base_url, self.slug, volume, issue)
    }

    /// `<LABEL> Volume <v>`
    pub fn volume_folder(&self, volume: u32) -> String {
        format!("{} Volume {}", self.label, volume)
    }

    /// `<LABEL> <v>-<i>`
    pub fn issue_folder(&self, volume: u32, issue: u32) -> String {
        format!("{} {}-{}", self.label, volume, issue)
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_SLUG)
    }
}

/// Options for downloading an issue.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub site: Site,
    pub output_dir: PathBuf,
    /// Pause after each download
    pub delay: Duration,
}

impl ScrapeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, site: Site) -> Self {
        self.site = site;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `<output>/<LABEL> Volume v/<LABEL> v-i`
    pub fn issue_dir(&self, volume: u32, issue: u32) -> PathBuf {
        self.output_dir
            .join(self.site.volume_folder(volume))
            .join(self.site.issue_folder(volume, issue))
    }
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            site: Site::default(),
            output_dir: PathBuf::from("downloads"),
            delay: Duration::from_secs(1),
        }
    }
}
