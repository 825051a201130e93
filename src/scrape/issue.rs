//! Download every article PDF of one issue.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Serialize;

use super::client::{HttpClient, RETRY_ATTEMPTS};
use super::links::{constructed_pdf_candidates, parse_article_links, parse_pdf_link, ArticleLink};
use super::ScrapeOptions;
use crate::error::{Error, Result};
use crate::titles::sanitize_filename;

/// What happened to one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArticleOutcome {
    Downloaded(PathBuf),
    AlreadyExists(PathBuf),
    NoPdf,
    Failed(String),
}

impl ArticleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ArticleOutcome::Downloaded(_) | ArticleOutcome::AlreadyExists(_)
        )
    }
}

/// Result of scraping one issue.
#[derive(Debug, Clone, Serialize)]
pub struct IssueSummary {
    pub successful: usize,
    pub total: usize,
    pub issue_dir: PathBuf,
}

/// Scrapes issue pages of one journal site.
pub struct IssueScraper {
    client: HttpClient,
    options: ScrapeOptions,
}

impl IssueScraper {
    pub fn new(options: ScrapeOptions) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new()?,
            options,
        })
    }

    pub fn with_client(client: HttpClient, options: ScrapeOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Article links on the issue's table of contents.
    pub async fn get_article_links(&self, volume: u32, issue: u32) -> Result<Vec<ArticleLink>> {
        let site = &self.options.site;
        let url = site.issue_url(volume, issue);
        log::info!("Fetching issue page: {}", url);

        let Some(html) = self.client.fetch_text(&url, RETRY_ATTEMPTS).await? else {
            return Ok(Vec::new());
        };
        let page_url = parse_url(&url)?;
        Ok(parse_article_links(&html, &page_url, volume, issue, &site.slug))
    }

    /// Resolve the PDF URL of an article page, probing constructed URLs last.
    pub async fn get_pdf_url(&self, article_url: &str) -> Result<Option<String>> {
        let site = &self.options.site;

        if let Some(html) = self.client.fetch_text(article_url, RETRY_ATTEMPTS).await? {
            let base = parse_url(article_url)?;
            if let Some(url) = parse_pdf_link(&html, &base, &site.slug) {
                return Ok(Some(url.to_string()));
            }
        }

        for candidate in constructed_pdf_candidates(article_url, &site.base_url, &site.slug) {
            log::debug!("Trying constructed URL: {}", candidate);
            if self.client.exists(&candidate).await {
                log::info!("Found PDF via constructed URL: {}", candidate);
                return Ok(Some(candidate));
            }
        }

        log::warn!("No PDF found for article: {}", article_url);
        Ok(None)
    }

    /// Download `pdf_url` to `save_path`. `Ok(false)` when the fetch failed.
    pub async fn download_pdf(&self, pdf_url: &str, save_path: &Path) -> Result<bool> {
        let Some(bytes) = self.client.fetch_bytes(pdf_url, RETRY_ATTEMPTS).await? else {
            return Ok(false);
        };
        if let Some(parent) = save_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(save_path, bytes)?;
        log::info!("Downloaded: {}", save_path.display());
        Ok(true)
    }

    /// Download every article of an issue.
    ///
    /// `on_article` receives the article index, the article count, the
    /// article and its outcome.
    pub async fn scrape_issue<F>(&self, volume: u32, issue: u32, mut on_article: F) -> Result<IssueSummary>
    where
        F: FnMut(usize, usize, &ArticleLink, &ArticleOutcome),
    {
        log::info!("Starting scrape for Volume {}, Issue {}", volume, issue);
        let issue_dir = self.options.issue_dir(volume, issue);
        fs::create_dir_all(&issue_dir)?;

        let articles = self.get_article_links(volume, issue).await?;
        if articles.is_empty() {
            log::warn!("No articles found for Volume {}, Issue {}", volume, issue);
        }

        let total = articles.len();
        let mut successful = 0;
        for (index, article) in articles.iter().enumerate() {
            let outcome = self.scrape_article(article, &issue_dir).await;
            if outcome.is_success() {
                successful += 1;
            }
            on_article(index, total, article, &outcome);
        }

        log::info!("Downloaded {}/{} articles", successful, total);
        Ok(IssueSummary {
            successful,
            total,
            issue_dir,
        })
    }

    async fn scrape_article(&self, article: &ArticleLink, issue_dir: &Path) -> ArticleOutcome {
        let pdf_url = match self.get_pdf_url(&article.url).await {
            Ok(Some(url)) => url,
            Ok(None) => return ArticleOutcome::NoPdf,
            Err(e) => return ArticleOutcome::Failed(e.to_string()),
        };

        let save_path = issue_dir.join(format!("{}.pdf", sanitize_filename(&article.title)));
        if save_path.exists() {
            log::info!("Already exists: {}", save_path.display());
            return ArticleOutcome::AlreadyExists(save_path);
        }

        match self.download_pdf(&pdf_url, &save_path).await {
            Ok(true) => {
                tokio::time::sleep(self.options.delay).await;
                ArticleOutcome::Downloaded(save_path)
            }
            Ok(false) => ArticleOutcome::Failed(format!("download failed: {}", pdf_url)),
            Err(e) => ArticleOutcome::Failed(e.to_string()),
        }
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::Http(format!("invalid URL {}: {}", url, e)))
}
