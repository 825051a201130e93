//! Walk every issue of a range of volumes and gather article titles.

use std::time::Duration;

use super::client::{HttpClient, RETRY_ATTEMPTS};
use super::links::parse_issue_titles;
use super::Site;
use crate::error::Result;
use crate::export::TitleRecord;

/// Highest issue number probed per volume.
pub const MAX_PROBED_ISSUE: u32 = 19;

const ISSUE_PAUSE: Duration = Duration::from_millis(500);

/// Collects titles from issue pages.
pub struct TitleCollector {
    client: HttpClient,
    site: Site,
}

impl TitleCollector {
    pub fn new(site: Site) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new()?,
            site,
        })
    }

    pub fn with_client(client: HttpClient, site: Site) -> Self {
        Self { client, site }
    }

    /// Fetch issue pages 1, 2, ... until one is missing.
    ///
    /// Each page gets the usual retries, so a transient error does not end
    /// the volume early. The fetched pages are returned so they are not
    /// requested twice.
    pub async fn probe_issues(&self, volume: u32) -> Result<Vec<(u32, String)>> {
        let mut pages = Vec::new();
        for issue in 1..=MAX_PROBED_ISSUE {
            let url = self.site.issue_url(volume, issue);
            match self.client.fetch_text(&url, RETRY_ATTEMPTS).await? {
                Some(html) => pages.push((issue, html)),
                None => break,
            }
        }
        Ok(pages)
    }

    /// Number of issues of `volume` (0 when none respond).
    pub async fn max_issue(&self, volume: u32) -> Result<u32> {
        Ok(self
            .probe_issues(volume)
            .await?
            .last()
            .map(|(issue, _)| *issue)
            .unwrap_or(0))
    }

    /// Titles of volumes `end` down to `start`.
    ///
    /// `on_volume` is called after each volume with the volume number and
    /// its title count.
    pub async fn collect<F>(&self, start: u32, end: u32, mut on_volume: F) -> Result<Vec<TitleRecord>>
    where
        F: FnMut(u32, usize),
    {
        let mut records = Vec::new();
        for volume in (start..=end).rev() {
            let pages = self.probe_issues(volume).await?;
            if pages.is_empty() {
                log::warn!("No issues found for Volume {}", volume);
                on_volume(volume, 0);
                continue;
            }
            log::info!("Volume {} has {} issues", volume, pages.len());

            let before = records.len();
            for (issue, html) in &pages {
                let found = self.records(html, volume, *issue);
                log::info!("Found {} articles in Vol {} Issue {}", found.len(), volume, issue);
                records.extend(found);
                tokio::time::sleep(ISSUE_PAUSE).await;
            }
            on_volume(volume, records.len() - before);
        }
        Ok(records)
    }

    fn records(&self, html: &str, volume: u32, issue: u32) -> Vec<TitleRecord> {
        parse_issue_titles(html, volume, issue, &self.site.slug)
            .into_iter()
            .map(|title| TitleRecord::new(title, volume, issue))
            .collect()
    }
}
