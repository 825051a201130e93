//! Polite HTTP fetching with retry and backoff.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::error::Result;

/// Browser User-Agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Attempts per page fetch.
pub const RETRY_ATTEMPTS: u32 = 3;

const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin wrapper around a configured [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_retry_delay(RETRY_DELAY)
    }

    /// Client whose n-th retry waits `n * retry_delay`.
    pub fn with_retry_delay(retry_delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            retry_delay,
        })
    }

    /// GET `url` as text. `Ok(None)` on 404 or once every attempt has failed.
    pub async fn fetch_text(&self, url: &str, attempts: u32) -> Result<Option<String>> {
        self.fetch(url, attempts, |response| response.text()).await
    }

    /// GET `url` as bytes. `Ok(None)` on 404 or once every attempt has failed.
    pub async fn fetch_bytes(&self, url: &str, attempts: u32) -> Result<Option<Vec<u8>>> {
        let bytes = self.fetch(url, attempts, |response| response.bytes()).await?;
        Ok(bytes.map(|b| b.to_vec()))
    }

    /// Whether a HEAD request for `url` answers 200.
    pub async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).timeout(HEAD_TIMEOUT).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                log::debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }

    /// Transport errors and error statuses are retried; a 404 is final.
    async fn fetch<T, F, Fut>(&self, url: &str, attempts: u32, read: F) -> Result<Option<T>>
    where
        F: Fn(Response) -> Fut,
        Fut: Future<Output = reqwest::Result<T>>,
    {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    log::debug!("{} not found", url);
                    return Ok(None);
                }
                Ok(response) => match response.error_for_status() {
                    Ok(response) => match read(response).await {
                        Ok(body) => return Ok(Some(body)),
                        Err(e) => log::warn!("Attempt {} reading {} failed: {}", attempt, url, e),
                    },
                    Err(e) => log::warn!("Attempt {} for {} failed: {}", attempt, url, e),
                },
                Err(e) => log::warn!("Attempt {} for {} failed: {}", attempt, url, e),
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }
        log::error!("Giving up on {} after {} attempt(s)", url, attempts);
        Ok(None)
    }
}
