pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::{ContentFormat, SearchHit};

use std::time::Duration;

use types::{ScrapeOptions, SearchRequest, SearchResponse};

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Slack on top of the server-side timeout so the server gets to report first.
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct FirecrawlClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FirecrawlClient {
    /// `api_key` may be omitted for self-hosted instances.
    pub fn new(api_key: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.map(String::from),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search the web and scrape each hit into `formats`.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        timeout: Duration,
        formats: &[ContentFormat],
    ) -> Result<Vec<SearchHit>> {
        let endpoint = format!("{}/v1/search", self.base_url);
        let body = SearchRequest {
            query,
            limit,
            timeout: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            scrape_options: ScrapeOptions { formats },
        };

        let mut request = self
            .client
            .post(&endpoint)
            .timeout(timeout + CLIENT_TIMEOUT_GRACE)
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        // Firecrawl reports its own scrape timeout as 408
        if status == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(FirecrawlError::Timeout(timeout));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = resp.json().await.map_err(|e| classify(e, timeout))?;
        if !parsed.success {
            return Err(FirecrawlError::Unsuccessful(
                parsed.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        tracing::debug!(query, hits = parsed.data.len(), "Firecrawl search complete");
        Ok(parsed.data)
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> FirecrawlError {
    if err.is_timeout() {
        FirecrawlError::Timeout(timeout)
    } else {
        FirecrawlError::Network(err.to_string())
    }
}
