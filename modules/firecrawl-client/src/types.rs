use serde::{Deserialize, Serialize};

/// Content formats Firecrawl can scrape each result into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentFormat {
    Markdown,
    Html,
    RawHtml,
    Links,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    pub limit: usize,
    /// Server-side budget in milliseconds.
    pub timeout: u64,
    pub scrape_options: ScrapeOptions<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeOptions<'a> {
    pub formats: &'a [ContentFormat],
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<SearchHit>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One search result, scraped into the requested formats.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub url: String,
    /// Search-engine snippet; present even when scraping the page failed.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
}
