use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{RankerError, Result};
use crate::types::SearchResult;

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Custom Search returns at most 10 items per request.
pub const MAX_PAGE_SIZE: usize = 10;

// --- WebSearcher trait ---

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Return up to `max_results` result URLs in provider order.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

// --- Google Custom Search ---

#[derive(Debug, serde::Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, serde::Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    link: Option<String>,
}

pub struct GoogleSearcher {
    api_key: String,
    cse_id: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleSearcher {
    pub fn new(api_key: &str, cse_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            cse_id: cse_id.to_string(),
            endpoint: GOOGLE_SEARCH_URL.to_string(),
            client,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        num: usize,
    ) -> Result<Vec<CustomSearchItem>> {
        debug!(query, start, num, "Custom Search page request");

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
            ])
            .query(&[("start", start), ("num", num)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RankerError::Transport(format!(
                "Custom Search returned {status}: {body}"
            )));
        }

        let data: CustomSearchResponse = resp.json().await?;
        Ok(data.items)
    }
}

#[async_trait]
impl WebSearcher for GoogleSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        info!(query, max_results, "Google search");

        let mut results = Vec::new();
        let mut start = 1;

        while results.len() < max_results {
            let batch = MAX_PAGE_SIZE.min(max_results - results.len());
            let page = self.fetch_page(query, start, batch).await?;

            if page.is_empty() {
                debug!(query, start, "Custom Search exhausted");
                break;
            }

            results.extend(
                page.into_iter()
                    .filter_map(|item| item.link)
                    .map(|url| SearchResult { url }),
            );
            start += batch;
        }

        results.truncate(max_results);
        info!(query, count = results.len(), "Google search complete");
        Ok(results)
    }
}
