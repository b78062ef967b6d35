//! The external catalog's abstract contract. The core depends only on this
//! trait — the catalog provider's own HTTP client is out of scope (spec §1
//! OUT OF SCOPE).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

/// Upper bound for a single verifier call (spec §5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct CatalogCandidate {
    pub external_id: i64,
    pub title: String,
    pub year: Option<i32>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Upstream search by informal title; results are unranked, the
    /// `Verifier` applies its own matching policy.
    async fn search(&self, title: &str) -> Result<Vec<CatalogCandidate>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
    title: String,
    year: Option<i32>,
}

pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().build().context("failed to build catalog HTTP client")?;
        let base_url = Url::parse(&base_url.into()).context("invalid catalog base URL")?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            timeout,
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search(&self, title: &str) -> Result<Vec<CatalogCandidate>> {
        let mut url = self.base_url.join("search").context("failed to build catalog search URL")?;
        url.query_pairs_mut().append_pair("q", title);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .context("catalog search request failed")?
            .error_for_status()
            .context("catalog search endpoint returned error status")?;

        let parsed: SearchResponse = response.json().await.context("failed to deserialize catalog response")?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| CatalogCandidate {
                external_id: r.id,
                title: r.title,
                year: r.year,
            })
            .collect())
    }
}

#[cfg(test)]
pub struct MockCatalogClient {
    pub candidates: Vec<CatalogCandidate>,
}

#[cfg(test)]
#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn search(&self, _title: &str) -> Result<Vec<CatalogCandidate>> {
        Ok(self.candidates.clone())
    }
}
