//! The abstract LLM provider contract the generator depends on. The core
//! owns prompt construction and response parsing (`llm::prompt`,
//! `llm::parser`); this module owns only the HTTP round-trip (spec §1
//! OUT OF SCOPE: "the LLM provider's HTTP client").

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::util::error::is_retryable;
use crate::util::retry::RetryConfig;

/// Recommended upper bound for a single LLM call (spec §5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One call, returning the raw text completion (pre/post prose is the
    /// parser's problem, not the provider's).
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

pub struct HttpLlmProvider {
    client: Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpLlmProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().build().context("failed to build LLM HTTP client")?;
        let base_url = Url::parse(&base_url.into()).context("invalid LLM provider base URL")?;
        Ok(Self {
            client,
            base_url,
            timeout,
            retry: RetryConfig::default(),
        })
    }

    async fn call_once(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = self.base_url.join("v1/generate").context("failed to build LLM generate URL")?;

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&GenerateRequest { prompt })
            .timeout(self.timeout)
            .send()
            .await
            .context("LLM generate request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("LLM provider returned error status {status}: {body}"));
        }

        let parsed: GenerateResponse = response.json().await.context("failed to deserialize LLM response")?;
        Ok(parsed.text)
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
            match self.call_once(api_key, prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if self.retry.can_retry(attempt + 1) && is_retryable(&err) => {
                    warn!(attempt, error = %err, "retrying LLM generate call");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
pub struct MockLlmProvider {
    pub response: String,
}

#[cfg(test)]
#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate(&self, _api_key: &str, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}
