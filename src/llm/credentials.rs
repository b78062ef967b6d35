//! Collapses the interactive-vs-cron API key duplication the original
//! system had (spec §9 Open Questions, third bullet) into one abstraction
//! injected at the service boundary.

use anyhow::Result;
use async_trait::async_trait;

/// Supplies the LLM API key for a `FillWindow` invocation. The HTTP
/// adapter decides which implementation to inject: a per-request header
/// for the interactive "Fill Now" path, or the server's own secret for the
/// cron path. `PipelineService` depends only on this trait.
#[async_trait]
pub trait LlmCredentialSource: Send + Sync {
    async fn api_key(&self) -> Result<String>;
}

/// The cron path: reads the server's own configured secret.
pub struct EnvCredentialSource {
    api_key: Option<String>,
}

impl EnvCredentialSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl LlmCredentialSource for EnvCredentialSource {
    async fn api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no LLM API key configured"))
    }
}

/// The interactive path: a key supplied per-request by the caller (e.g.
/// forwarded from a frontend-held secret).
pub struct RequestCredentialSource {
    api_key: String,
}

impl RequestCredentialSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }
}

#[async_trait]
impl LlmCredentialSource for RequestCredentialSource {
    async fn api_key(&self) -> Result<String> {
        Ok(self.api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn env_source_errors_when_unset() {
        let source = EnvCredentialSource::new(None);
        assert!(source.api_key().await.is_err());
    }

    #[tokio::test]
    async fn request_source_returns_the_supplied_key() {
        let source = RequestCredentialSource::new("sk-test");
        assert_eq!(source.api_key().await.unwrap(), "sk-test");
    }
}
