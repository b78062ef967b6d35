//! Retry classification for outbound HTTP calls (LLM provider, catalog
//! verifiers). Mirrors the triage used before handing a call to
//! `util::retry`: retry transient failures, give up immediately on the rest.

use anyhow::Error;
use reqwest::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient network/server error — safe to retry.
    Retryable,
    /// Client-side/validation error — retrying won't help.
    NonRetryable,
    /// Credentials or configuration are wrong — surface immediately.
    Fatal,
}

#[must_use]
pub fn classify_error(error: &Error) -> ErrorKind {
    if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return ErrorKind::Retryable;
        }
        if let Some(status) = reqwest_err.status() {
            match status {
                StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS => return ErrorKind::Retryable,
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                    return ErrorKind::NonRetryable;
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return ErrorKind::Fatal,
                _ => {}
            }
        }
    }

    if let Some(sqlx_err) = error.downcast_ref::<sqlx::Error>() {
        match sqlx_err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Database(_) => {
                return ErrorKind::Retryable;
            }
            sqlx::Error::RowNotFound => return ErrorKind::NonRetryable,
            sqlx::Error::Configuration(_) => return ErrorKind::Fatal,
            _ => {}
        }
    }

    ErrorKind::NonRetryable
}

#[must_use]
pub fn is_retryable(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::Retryable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn generic_error_is_non_retryable() {
        let error = anyhow!("validation failed");
        assert!(!is_retryable(&error));
    }
}
