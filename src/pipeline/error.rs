//! The domain-facing error taxonomy (spec §7) plus classification of
//! escaped infrastructure errors into the nearest code.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "PascalCase")]
pub enum PipelineErrorCode {
    #[error("insufficient groups")]
    InsufficientGroups,
    #[error("duplicate puzzle")]
    DuplicatePuzzle,
    #[error("generation failed")]
    GenerationFailed,
    #[error("unverified items")]
    Unverified,
    #[error("storage error")]
    StorageError,
    #[error("cancelled")]
    Cancelled,
    #[error("misconfigured")]
    Misconfigured,
}

/// One entry in `PipelineFillResult.errors` (spec §6.3). `date` is empty when
/// the error isn't tied to a specific calendar date (e.g. a color-level
/// generation failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineErrorEntry {
    #[serde(serialize_with = "serialize_date_or_empty")]
    pub date: Option<NaiveDate>,
    pub message: String,
    pub code: PipelineErrorCode,
}

/// The wire format wants `""` rather than `null` for a date-less error
/// entry (spec §6.3: `"date": "YYYY-MM-DD"|""`).
fn serialize_date_or_empty<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        None => serializer.serialize_str(""),
    }
}

impl PipelineErrorEntry {
    pub fn new(date: Option<NaiveDate>, message: impl Into<String>, code: PipelineErrorCode) -> Self {
        Self {
            date,
            message: message.into(),
            code,
        }
    }

    pub fn insufficient_groups(date: Option<NaiveDate>, message: impl Into<String>) -> Self {
        Self::new(date, message, PipelineErrorCode::InsufficientGroups)
    }

    pub fn storage_error(date: Option<NaiveDate>, err: &anyhow::Error) -> Self {
        let code = if looks_like_duplicate(err) {
            PipelineErrorCode::DuplicatePuzzle
        } else {
            PipelineErrorCode::StorageError
        };
        Self::new(date, err.to_string(), code)
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::new(None, message, PipelineErrorCode::GenerationFailed)
    }

    pub fn unverified(message: impl Into<String>) -> Self {
        Self::new(None, message, PipelineErrorCode::Unverified)
    }

    pub fn cancelled() -> Self {
        Self::new(None, "ambient cancellation triggered", PipelineErrorCode::Cancelled)
    }
}

/// A per-date store failure is reclassified as `DuplicatePuzzle` when the
/// underlying error indicates a uniqueness conflict (spec §4.H.7's
/// "the losing writer surfaces a `DuplicatePuzzle` error"), and as
/// `StorageError` otherwise.
fn looks_like_duplicate(err: &anyhow::Error) -> bool {
    if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
        if let sqlx::Error::Database(db_err) = sqlx_err {
            return db_err.is_unique_violation();
        }
    }
    let message = err.to_string().to_lowercase();
    message.contains("duplicate") || message.contains("unique constraint")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dateless_entries_serialize_date_as_empty_string() {
        let entry = PipelineErrorEntry::insufficient_groups(None, "purple deficit");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "");
    }

    #[test]
    fn dated_entries_serialize_iso_dates() {
        let entry = PipelineErrorEntry::new(
            Some(NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()),
            "no groups left",
            PipelineErrorCode::InsufficientGroups,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2025-01-11");
    }
}
