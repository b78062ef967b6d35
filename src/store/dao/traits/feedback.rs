//! `FeedbackStore` — append-only accept/reject records used to shape LLM
//! prompts with learned exemplars (spec §4.D).

use anyhow::Result;
use async_trait::async_trait;

use crate::store::models::{FeedbackRecord, Genre, Item};

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub items: Vec<Item>,
    pub connection: String,
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub genre: Genre,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn record(&self, feedback: NewFeedback) -> Result<FeedbackRecord>;

    /// Most recent `limit` accepted records for this genre, newest first.
    async fn accepted_examples(&self, limit: i64, genre: &Genre) -> Result<Vec<FeedbackRecord>>;

    /// Most recent `limit` rejected records for this genre, newest first.
    async fn rejected_examples(&self, limit: i64, genre: &Genre) -> Result<Vec<FeedbackRecord>>;
}
