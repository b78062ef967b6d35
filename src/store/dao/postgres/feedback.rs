use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::dao::traits::feedback::{FeedbackStore, NewFeedback};
use crate::store::models::{FeedbackRecord, Genre, Item};

pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FeedbackRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    items: sqlx::types::Json<Vec<Item>>,
    connection: String,
    accepted: bool,
    rejection_reason: Option<String>,
    genre: String,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = anyhow::Error;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        let genre = Genre::new(row.genre.clone())
            .ok_or_else(|| anyhow::anyhow!("feedback record {} has empty genre", row.id))?;
        Ok(FeedbackRecord {
            id: row.id,
            created_at: row.created_at,
            items: row.items.0,
            connection: row.connection,
            accepted: row.accepted,
            rejection_reason: row.rejection_reason,
            genre,
        })
    }
}

const SELECT_COLUMNS: &str = "id, created_at, items, connection, accepted, rejection_reason, genre";

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn record(&self, feedback: NewFeedback) -> Result<FeedbackRecord> {
        let row: FeedbackRow = sqlx::query_as(&format!(
            "INSERT INTO group_feedback (id, created_at, items, connection, accepted, rejection_reason, genre) \
             VALUES (gen_random_uuid(), now(), $1, $2, $3, $4, $5) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(sqlx::types::Json(feedback.items))
        .bind(feedback.connection)
        .bind(feedback.accepted)
        .bind(feedback.rejection_reason)
        .bind(feedback.genre.as_str())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert group_feedback row")?;
        row.try_into()
    }

    async fn accepted_examples(&self, limit: i64, genre: &Genre) -> Result<Vec<FeedbackRecord>> {
        let rows: Vec<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM group_feedback \
             WHERE genre = $1 AND accepted = true \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(genre.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch accepted feedback examples")?;
        rows.into_iter().map(FeedbackRecord::try_from).collect()
    }

    async fn rejected_examples(&self, limit: i64, genre: &Genre) -> Result<Vec<FeedbackRecord>> {
        let rows: Vec<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM group_feedback \
             WHERE genre = $1 AND accepted = false \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(genre.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch rejected feedback examples")?;
        rows.into_iter().map(FeedbackRecord::try_from).collect()
    }
}
