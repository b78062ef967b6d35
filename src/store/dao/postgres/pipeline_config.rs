use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::store::dao::traits::pipeline_config::PipelineConfigStore;
use crate::store::models::{Genre, PipelineConfig};

pub struct PgPipelineConfigStore {
    pool: PgPool,
    defaults: PipelineConfig,
}

impl PgPipelineConfigStore {
    pub fn new(pool: PgPool, defaults: PipelineConfig) -> Self {
        Self { pool, defaults }
    }
}

#[derive(sqlx::FromRow)]
struct PipelineConfigRow {
    genre: String,
    enabled: bool,
    rolling_window_days: i32,
    min_groups_per_color: i32,
    ai_generation_batch_size: i32,
}

impl From<PipelineConfigRow> for PipelineConfig {
    fn from(row: PipelineConfigRow) -> Self {
        PipelineConfig {
            enabled: row.enabled,
            rolling_window_days: row.rolling_window_days.max(0) as u32,
            min_groups_per_color: row.min_groups_per_color.max(0) as u32,
            ai_generation_batch_size: row.ai_generation_batch_size.max(0) as u32,
        }
    }
}

const SELECT_COLUMNS: &str = "genre, enabled, rolling_window_days, min_groups_per_color, ai_generation_batch_size";

#[async_trait]
impl PipelineConfigStore for PgPipelineConfigStore {
    async fn get(&self, genre: &Genre) -> Result<PipelineConfig> {
        let row: Option<PipelineConfigRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM pipeline_config WHERE genre = $1"
        ))
        .bind(genre.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch pipeline_config row")?;
        Ok(row.map(PipelineConfig::from).unwrap_or(self.defaults))
    }

    async fn upsert(&self, genre: &Genre, config: PipelineConfig) -> Result<PipelineConfig> {
        let row: PipelineConfigRow = sqlx::query_as(&format!(
            "INSERT INTO pipeline_config (genre, enabled, rolling_window_days, min_groups_per_color, ai_generation_batch_size) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (genre) DO UPDATE SET \
               enabled = excluded.enabled, \
               rolling_window_days = excluded.rolling_window_days, \
               min_groups_per_color = excluded.min_groups_per_color, \
               ai_generation_batch_size = excluded.ai_generation_batch_size \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(genre.as_str())
        .bind(config.enabled)
        .bind(config.rolling_window_days as i32)
        .bind(config.min_groups_per_color as i32)
        .bind(config.ai_generation_batch_size as i32)
        .fetch_one(&self.pool)
        .await
        .context("failed to upsert pipeline_config row")?;
        Ok(row.into())
    }

    async fn list_enabled(&self) -> Result<Vec<(Genre, PipelineConfig)>> {
        let rows: Vec<PipelineConfigRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM pipeline_config WHERE enabled = true"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to list enabled pipeline_config rows")?;

        rows.into_iter()
            .map(|row| {
                let genre = Genre::new(row.genre.clone())
                    .ok_or_else(|| anyhow::anyhow!("pipeline_config row has empty genre"))?;
                Ok((genre, PipelineConfig::from(row)))
            })
            .collect()
    }
}
