//! `PipelineConfigStore` — per-genre tuning knobs, one row per genre, with
//! defaults constructed by the store when no row exists (spec §3, §9 "sum
//! types at every boundary" — the caller never fabricates a default).

use anyhow::Result;
use async_trait::async_trait;

use crate::store::models::{Genre, PipelineConfig};

#[async_trait]
pub trait PipelineConfigStore: Send + Sync {
    /// Returns the stored row, or the default config when none exists.
    async fn get(&self, genre: &Genre) -> Result<PipelineConfig>;

    /// `ON CONFLICT(genre) DO UPDATE` semantics.
    async fn upsert(&self, genre: &Genre, config: PipelineConfig) -> Result<PipelineConfig>;

    /// Every genre with `enabled=true`, for the scheduler to iterate.
    async fn list_enabled(&self) -> Result<Vec<(Genre, PipelineConfig)>>;
}
