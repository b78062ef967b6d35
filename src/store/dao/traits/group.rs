//! `GroupStore` — persistence and freshness queries for connection groups
//! (spec §4.B).

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::{Color, Genre, Group, GroupStatus, NewGroup};

/// Outcome of a single `save`. A conflict on `(connection, genre)` among
/// approved groups is not an error the caller needs to unwind over — it's
/// recorded as a warning and the pipeline moves on (spec §4.G.3.d).
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(Group),
    DuplicateConnection,
}

#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub status: Option<GroupStatus>,
    pub colors: Option<Vec<Color>>,
    pub connection_type: Option<String>,
    pub genre: Option<Genre>,
    pub exclude_ids: Vec<Uuid>,
    pub sort_by_freshness: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupPatch {
    pub color: Option<Color>,
    pub status: Option<GroupStatus>,
    pub connection: Option<String>,
}

/// Per-color counts, keyed the same way across `CountsByColor` and
/// `UnusedCounts` (spec §4.B, §4.H.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorCounts {
    pub yellow: i64,
    pub green: i64,
    pub blue: i64,
    pub purple: i64,
}

impl ColorCounts {
    pub fn get(&self, color: Color) -> i64 {
        match color {
            Color::Yellow => self.yellow,
            Color::Green => self.green,
            Color::Blue => self.blue,
            Color::Purple => self.purple,
        }
    }

    pub fn increment(&mut self, color: Color) {
        match color {
            Color::Yellow => self.yellow += 1,
            Color::Green => self.green += 1,
            Color::Blue => self.blue += 1,
            Color::Purple => self.purple += 1,
        }
    }

    pub fn min(&self) -> i64 {
        self.yellow.min(self.green).min(self.blue).min(self.purple)
    }
}

/// One group per color, ordered by `(usageCount ASC, lastUsedAt ASC NULLS
/// FIRST, createdAt ASC)` — the canonical assembly starting point. Any color
/// may be absent when the pool has nothing left to offer.
#[derive(Debug, Clone, Default)]
pub struct FreshestSet {
    pub yellow: Option<Group>,
    pub green: Option<Group>,
    pub blue: Option<Group>,
    pub purple: Option<Group>,
}

impl FreshestSet {
    pub fn get(&self, color: Color) -> Option<&Group> {
        match color {
            Color::Yellow => self.yellow.as_ref(),
            Color::Green => self.green.as_ref(),
            Color::Blue => self.blue.as_ref(),
            Color::Purple => self.purple.as_ref(),
        }
    }

    /// `None` unless every color slot is filled.
    pub fn complete_ids(&self) -> Option<[Uuid; 4]> {
        Some([
            self.yellow.as_ref()?.id,
            self.green.as_ref()?.id,
            self.blue.as_ref()?.id,
            self.purple.as_ref()?.id,
        ])
    }
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn save(&self, group: NewGroup) -> Result<SaveOutcome>;

    /// Upserts a batch, silently ignoring conflicts on `connection`.
    async fn save_batch(&self, groups: Vec<NewGroup>) -> Result<Vec<Group>>;

    async fn list(&self, filter: GroupFilter) -> Result<(Vec<Group>, i64)>;

    /// Preserves input order; omits ids with no matching row.
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>>;

    async fn update(&self, id: Uuid, patch: GroupPatch) -> Result<Group>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Atomic per id: `usage_count += 1, last_used_at = now()`.
    async fn increment_usage(&self, ids: &[Uuid]) -> Result<()>;

    async fn counts_by_color(&self, genre: &Genre) -> Result<ColorCounts>;

    async fn freshest_set(&self, exclude_ids: &[Uuid], genre: &Genre) -> Result<FreshestSet>;
}
