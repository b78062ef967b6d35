//! `PuzzleStore` — persistence, empty-date discovery, and uniqueness checks
//! for puzzles (spec §4.C).

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::store::models::{Genre, Puzzle, PuzzleStatus, Source};

#[derive(Debug, Clone)]
pub struct NewPuzzle {
    pub group_ids: [Uuid; 4],
    pub genre: Genre,
    pub source: Source,
}

#[derive(Debug, Clone, Default)]
pub struct PuzzleFilter {
    pub status: Option<PuzzleStatus>,
    pub genre: Option<Genre>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `None` leaves a field untouched. `puzzle_date`/`title` use an inner
/// `Option` so a patch can explicitly set them back to null; `status`/
/// `group_ids` have no such need in this pipeline's call sites.
#[derive(Debug, Clone, Default)]
pub struct PuzzlePatch {
    pub puzzle_date: Option<Option<NaiveDate>>,
    pub title: Option<Option<String>>,
    pub status: Option<PuzzleStatus>,
    pub group_ids: Option<[Uuid; 4]>,
}

impl PuzzlePatch {
    pub fn publish(date: NaiveDate) -> Self {
        Self {
            puzzle_date: Some(Some(date)),
            status: Some(PuzzleStatus::Published),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait PuzzleStore: Send + Sync {
    /// Always created `status=pending, puzzle_date=null`.
    async fn save(&self, input: NewPuzzle) -> Result<Puzzle>;

    async fn get(&self, id: Uuid) -> Result<Option<Puzzle>>;

    async fn list(&self, filter: PuzzleFilter) -> Result<(Vec<Puzzle>, i64)>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn batch_update(&self, updates: Vec<(Uuid, PuzzlePatch)>) -> Result<Vec<Puzzle>>;

    async fn batch_delete(&self, ids: &[Uuid]) -> Result<()>;

    /// When `patch.status = Published`, the store atomically snapshots the
    /// current Group rows for `group_ids` into `groups_snapshot` alongside
    /// the status/date change, in a single transaction (spec §5).
    async fn update(&self, id: Uuid, patch: PuzzlePatch) -> Result<Puzzle>;

    /// Only `status=published` rows are visible here. Prefers the snapshot
    /// when present, otherwise assembles from the live group rows.
    async fn get_daily(&self, date: NaiveDate, genre: &Genre) -> Result<Option<Puzzle>>;

    /// `[from, to]` inclusive, minus dates already covered by a puzzle row.
    async fn empty_days(&self, from: NaiveDate, to: NaiveDate, genre: &Genre) -> Result<Vec<NaiveDate>>;

    /// Order-independent: sorts both sides before comparing.
    async fn exists_with_group_multiset(&self, group_ids: &[Uuid; 4], genre: &Genre) -> Result<bool>;

    /// Union of `group_ids` across every puzzle of this genre, published or
    /// not — the exclusion set that prevents a group from being reused.
    async fn used_group_ids(&self, genre: &Genre) -> Result<HashSet<Uuid>>;
}
