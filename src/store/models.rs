//! Domain types shared by every store trait and the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content domain (films, music, books, sports, ...). Genres are data-driven
/// (new ones are added via `PipelineConfig` rows, not by extending an enum),
/// so this is a validated newtype rather than a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Genre(String);

impl Genre {
    /// Normalizes to lowercase/trimmed so "Films" and "films " compare equal.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let trimmed = raw.into().trim().to_lowercase();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four-valued difficulty band every published puzzle must have one group of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Yellow,
    Green,
    Blue,
    Purple,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Yellow, Color::Green, Color::Blue, Color::Purple];

    /// `color ↔ difficulty` is one-to-one; this is the single source of truth
    /// for that mapping so the two enums can never drift apart.
    pub fn difficulty(self) -> Difficulty {
        match self {
            Color::Yellow => Difficulty::Easy,
            Color::Green => Difficulty::Medium,
            Color::Blue => Difficulty::Hard,
            Color::Purple => Difficulty::Hardest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Hardest,
}

impl Difficulty {
    pub fn color(self) -> Color {
        match self {
            Difficulty::Easy => Color::Yellow,
            Difficulty::Medium => Color::Green,
            Difficulty::Hard => Color::Blue,
            Difficulty::Hardest => Color::Purple,
        }
    }

    /// The storage-facing difficulty score, 1..4 (spec §4.G color→difficulty mapping).
    pub fn score(self) -> i16 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::Hardest => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PuzzleStatus {
    Pending,
    Approved,
    Published,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Source {
    System,
    User,
}

/// An informal `(title, year?)` pair before verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub year: Option<i32>,
}

/// The result of running an `Item` through a `Verifier`. Invariant: once
/// `verified == true` for a verifying domain, `external_id` is set — a
/// `Verifier` implementation that can't guarantee this must report
/// `requires_external_id() == false` (see [`crate::verify::Verifier`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedItem {
    pub title: String,
    pub year: Option<i32>,
    pub external_id: Option<i64>,
    pub verified: bool,
}

impl VerifiedItem {
    pub fn unverified(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            year: item.year,
            external_id: None,
            verified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: [VerifiedItem; 4],
    pub connection: String,
    pub connection_type: String,
    pub difficulty: Difficulty,
    pub color: Color,
    pub difficulty_score: i16,
    pub status: GroupStatus,
    pub usage_count: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub genre: Genre,
    pub metadata: serde_json::Value,
    pub source: Source,
}

/// Fields needed to create a new `Group`; `id`/`created_at`/`usage_count`/
/// `last_used_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub items: [VerifiedItem; 4],
    pub connection: String,
    pub connection_type: String,
    pub color: Color,
    pub status: GroupStatus,
    pub genre: Genre,
    pub metadata: serde_json::Value,
    pub source: Source,
}

impl NewGroup {
    pub fn difficulty(&self) -> Difficulty {
        self.color.difficulty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub puzzle_date: Option<chrono::NaiveDate>,
    pub title: Option<String>,
    pub group_ids: [Uuid; 4],
    pub status: PuzzleStatus,
    pub genre: Genre,
    pub source: Source,
    pub groups_snapshot: Option<[Group; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionCategory {
    WordGame,
    People,
    Thematic,
    Setting,
    Cultural,
    Narrative,
    Character,
    Production,
    Elements,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionType {
    pub id: Uuid,
    pub name: String,
    pub category: ConnectionCategory,
    pub description: String,
    pub examples: Option<Vec<String>>,
    pub active: bool,
    pub genre: Genre,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<Item>,
    pub connection: String,
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub genre: Genre,
}

/// Per-genre pipeline tuning. Missing rows yield defaults from `Config`
/// (spec §3 "missing rows yield defaults" — constructed by the config
/// store, never by the caller, per the Design Notes' "sum types at every
/// boundary" guidance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub enabled: bool,
    pub rolling_window_days: u32,
    pub min_groups_per_color: u32,
    pub ai_generation_batch_size: u32,
}
