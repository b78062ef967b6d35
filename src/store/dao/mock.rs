//! In-memory store implementations for testing pipeline logic without a
//! real database. Mirrors the real stores' contracts exactly, including
//! the freshness ordering and uniqueness checks, so pipeline tests exercise
//! real decision logic rather than a stub.

#![cfg(test)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::traits::connection_type::{ConnectionTypePatch, ConnectionTypeStore, NewConnectionType};
use super::traits::feedback::{FeedbackStore, NewFeedback};
use super::traits::group::{ColorCounts, FreshestSet, GroupFilter, GroupPatch, GroupStore, SaveOutcome};
use super::traits::pipeline_config::PipelineConfigStore;
use super::traits::puzzle::{NewPuzzle, PuzzleFilter, PuzzlePatch, PuzzleStore};
use crate::store::models::{
    Color, ConnectionType, FeedbackRecord, Genre, Group, GroupStatus, NewGroup, PipelineConfig, Puzzle, PuzzleStatus,
};

#[derive(Default)]
pub struct MockGroupStore {
    groups: Mutex<HashMap<Uuid, Group>>,
}

impl MockGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, group: Group) {
        self.groups.lock().unwrap().insert(group.id, group);
    }
}

#[async_trait]
impl GroupStore for MockGroupStore {
    async fn save(&self, new_group: NewGroup) -> Result<SaveOutcome> {
        let mut groups = self.groups.lock().unwrap();
        let duplicate = groups
            .values()
            .any(|g| g.status == GroupStatus::Approved && g.connection == new_group.connection && g.genre == new_group.genre);
        if duplicate && new_group.status == GroupStatus::Approved {
            return Ok(SaveOutcome::DuplicateConnection);
        }
        let difficulty = new_group.difficulty();
        let group = Group {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            items: new_group.items,
            connection: new_group.connection,
            connection_type: new_group.connection_type,
            difficulty,
            color: new_group.color,
            difficulty_score: difficulty.score(),
            status: new_group.status,
            usage_count: 0,
            last_used_at: None,
            genre: new_group.genre,
            metadata: new_group.metadata,
            source: new_group.source,
        };
        groups.insert(group.id, group.clone());
        Ok(SaveOutcome::Saved(group))
    }

    async fn save_batch(&self, new_groups: Vec<NewGroup>) -> Result<Vec<Group>> {
        let mut saved = Vec::new();
        for g in new_groups {
            if let SaveOutcome::Saved(group) = self.save(g).await? {
                saved.push(group);
            }
        }
        Ok(saved)
    }

    async fn list(&self, filter: GroupFilter) -> Result<(Vec<Group>, i64)> {
        let groups = self.groups.lock().unwrap();
        let mut matched: Vec<Group> = groups
            .values()
            .filter(|g| filter.status.is_none_or(|s| s == g.status))
            .filter(|g| filter.genre.as_ref().is_none_or(|genre| genre == &g.genre))
            .filter(|g| {
                filter
                    .colors
                    .as_ref()
                    .is_none_or(|colors| colors.contains(&g.color))
            })
            .filter(|g| !filter.exclude_ids.contains(&g.id))
            .cloned()
            .collect();
        if filter.sort_by_freshness {
            matched.sort_by(|a, b| {
                a.usage_count
                    .cmp(&b.usage_count)
                    .then_with(|| a.last_used_at.cmp(&b.last_used_at))
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
        }
        let total = matched.len() as i64;
        Ok((matched, total))
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>> {
        let groups = self.groups.lock().unwrap();
        Ok(ids.iter().filter_map(|id| groups.get(id).cloned()).collect())
    }

    async fn update(&self, id: Uuid, patch: GroupPatch) -> Result<Group> {
        let mut groups = self.groups.lock().unwrap();
        let group = groups.get_mut(&id).ok_or_else(|| anyhow::anyhow!("group {id} not found"))?;
        if let Some(color) = patch.color {
            group.color = color;
            group.difficulty = color.difficulty();
            group.difficulty_score = group.difficulty.score();
        }
        if let Some(status) = patch.status {
            group.status = status;
        }
        if let Some(connection) = patch.connection {
            group.connection = connection;
        }
        Ok(group.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.groups.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn increment_usage(&self, ids: &[Uuid]) -> Result<()> {
        let mut groups = self.groups.lock().unwrap();
        for id in ids {
            if let Some(group) = groups.get_mut(id) {
                group.usage_count += 1;
                group.last_used_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn counts_by_color(&self, genre: &Genre) -> Result<ColorCounts> {
        let groups = self.groups.lock().unwrap();
        let mut counts = ColorCounts::default();
        for g in groups.values() {
            if &g.genre == genre && g.status == GroupStatus::Approved {
                counts.increment(g.color);
            }
        }
        Ok(counts)
    }

    async fn freshest_set(&self, exclude_ids: &[Uuid], genre: &Genre) -> Result<FreshestSet> {
        let groups = self.groups.lock().unwrap();
        let mut set = FreshestSet::default();
        for color in Color::ALL {
            let mut candidates: Vec<&Group> = groups
                .values()
                .filter(|g| &g.genre == genre && g.status == GroupStatus::Approved && g.color == color)
                .filter(|g| !exclude_ids.contains(&g.id))
                .collect();
            candidates.sort_by(|a, b| {
                a.usage_count
                    .cmp(&b.usage_count)
                    .then_with(|| a.last_used_at.cmp(&b.last_used_at))
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
            let picked = candidates.into_iter().next().cloned();
            match color {
                Color::Yellow => set.yellow = picked,
                Color::Green => set.green = picked,
                Color::Blue => set.blue = picked,
                Color::Purple => set.purple = picked,
            }
        }
        Ok(set)
    }
}

/// Mirrors `PgPuzzleStore`'s publish-time snapshot behavior: it holds a
/// handle to the group store it was built with so `update(...status=published)`
/// can fetch the live group rows, exactly like the real store's
/// `snapshot_and_apply` transaction does.
pub struct MockPuzzleStore {
    puzzles: Mutex<HashMap<Uuid, Puzzle>>,
    groups: Option<Arc<dyn GroupStore>>,
}

impl Default for MockPuzzleStore {
    fn default() -> Self {
        Self {
            puzzles: Mutex::new(HashMap::new()),
            groups: None,
        }
    }
}

impl MockPuzzleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires a group store so publish-time snapshots reflect real group rows.
    pub fn with_group_store(groups: Arc<dyn GroupStore>) -> Self {
        Self {
            puzzles: Mutex::new(HashMap::new()),
            groups: Some(groups),
        }
    }

    pub fn seed(&self, puzzle: Puzzle) {
        self.puzzles.lock().unwrap().insert(puzzle.id, puzzle);
    }
}

#[async_trait]
impl PuzzleStore for MockPuzzleStore {
    async fn save(&self, input: NewPuzzle) -> Result<Puzzle> {
        let puzzle = Puzzle {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            puzzle_date: None,
            title: None,
            group_ids: input.group_ids,
            status: PuzzleStatus::Pending,
            genre: input.genre,
            source: input.source,
            groups_snapshot: None,
        };
        self.puzzles.lock().unwrap().insert(puzzle.id, puzzle.clone());
        Ok(puzzle)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Puzzle>> {
        Ok(self.puzzles.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, filter: PuzzleFilter) -> Result<(Vec<Puzzle>, i64)> {
        let puzzles = self.puzzles.lock().unwrap();
        let matched: Vec<Puzzle> = puzzles
            .values()
            .filter(|p| filter.status.is_none_or(|s| s == p.status))
            .filter(|p| filter.genre.as_ref().is_none_or(|genre| genre == &p.genre))
            .cloned()
            .collect();
        let total = matched.len() as i64;
        Ok((matched, total))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.puzzles.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn batch_update(&self, updates: Vec<(Uuid, PuzzlePatch)>) -> Result<Vec<Puzzle>> {
        let mut out = Vec::with_capacity(updates.len());
        for (id, patch) in updates {
            out.push(self.update(id, patch).await?);
        }
        Ok(out)
    }

    async fn batch_delete(&self, ids: &[Uuid]) -> Result<()> {
        let mut puzzles = self.puzzles.lock().unwrap();
        for id in ids {
            puzzles.remove(id);
        }
        Ok(())
    }

    async fn update(&self, id: Uuid, patch: PuzzlePatch) -> Result<Puzzle> {
        let publishing = matches!(patch.status, Some(PuzzleStatus::Published));
        let group_ids = {
            let puzzles = self.puzzles.lock().unwrap();
            let puzzle = puzzles.get(&id).ok_or_else(|| anyhow::anyhow!("puzzle {id} not found"))?;
            patch.group_ids.unwrap_or(puzzle.group_ids)
        };

        let snapshot = if publishing {
            match &self.groups {
                Some(groups) => {
                    let fetched = groups.get_by_ids(&group_ids).await?;
                    let snapshot: [Group; 4] = fetched
                        .try_into()
                        .map_err(|g: Vec<Group>| anyhow::anyhow!("expected 4 groups to snapshot, found {}", g.len()))?;
                    Some(snapshot)
                }
                None => None,
            }
        } else {
            None
        };

        let mut puzzles = self.puzzles.lock().unwrap();
        let puzzle = puzzles.get_mut(&id).ok_or_else(|| anyhow::anyhow!("puzzle {id} not found"))?;
        if let Some(date) = patch.puzzle_date {
            puzzle.puzzle_date = date;
        }
        if let Some(title) = patch.title {
            puzzle.title = title;
        }
        if let Some(group_ids) = patch.group_ids {
            puzzle.group_ids = group_ids;
        }
        if let Some(status) = patch.status {
            puzzle.status = status;
        }
        if let Some(snapshot) = snapshot {
            puzzle.groups_snapshot = Some(snapshot);
        }
        Ok(puzzle.clone())
    }

    async fn get_daily(&self, date: NaiveDate, genre: &Genre) -> Result<Option<Puzzle>> {
        let puzzles = self.puzzles.lock().unwrap();
        Ok(puzzles
            .values()
            .find(|p| p.puzzle_date == Some(date) && &p.genre == genre && p.status == PuzzleStatus::Published)
            .cloned())
    }

    async fn empty_days(&self, from: NaiveDate, to: NaiveDate, genre: &Genre) -> Result<Vec<NaiveDate>> {
        let puzzles = self.puzzles.lock().unwrap();
        let taken: HashSet<NaiveDate> = puzzles
            .values()
            .filter(|p| &p.genre == genre)
            .filter_map(|p| p.puzzle_date)
            .collect();
        let mut empty = Vec::new();
        let mut cursor = from;
        while cursor <= to {
            if !taken.contains(&cursor) {
                empty.push(cursor);
            }
            cursor += chrono::Duration::days(1);
        }
        Ok(empty)
    }

    async fn exists_with_group_multiset(&self, group_ids: &[Uuid; 4], genre: &Genre) -> Result<bool> {
        let mut sorted = *group_ids;
        sorted.sort();
        let puzzles = self.puzzles.lock().unwrap();
        Ok(puzzles.values().any(|p| {
            if &p.genre != genre {
                return false;
            }
            let mut other = p.group_ids;
            other.sort();
            other == sorted
        }))
    }

    async fn used_group_ids(&self, genre: &Genre) -> Result<HashSet<Uuid>> {
        let puzzles = self.puzzles.lock().unwrap();
        Ok(puzzles
            .values()
            .filter(|p| &p.genre == genre)
            .flat_map(|p| p.group_ids)
            .collect())
    }
}

#[derive(Default)]
pub struct MockFeedbackStore {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl MockFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for MockFeedbackStore {
    async fn record(&self, feedback: NewFeedback) -> Result<FeedbackRecord> {
        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            items: feedback.items,
            connection: feedback.connection,
            accepted: feedback.accepted,
            rejection_reason: feedback.rejection_reason,
            genre: feedback.genre,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn accepted_examples(&self, limit: i64, genre: &Genre) -> Result<Vec<FeedbackRecord>> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<FeedbackRecord> = records
            .iter()
            .filter(|r| r.accepted && &r.genre == genre)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit.max(0) as usize);
        Ok(matched)
    }

    async fn rejected_examples(&self, limit: i64, genre: &Genre) -> Result<Vec<FeedbackRecord>> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<FeedbackRecord> = records
            .iter()
            .filter(|r| !r.accepted && &r.genre == genre)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit.max(0) as usize);
        Ok(matched)
    }
}

pub struct MockPipelineConfigStore {
    configs: Mutex<HashMap<Genre, PipelineConfig>>,
    defaults: PipelineConfig,
}

impl MockPipelineConfigStore {
    pub fn new(defaults: PipelineConfig) -> Self {
        Self {
            configs: Mutex::new(HashMap::new()),
            defaults,
        }
    }

    pub fn seed(&self, genre: Genre, config: PipelineConfig) {
        self.configs.lock().unwrap().insert(genre, config);
    }
}

#[async_trait]
impl PipelineConfigStore for MockPipelineConfigStore {
    async fn get(&self, genre: &Genre) -> Result<PipelineConfig> {
        Ok(self.configs.lock().unwrap().get(genre).copied().unwrap_or(self.defaults))
    }

    async fn upsert(&self, genre: &Genre, config: PipelineConfig) -> Result<PipelineConfig> {
        self.configs.lock().unwrap().insert(genre.clone(), config);
        Ok(config)
    }

    async fn list_enabled(&self) -> Result<Vec<(Genre, PipelineConfig)>> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(g, c)| (g.clone(), *c))
            .collect())
    }
}

#[derive(Default)]
pub struct MockConnectionTypeStore {
    types: Mutex<HashMap<Uuid, ConnectionType>>,
}

impl MockConnectionTypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, connection_type: ConnectionType) {
        self.types.lock().unwrap().insert(connection_type.id, connection_type);
    }
}

#[async_trait]
impl ConnectionTypeStore for MockConnectionTypeStore {
    async fn list_active(&self, genre: &Genre) -> Result<Vec<ConnectionType>> {
        Ok(self
            .types
            .lock()
            .unwrap()
            .values()
            .filter(|t| &t.genre == genre && t.active)
            .cloned()
            .collect())
    }

    async fn list_all(&self, genre: &Genre) -> Result<Vec<ConnectionType>> {
        Ok(self
            .types
            .lock()
            .unwrap()
            .values()
            .filter(|t| &t.genre == genre)
            .cloned()
            .collect())
    }

    async fn create(&self, input: NewConnectionType) -> Result<ConnectionType> {
        let ct = ConnectionType {
            id: Uuid::new_v4(),
            name: input.name,
            category: input.category,
            description: input.description,
            examples: input.examples,
            active: true,
            genre: input.genre,
        };
        self.types.lock().unwrap().insert(ct.id, ct.clone());
        Ok(ct)
    }

    async fn update(&self, id: Uuid, patch: ConnectionTypePatch) -> Result<ConnectionType> {
        let mut types = self.types.lock().unwrap();
        let ct = types.get_mut(&id).ok_or_else(|| anyhow::anyhow!("connection type {id} not found"))?;
        if let Some(name) = patch.name {
            ct.name = name;
        }
        if let Some(category) = patch.category {
            ct.category = category;
        }
        if let Some(description) = patch.description {
            ct.description = description;
        }
        if let Some(examples) = patch.examples {
            ct.examples = Some(examples);
        }
        if let Some(active) = patch.active {
            ct.active = active;
        }
        Ok(ct.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.types.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn toggle_active(&self, id: Uuid) -> Result<ConnectionType> {
        let mut types = self.types.lock().unwrap();
        let ct = types.get_mut(&id).ok_or_else(|| anyhow::anyhow!("connection type {id} not found"))?;
        ct.active = !ct.active;
        Ok(ct.clone())
    }
}
