//! `PipelineService` (spec §4.H): the top-level orchestrator. Computes
//! demand, drives the generator for deficits, then assembles and publishes
//! puzzles for every empty date in the rolling window.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm::LlmCredentialSource;
use crate::store::dao::traits::group::{ColorCounts, GroupFilter, GroupStore};
use crate::store::dao::traits::puzzle::{NewPuzzle, PuzzleFilter, PuzzlePatch, PuzzleStore};
use crate::store::models::{Color, Genre, GroupStatus, PipelineConfig, Puzzle, Source};

use super::error::PipelineErrorEntry;
use super::generator::PipelineGenerator;
use super::result::PipelineFillResult;
use super::stage::{Stage, StageSink, emit};

/// `AssemblePuzzleForDate`'s hard bound on uniqueness-collision retries
/// (spec §4.H.5, §9: "a hard constant in code").
const MAX_ASSEMBLY_ATTEMPTS: usize = 10;

/// Upper bound on `groupsPerColor` passed to the generator (spec §4.H.6).
const MAX_GROUPS_PER_COLOR: u32 = 30;

/// Small headroom added on top of the raw deficit so a single generation
/// run doesn't leave the pool exactly at the edge again (spec §4.H.6).
const GENERATION_HEADROOM: i64 = 5;

#[derive(Debug, Clone, Copy)]
pub struct PoolHealth {
    pub counts: ColorCounts,
    pub total: i64,
    pub sufficient: bool,
}

pub struct PipelineService {
    group_store: Arc<dyn GroupStore>,
    puzzle_store: Arc<dyn PuzzleStore>,
    generator: Option<Arc<PipelineGenerator>>,
}

impl PipelineService {
    pub fn new(group_store: Arc<dyn GroupStore>, puzzle_store: Arc<dyn PuzzleStore>) -> Self {
        Self {
            group_store,
            puzzle_store,
            generator: None,
        }
    }

    /// `None` means the LLM is not wired; a caller supplying a `credentials`
    /// source to `fill_window` has no effect in that case (spec §4.H.6: the
    /// deficit is recorded as `InsufficientGroups` instead of generated).
    pub fn with_llm(mut self, generator: Arc<PipelineGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// H.1 — `sufficient = min(counts) >= 1`.
    pub async fn check_pool(&self, genre: &Genre) -> Result<PoolHealth> {
        let counts = self.group_store.counts_by_color(genre).await?;
        let total = counts.yellow + counts.green + counts.blue + counts.purple;
        Ok(PoolHealth {
            counts,
            total,
            sufficient: counts.min() >= 1,
        })
    }

    /// H.2 — approved groups not in `UsedGroupIds`, bucketed by color.
    pub async fn unused_counts(&self, genre: &Genre) -> Result<ColorCounts> {
        let used = self.puzzle_store.used_group_ids(genre).await?;
        let (approved, _) = self
            .group_store
            .list(GroupFilter {
                status: Some(GroupStatus::Approved),
                genre: Some(genre.clone()),
                limit: None,
                ..Default::default()
            })
            .await?;

        let mut counts = ColorCounts::default();
        for group in approved {
            if !used.contains(&group.id) {
                counts.increment(group.color);
            }
        }
        Ok(counts)
    }

    /// H.3 — pure function of `(unused, demand)`.
    pub fn colors_needed(unused: &ColorCounts, demand: usize) -> HashSet<Color> {
        Color::ALL
            .into_iter()
            .filter(|&c| unused.get(c) < demand as i64)
            .collect()
    }

    /// H.4 — `[today, today + windowDays - 1]` minus dates already covered.
    pub async fn empty_dates(&self, today: NaiveDate, window_days: u32, genre: &Genre) -> Result<Vec<NaiveDate>> {
        if window_days == 0 {
            return Ok(Vec::new());
        }
        let to = today + chrono::Duration::days(window_days as i64 - 1);
        self.puzzle_store.empty_days(today, to, genre).await
    }

    /// H.5 — bounded uniqueness-aware assembly for one date.
    async fn assemble_puzzle_for_date(
        &self,
        date: NaiveDate,
        genre: &Genre,
        used_set: &mut HashSet<Uuid>,
    ) -> Result<Option<Puzzle>> {
        for _attempt in 0..MAX_ASSEMBLY_ATTEMPTS {
            let exclude: Vec<Uuid> = used_set.iter().copied().collect();
            let freshest = self.group_store.freshest_set(&exclude, genre).await?;
            let Some(ids) = freshest.complete_ids() else {
                return Ok(None);
            };

            if self.puzzle_store.exists_with_group_multiset(&ids, genre).await? {
                used_set.extend(ids);
                continue;
            }

            let puzzle = self
                .puzzle_store
                .save(NewPuzzle {
                    group_ids: ids,
                    genre: genre.clone(),
                    source: Source::System,
                })
                .await?;
            let published = self
                .puzzle_store
                .update(puzzle.id, PuzzlePatch::publish(date))
                .await?;
            self.group_store.increment_usage(&ids).await?;
            return Ok(Some(published));
        }
        Ok(None)
    }

    /// H.6 — the full fill. `today` is threaded in explicitly rather than
    /// read from the ambient clock so callers (and tests) control it.
    pub async fn fill_window(
        &self,
        genre: &Genre,
        config: &PipelineConfig,
        today: NaiveDate,
        credentials: &dyn LlmCredentialSource,
        cancel: &CancellationToken,
        stage_sink: Option<&StageSink>,
    ) -> Result<PipelineFillResult> {
        let mut result = PipelineFillResult::default();

        emit(stage_sink, Stage::CheckingPool);
        let empty_dates = self.empty_dates(today, config.rolling_window_days, genre).await?;
        if empty_dates.is_empty() {
            emit(stage_sink, Stage::Complete);
            return Ok(result);
        }

        let unused = self.unused_counts(genre).await?;
        let demand = empty_dates.len();
        let colors_needed = Self::colors_needed(&unused, demand);

        if !colors_needed.is_empty() {
            match &self.generator {
                Some(generator) => {
                    let groups_per_color = (demand as i64 - unused.min() + GENERATION_HEADROOM)
                        .max(config.ai_generation_batch_size as i64)
                        .min(MAX_GROUPS_PER_COLOR as i64) as usize;

                    match credentials.api_key().await {
                        Ok(api_key) => {
                            let outcome = generator
                                .generate(&api_key, &colors_needed, groups_per_color, genre, stage_sink)
                                .await?;
                            result.ai_generation_triggered = true;
                            result.groups_generated += outcome.groups_generated;
                            result.groups_saved += outcome.groups_saved;
                            result.groups_by_color.yellow.generated += outcome.by_color.yellow.generated;
                            result.groups_by_color.yellow.saved += outcome.by_color.yellow.saved;
                            result.groups_by_color.green.generated += outcome.by_color.green.generated;
                            result.groups_by_color.green.saved += outcome.by_color.green.saved;
                            result.groups_by_color.blue.generated += outcome.by_color.blue.generated;
                            result.groups_by_color.blue.saved += outcome.by_color.blue.saved;
                            result.groups_by_color.purple.generated += outcome.by_color.purple.generated;
                            result.groups_by_color.purple.saved += outcome.by_color.purple.saved;
                            result.errors.extend(outcome.errors);
                        }
                        Err(err) => {
                            result.errors.push(PipelineErrorEntry::generation_failed(err.to_string()));
                        }
                    }
                }
                None => {
                    let names: Vec<&str> = colors_needed.iter().map(|c| c.as_str()).collect();
                    result.errors.push(PipelineErrorEntry::insufficient_groups(
                        None,
                        format!("LLM not wired; deficient colors: {}", names.join(", ")),
                    ));
                }
            }
        }

        let mut used_set = self.puzzle_store.used_group_ids(genre).await?;

        emit(stage_sink, Stage::CreatingPuzzles);
        let mut dates = empty_dates.into_iter();
        for date in &mut dates {
            if cancel.is_cancelled() {
                result.errors.push(PipelineErrorEntry::cancelled());
                emit(stage_sink, Stage::Error);
                return Ok(result);
            }

            match self.assemble_puzzle_for_date(date, genre, &mut used_set).await {
                Ok(Some(puzzle)) => {
                    used_set.extend(puzzle.group_ids);
                    result.puzzles_created += 1;
                    info!(%date, genre = %genre, puzzle_id = %puzzle.id, "published puzzle");
                }
                Ok(None) => {
                    result.empty_days_remaining += 1;
                    result
                        .errors
                        .push(PipelineErrorEntry::insufficient_groups(Some(date), "no unused group combination available"));
                }
                Err(err) => {
                    warn!(%date, genre = %genre, error = %err, "puzzle assembly failed");
                    result.empty_days_remaining += 1;
                    result.errors.push(PipelineErrorEntry::storage_error(Some(date), &err));
                }
            }
        }

        emit(stage_sink, Stage::Complete);
        Ok(result)
    }

    /// Convenience wrapper for the admin surface: the most recent puzzles
    /// across all statuses, used only by the thin HTTP layer.
    pub async fn list_puzzles(&self, filter: PuzzleFilter) -> Result<(Vec<Puzzle>, i64)> {
        self.puzzle_store.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::EnvCredentialSource;
    use crate::pipeline::error::PipelineErrorCode;
    use crate::store::dao::mock::{MockGroupStore, MockPuzzleStore};
    use crate::store::dao::traits::group::GroupPatch;
    use crate::store::models::{GroupStatus, NewGroup, Source, VerifiedItem};
    use serde_json::json;

    fn films() -> Genre {
        Genre::new("films").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_group(color: Color, connection: &str, genre: &Genre) -> NewGroup {
        let items = std::array::from_fn(|i| VerifiedItem {
            title: format!("{connection}-item-{i}"),
            year: Some(2000),
            external_id: Some(i as i64),
            verified: true,
        });
        NewGroup {
            items,
            connection: connection.to_string(),
            connection_type: "thematic".to_string(),
            color,
            status: GroupStatus::Approved,
            genre: genre.clone(),
            metadata: json!({}),
            source: Source::System,
        }
    }

    async fn seed_full_color_pool(group_store: &MockGroupStore, genre: &Genre, per_color: usize) {
        for color in Color::ALL {
            for i in 0..per_color {
                let connection = format!("{:?}-{i}", color);
                group_store.save(new_group(color, &connection, genre)).await.unwrap();
            }
        }
    }

    fn no_llm_service(group_store: Arc<dyn GroupStore>, puzzle_store: Arc<dyn PuzzleStore>) -> PipelineService {
        PipelineService::new(group_store, puzzle_store)
    }

    fn default_config() -> PipelineConfig {
        PipelineConfig {
            enabled: true,
            rolling_window_days: 1,
            min_groups_per_color: 1,
            ai_generation_batch_size: 20,
        }
    }

    // Scenario A — nothing to do: the window is already fully published.
    #[tokio::test]
    async fn scenario_a_nothing_to_do() {
        let genre = films();
        let group_store = Arc::new(MockGroupStore::new());
        let puzzle_store: Arc<dyn PuzzleStore> =
            Arc::new(MockPuzzleStore::with_group_store(group_store.clone() as Arc<dyn GroupStore>));
        let service = no_llm_service(group_store.clone(), Arc::clone(&puzzle_store));

        seed_full_color_pool(&group_store, &genre, 3).await;
        let today = date(2025, 1, 10);
        let config = PipelineConfig {
            rolling_window_days: 3,
            ..default_config()
        };

        // Fill the window once so every day in range already has a published puzzle.
        let cancel = CancellationToken::new();
        let creds = EnvCredentialSource::new(None);
        service.fill_window(&genre, &config, today, &creds, &cancel, None).await.unwrap();

        let result = service.fill_window(&genre, &config, today, &creds, &cancel, None).await.unwrap();
        assert_eq!(result.puzzles_created, 0);
        assert_eq!(result.empty_days_remaining, 0);
        assert!(!result.ai_generation_triggered);
        assert_eq!(result.groups_generated, 0);
        assert!(result.errors.is_empty());
    }

    // Scenario B — straight fill with an ample, disjoint pool.
    #[tokio::test]
    async fn scenario_b_straight_fill_ample_pool() {
        let genre = films();
        let group_store = Arc::new(MockGroupStore::new());
        let puzzle_store: Arc<dyn PuzzleStore> =
            Arc::new(MockPuzzleStore::with_group_store(group_store.clone() as Arc<dyn GroupStore>));
        seed_full_color_pool(&group_store, &genre, 5).await;

        let service = no_llm_service(group_store.clone(), Arc::clone(&puzzle_store));
        let today = date(2025, 1, 10);
        let config = PipelineConfig {
            rolling_window_days: 2,
            ..default_config()
        };
        let cancel = CancellationToken::new();
        let creds = EnvCredentialSource::new(None);

        let result = service.fill_window(&genre, &config, today, &creds, &cancel, None).await.unwrap();
        assert_eq!(result.puzzles_created, 2);
        assert_eq!(result.empty_days_remaining, 0);
        assert!(!result.ai_generation_triggered);

        let (published, _) = puzzle_store
            .list(PuzzleFilter {
                genre: Some(genre.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(published.len(), 2);
        for p in &published {
            assert_eq!(p.status, crate::store::models::PuzzleStatus::Published);
            assert!(p.groups_snapshot.is_some());
        }

        let ids: Vec<Uuid> = published.iter().flat_map(|p| p.group_ids).collect();
        let (all_groups, _) = group_store.list(GroupFilter::default()).await.unwrap();
        for id in &ids {
            let g = all_groups.iter().find(|g| &g.id == id).unwrap();
            assert_eq!(g.usage_count, 1);
        }

        let combo: [Uuid; 4] = published[0].group_ids;
        assert!(puzzle_store.exists_with_group_multiset(&combo, &genre).await.unwrap());
    }

    /// Forces the first `ExistsWithGroupMultiset` check to report a
    /// collision, then defers to the wrapped store — lets a test exercise
    /// the assembler's bounded retry (spec §4.H.5, §8 Scenario C) without
    /// depending on the concurrent-writer race it is there to guard.
    struct CollisionInjectingPuzzleStore {
        inner: Arc<MockPuzzleStore>,
        collided_once: std::sync::atomic::AtomicBool,
    }

    impl CollisionInjectingPuzzleStore {
        fn new(inner: Arc<MockPuzzleStore>) -> Self {
            Self {
                inner,
                collided_once: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl PuzzleStore for CollisionInjectingPuzzleStore {
        async fn save(&self, input: NewPuzzle) -> Result<Puzzle> {
            self.inner.save(input).await
        }
        async fn get(&self, id: Uuid) -> Result<Option<Puzzle>> {
            self.inner.get(id).await
        }
        async fn list(&self, filter: PuzzleFilter) -> Result<(Vec<Puzzle>, i64)> {
            self.inner.list(filter).await
        }
        async fn delete(&self, id: Uuid) -> Result<()> {
            self.inner.delete(id).await
        }
        async fn batch_update(&self, updates: Vec<(Uuid, PuzzlePatch)>) -> Result<Vec<Puzzle>> {
            self.inner.batch_update(updates).await
        }
        async fn batch_delete(&self, ids: &[Uuid]) -> Result<()> {
            self.inner.batch_delete(ids).await
        }
        async fn update(&self, id: Uuid, patch: PuzzlePatch) -> Result<Puzzle> {
            self.inner.update(id, patch).await
        }
        async fn get_daily(&self, date: NaiveDate, genre: &Genre) -> Result<Option<Puzzle>> {
            self.inner.get_daily(date, genre).await
        }
        async fn empty_days(&self, from: NaiveDate, to: NaiveDate, genre: &Genre) -> Result<Vec<NaiveDate>> {
            self.inner.empty_days(from, to, genre).await
        }
        async fn exists_with_group_multiset(&self, group_ids: &[Uuid; 4], genre: &Genre) -> Result<bool> {
            if !self.collided_once.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Ok(true);
            }
            self.inner.exists_with_group_multiset(group_ids, genre).await
        }
        async fn used_group_ids(&self, genre: &Genre) -> Result<HashSet<Uuid>> {
            self.inner.used_group_ids(genre).await
        }
    }

    // Scenario C — a uniqueness collision on the first attempt forces a retry
    // onto the next-freshest combination.
    #[tokio::test]
    async fn scenario_c_uniqueness_retry_picks_next_freshest() {
        let genre = films();
        let group_store = Arc::new(MockGroupStore::new());
        seed_full_color_pool(&group_store, &genre, 2).await;

        let inner_puzzle_store = Arc::new(MockPuzzleStore::with_group_store(group_store.clone() as Arc<dyn GroupStore>));
        let puzzle_store: Arc<dyn PuzzleStore> = Arc::new(CollisionInjectingPuzzleStore::new(inner_puzzle_store));

        let service = no_llm_service(group_store.clone(), Arc::clone(&puzzle_store));
        let today = date(2025, 1, 10);
        let config = PipelineConfig {
            rolling_window_days: 1,
            ..default_config()
        };
        let cancel = CancellationToken::new();
        let creds = EnvCredentialSource::new(None);

        let result = service.fill_window(&genre, &config, today, &creds, &cancel, None).await.unwrap();
        assert_eq!(result.puzzles_created, 1);
        assert_eq!(result.empty_days_remaining, 0);
        assert!(result.errors.is_empty());

        let (published, _) = puzzle_store
            .list(PuzzleFilter {
                status: Some(crate::store::models::PuzzleStatus::Published),
                genre: Some(genre.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
    }

    // Scenario D — a one-group deficit with no LLM wired: the deficient color
    // produces exactly one InsufficientGroups error, then the assembler does
    // what it can with what's left.
    #[tokio::test]
    async fn scenario_d_deficit_without_llm() {
        let genre = films();
        let group_store = Arc::new(MockGroupStore::new());
        for color in [Color::Yellow, Color::Green, Color::Blue] {
            for i in 0..3 {
                group_store
                    .save(new_group(color, &format!("{:?}-{i}", color), &genre))
                    .await
                    .unwrap();
            }
        }
        group_store.save(new_group(Color::Purple, "only-purple", &genre)).await.unwrap();

        let puzzle_store: Arc<dyn PuzzleStore> =
            Arc::new(MockPuzzleStore::with_group_store(group_store.clone() as Arc<dyn GroupStore>));
        let service = no_llm_service(group_store.clone(), Arc::clone(&puzzle_store));
        let today = date(2025, 1, 10);
        let config = PipelineConfig {
            rolling_window_days: 3,
            ..default_config()
        };
        let cancel = CancellationToken::new();
        let creds = EnvCredentialSource::new(None);

        let result = service.fill_window(&genre, &config, today, &creds, &cancel, None).await.unwrap();
        assert_eq!(result.puzzles_created, 1);
        assert_eq!(result.empty_days_remaining, 2);

        let insufficient: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.code == PipelineErrorCode::InsufficientGroups)
            .collect();
        assert_eq!(insufficient.len(), 3);
        assert_eq!(insufficient.iter().filter(|e| e.date.is_none()).count(), 1);
        assert_eq!(insufficient.iter().filter(|e| e.date.is_some()).count(), 2);
    }

    // Boundary: a zero-day window returns immediately with zero counts and no errors.
    #[tokio::test]
    async fn zero_day_window_is_a_noop() {
        let genre = films();
        let group_store: Arc<dyn GroupStore> = Arc::new(MockGroupStore::new());
        let puzzle_store: Arc<dyn PuzzleStore> = Arc::new(MockPuzzleStore::with_group_store(Arc::clone(&group_store)));
        let service = no_llm_service(group_store, Arc::clone(&puzzle_store));
        let config = PipelineConfig {
            rolling_window_days: 0,
            ..default_config()
        };
        let cancel = CancellationToken::new();
        let creds = EnvCredentialSource::new(None);

        let result = service
            .fill_window(&genre, &config, date(2025, 1, 10), &creds, &cancel, None)
            .await
            .unwrap();
        assert_eq!(result.puzzles_created, 0);
        assert_eq!(result.empty_days_remaining, 0);
        assert!(result.errors.is_empty());
    }

    // Scenario F — snapshot immutability: editing the live group after
    // publish must not change the already-published snapshot.
    #[tokio::test]
    async fn scenario_f_snapshot_is_immutable_after_live_edit() {
        let genre = films();
        let group_store = Arc::new(MockGroupStore::new());
        seed_full_color_pool(&group_store, &genre, 1).await;

        let puzzle_store: Arc<dyn PuzzleStore> =
            Arc::new(MockPuzzleStore::with_group_store(group_store.clone() as Arc<dyn GroupStore>));
        let service = no_llm_service(group_store.clone(), Arc::clone(&puzzle_store));
        let today = date(2025, 1, 10);
        let config = PipelineConfig {
            rolling_window_days: 1,
            ..default_config()
        };
        let cancel = CancellationToken::new();
        let creds = EnvCredentialSource::new(None);

        service.fill_window(&genre, &config, today, &creds, &cancel, None).await.unwrap();
        let published = puzzle_store.get_daily(today, &genre).await.unwrap().unwrap();
        let snapshot = published.groups_snapshot.unwrap();
        let yellow_snapshot = snapshot.iter().find(|g| g.color == Color::Yellow).unwrap().clone();
        assert_eq!(yellow_snapshot.connection, "Yellow-0");

        let live_yellow_id = published.group_ids[snapshot.iter().position(|g| g.color == Color::Yellow).unwrap()];
        group_store
            .update(
                live_yellow_id,
                GroupPatch {
                    connection: Some("Renamed connection".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reread = puzzle_store.get_daily(today, &genre).await.unwrap().unwrap();
        let reread_yellow = reread.groups_snapshot.unwrap().into_iter().find(|g| g.color == Color::Yellow).unwrap();
        assert_eq!(reread_yellow.connection, "Yellow-0");
    }
}
