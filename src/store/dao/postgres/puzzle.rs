use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::group::{GroupRow, SELECT_COLUMNS as GROUP_SELECT_COLUMNS};
use crate::store::dao::traits::puzzle::{NewPuzzle, PuzzleFilter, PuzzlePatch, PuzzleStore};
use crate::store::models::{Genre, Group, Puzzle, PuzzleStatus, Source};

pub struct PgPuzzleStore {
    pool: PgPool,
}

impl PgPuzzleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PuzzleRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    puzzle_date: Option<NaiveDate>,
    title: Option<String>,
    group_ids: Vec<Uuid>,
    status: PuzzleStatus,
    genre: String,
    source: Source,
    groups_snapshot: Option<sqlx::types::Json<Vec<Group>>>,
}

impl TryFrom<PuzzleRow> for Puzzle {
    type Error = anyhow::Error;

    fn try_from(row: PuzzleRow) -> Result<Self> {
        let group_ids: [Uuid; 4] = row
            .group_ids
            .try_into()
            .map_err(|ids: Vec<Uuid>| anyhow::anyhow!("expected 4 group ids, found {}", ids.len()))?;
        let groups_snapshot = row
            .groups_snapshot
            .map(|json| -> Result<[Group; 4]> {
                json.0
                    .try_into()
                    .map_err(|g: Vec<Group>| anyhow::anyhow!("expected 4 snapshot groups, found {}", g.len()))
            })
            .transpose()?;
        let genre = Genre::new(row.genre.clone())
            .ok_or_else(|| anyhow::anyhow!("puzzle {} has empty genre", row.id))?;
        Ok(Puzzle {
            id: row.id,
            created_at: row.created_at,
            puzzle_date: row.puzzle_date,
            title: row.title,
            group_ids,
            status: row.status,
            genre,
            source: row.source,
            groups_snapshot,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, created_at, puzzle_date, title, group_ids, status, genre, source, groups_snapshot";

/// Snapshots the current rows for `group_ids` into `groups_snapshot`,
/// writing status/date/snapshot together in one transaction (spec §5, §3
/// "publication invariant").
async fn snapshot_and_apply(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    patch: &PuzzlePatch,
) -> Result<PuzzleRow> {
    let publishing = matches!(patch.status, Some(PuzzleStatus::Published));

    let current: PuzzleRow = sqlx::query_as(&format!("SELECT {SELECT_COLUMNS} FROM puzzles WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("failed to lock puzzle row for update")?;

    let group_ids = patch.group_ids.unwrap_or(current.group_ids.clone().try_into().unwrap());

    let snapshot: Option<sqlx::types::Json<Vec<Group>>> = if publishing {
        let rows: Vec<GroupRow> = sqlx::query_as(&format!(
            "SELECT {GROUP_SELECT_COLUMNS} FROM connection_groups WHERE id = ANY($1)"
        ))
        .bind(group_ids.to_vec())
        .fetch_all(&mut **tx)
        .await
        .context("failed to load groups for publish-time snapshot")?;
        let groups = rows.into_iter().map(Group::try_from).collect::<Result<Vec<_>>>()?;
        Some(sqlx::types::Json(groups))
    } else {
        current.groups_snapshot.clone()
    };

    let row: PuzzleRow = sqlx::query_as(&format!(
        "UPDATE puzzles SET \
           puzzle_date = COALESCE($2, puzzle_date), \
           title = COALESCE($3, title), \
           status = COALESCE($4, status), \
           group_ids = $5, \
           groups_snapshot = COALESCE($6, groups_snapshot) \
         WHERE id = $1 \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.puzzle_date.flatten())
    .bind(patch.title.clone().flatten())
    .bind(patch.status)
    .bind(group_ids.to_vec())
    .bind(snapshot)
    .fetch_one(&mut **tx)
    .await
    .context("failed to apply puzzle patch")?;

    Ok(row)
}

#[async_trait]
impl PuzzleStore for PgPuzzleStore {
    async fn save(&self, input: NewPuzzle) -> Result<Puzzle> {
        let row: PuzzleRow = sqlx::query_as(&format!(
            "INSERT INTO puzzles (id, created_at, puzzle_date, title, group_ids, status, genre, source, groups_snapshot) \
             VALUES (gen_random_uuid(), now(), NULL, NULL, $1, 'pending', $2, $3, NULL) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(input.group_ids.to_vec())
        .bind(input.genre.as_str())
        .bind(input.source)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert puzzles row")?;
        row.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Puzzle>> {
        let row: Option<PuzzleRow> = sqlx::query_as(&format!("SELECT {SELECT_COLUMNS} FROM puzzles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch puzzle by id")?;
        row.map(Puzzle::try_from).transpose()
    }

    async fn list(&self, filter: PuzzleFilter) -> Result<(Vec<Puzzle>, i64)> {
        let mut query = format!("SELECT {SELECT_COLUMNS} FROM puzzles WHERE true");
        let mut count_query = String::from("SELECT count(*) FROM puzzles WHERE true");
        let mut clauses = Vec::new();
        let mut idx = 1;

        if filter.status.is_some() {
            clauses.push(format!("status = ${idx}"));
            idx += 1;
        }
        if filter.genre.is_some() {
            clauses.push(format!("genre = ${idx}"));
            idx += 1;
        }
        if filter.from.is_some() {
            clauses.push(format!("puzzle_date >= ${idx}"));
            idx += 1;
        }
        if filter.to.is_some() {
            clauses.push(format!("puzzle_date <= ${idx}"));
            idx += 1;
        }

        for clause in &clauses {
            query.push_str(" AND ");
            query.push_str(clause);
            count_query.push_str(" AND ");
            count_query.push_str(clause);
        }
        query.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = filter.offset {
            query.push_str(&format!(" OFFSET {offset}"));
        }

        macro_rules! bind_filters {
            ($q:expr) => {{
                let mut q = $q;
                if let Some(status) = filter.status {
                    q = q.bind(status);
                }
                if let Some(genre) = &filter.genre {
                    q = q.bind(genre.as_str());
                }
                if let Some(from) = filter.from {
                    q = q.bind(from);
                }
                if let Some(to) = filter.to {
                    q = q.bind(to);
                }
                q
            }};
        }

        let rows: Vec<PuzzleRow> = bind_filters!(sqlx::query_as::<_, PuzzleRow>(&query))
            .fetch_all(&self.pool)
            .await
            .context("failed to list puzzles")?;
        let total: i64 = bind_filters!(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(&self.pool)
            .await
            .context("failed to count puzzles")?;

        let puzzles = rows.into_iter().map(Puzzle::try_from).collect::<Result<Vec<_>>>()?;
        Ok((puzzles, total))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM puzzles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete puzzle")?;
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
        sqlx::query("DELETE FROM puzzles WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .context("failed to batch delete puzzles")?;
        Ok(())
    }

    async fn update(&self, id: Uuid, patch: PuzzlePatch) -> Result<Puzzle> {
        let mut tx = self.pool.begin().await.context("failed to begin transaction")?;
        let row = snapshot_and_apply(&mut tx, id, &patch).await?;
        tx.commit().await.context("failed to commit puzzle update")?;
        row.try_into()
    }

    async fn get_daily(&self, date: NaiveDate, genre: &Genre) -> Result<Option<Puzzle>> {
        let row: Option<PuzzleRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM puzzles \
             WHERE puzzle_date = $1 AND genre = $2 AND status = 'published'"
        ))
        .bind(date)
        .bind(genre.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch daily puzzle")?;
        row.map(Puzzle::try_from).transpose()
    }

    async fn empty_days(&self, from: NaiveDate, to: NaiveDate, genre: &Genre) -> Result<Vec<NaiveDate>> {
        let taken: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT puzzle_date FROM puzzles \
             WHERE genre = $1 AND puzzle_date IS NOT NULL AND puzzle_date BETWEEN $2 AND $3",
        )
        .bind(genre.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch taken puzzle dates")?;
        let taken: HashSet<NaiveDate> = taken.into_iter().collect();

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
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
               SELECT 1 FROM puzzles \
               WHERE genre = $1 \
               AND (SELECT array_agg(x ORDER BY x) FROM unnest(group_ids) AS x) = $2 \
             )",
        )
        .bind(genre.as_str())
        .bind(sorted.to_vec())
        .fetch_one(&self.pool)
        .await
        .context("failed to check group multiset uniqueness")?;
        Ok(exists)
    }

    async fn used_group_ids(&self, genre: &Genre) -> Result<HashSet<Uuid>> {
        let rows: Vec<Vec<Uuid>> = sqlx::query_scalar("SELECT group_ids FROM puzzles WHERE genre = $1")
            .bind(genre.as_str())
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch used group ids")?;
        Ok(rows.into_iter().flatten().collect())
    }
}
