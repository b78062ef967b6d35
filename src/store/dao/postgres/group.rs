use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::store::dao::traits::group::{ColorCounts, FreshestSet, GroupFilter, GroupPatch, GroupStore, SaveOutcome};
use crate::store::models::{Color, Difficulty, Genre, Group, GroupStatus, NewGroup, Source, VerifiedItem};

pub struct PgGroupStore {
    pool: PgPool,
}

impl PgGroupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct GroupRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    items: sqlx::types::Json<Vec<VerifiedItem>>,
    connection: String,
    connection_type: String,
    difficulty: Difficulty,
    color: Color,
    difficulty_score: i16,
    status: GroupStatus,
    usage_count: i32,
    last_used_at: Option<DateTime<Utc>>,
    genre: String,
    metadata: sqlx::types::Json<serde_json::Value>,
    source: Source,
}

impl TryFrom<GroupRow> for Group {
    type Error = anyhow::Error;

    fn try_from(row: GroupRow) -> Result<Self> {
        let items: [VerifiedItem; 4] = row
            .items
            .0
            .try_into()
            .map_err(|items: Vec<VerifiedItem>| anyhow::anyhow!("expected 4 items, found {}", items.len()))?;
        let genre = Genre::new(row.genre.clone())
            .ok_or_else(|| anyhow::anyhow!("group {} has empty genre", row.id))?;
        Ok(Group {
            id: row.id,
            created_at: row.created_at,
            items,
            connection: row.connection,
            connection_type: row.connection_type,
            difficulty: row.difficulty,
            color: row.color,
            difficulty_score: row.difficulty_score,
            status: row.status,
            usage_count: row.usage_count,
            last_used_at: row.last_used_at,
            genre,
            metadata: row.metadata.0,
            source: row.source,
        })
    }
}

pub(crate) const SELECT_COLUMNS: &str = "id, created_at, items, connection, connection_type, difficulty, \
     color, difficulty_score, status, usage_count, last_used_at, genre, metadata, source";

#[async_trait]
impl GroupStore for PgGroupStore {
    async fn save(&self, group: NewGroup) -> Result<SaveOutcome> {
        let items = sqlx::types::Json(group.items.to_vec());
        let result = sqlx::query_as::<_, GroupRow>(&format!(
            "INSERT INTO connection_groups \
               (id, created_at, items, connection, connection_type, difficulty, color, \
                difficulty_score, status, usage_count, last_used_at, genre, metadata, source) \
             VALUES (gen_random_uuid(), now(), $1, $2, $3, $4, $5, $6, $7, 0, NULL, $8, $9, $10) \
             ON CONFLICT (connection) WHERE status = 'approved' DO NOTHING \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(items)
        .bind(&group.connection)
        .bind(&group.connection_type)
        .bind(group.difficulty())
        .bind(group.color)
        .bind(group.difficulty().score())
        .bind(group.status)
        .bind(group.genre.as_str())
        .bind(&group.metadata)
        .bind(group.source)
        .fetch_optional(&self.pool)
        .await
        .context("failed to insert connection_groups row")?;

        match result {
            Some(row) => Ok(SaveOutcome::Saved(row.try_into()?)),
            None => Ok(SaveOutcome::DuplicateConnection),
        }
    }

    async fn save_batch(&self, groups: Vec<NewGroup>) -> Result<Vec<Group>> {
        let mut saved = Vec::with_capacity(groups.len());
        for group in groups {
            if let SaveOutcome::Saved(g) = self.save(group).await? {
                saved.push(g);
            }
        }
        Ok(saved)
    }

    async fn list(&self, filter: GroupFilter) -> Result<(Vec<Group>, i64)> {
        let mut query = format!("SELECT {SELECT_COLUMNS} FROM connection_groups WHERE true");
        let mut count_query = String::from("SELECT count(*) FROM connection_groups WHERE true");
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
        if let Some(colors) = &filter.colors {
            if !colors.is_empty() {
                clauses.push(format!("color = ANY(${idx})"));
                idx += 1;
            }
        }
        if filter.connection_type.is_some() {
            clauses.push(format!("connection_type = ${idx}"));
            idx += 1;
        }
        if !filter.exclude_ids.is_empty() {
            clauses.push(format!("NOT (id = ANY(${idx}))"));
            idx += 1;
        }

        for clause in &clauses {
            query.push_str(" AND ");
            query.push_str(clause);
            count_query.push_str(" AND ");
            count_query.push_str(clause);
        }

        if filter.sort_by_freshness {
            query.push_str(" ORDER BY usage_count ASC, last_used_at ASC NULLS FIRST, created_at ASC");
        } else {
            query.push_str(" ORDER BY created_at DESC");
        }

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
                if let Some(colors) = &filter.colors {
                    if !colors.is_empty() {
                        q = q.bind(colors.clone());
                    }
                }
                if let Some(ct) = &filter.connection_type {
                    q = q.bind(ct);
                }
                if !filter.exclude_ids.is_empty() {
                    q = q.bind(filter.exclude_ids.clone());
                }
                q
            }};
        }

        let rows: Vec<GroupRow> = bind_filters!(sqlx::query_as::<_, GroupRow>(&query))
            .fetch_all(&self.pool)
            .await
            .context("failed to list connection_groups")?;
        let total: i64 = bind_filters!(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(&self.pool)
            .await
            .context("failed to count connection_groups")?;

        let groups = rows.into_iter().map(Group::try_from).collect::<Result<Vec<_>>>()?;
        Ok((groups, total))
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Group>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<GroupRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM connection_groups WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch connection_groups by id")?;

        let by_id: std::collections::HashMap<Uuid, Group> = rows
            .into_iter()
            .map(|row| Group::try_from(row).map(|g| (g.id, g)))
            .collect::<Result<_>>()?;
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn update(&self, id: Uuid, patch: GroupPatch) -> Result<Group> {
        let row: GroupRow = sqlx::query_as(&format!(
            "UPDATE connection_groups SET \
               color = COALESCE($2, color), \
               status = COALESCE($3, status), \
               connection = COALESCE($4, connection) \
             WHERE id = $1 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.color)
        .bind(patch.status)
        .bind(patch.connection)
        .fetch_one(&self.pool)
        .await
        .context("failed to update connection_groups row")?;
        row.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM connection_groups WHERE id = $1 AND status != 'approved'")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete connection_groups row")?;
        Ok(())
    }

    async fn increment_usage(&self, ids: &[Uuid]) -> Result<()> {
        sqlx::query(
            "UPDATE connection_groups SET usage_count = usage_count + 1, last_used_at = now() \
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .context("failed to increment usage_count")?;
        Ok(())
    }

    async fn counts_by_color(&self, genre: &Genre) -> Result<ColorCounts> {
        let rows = sqlx::query(
            "SELECT color, count(*) as n FROM connection_groups \
             WHERE genre = $1 AND status = 'approved' GROUP BY color",
        )
        .bind(genre.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to count groups by color")?;

        let mut counts = ColorCounts::default();
        for row in rows {
            let color: Color = row.try_get("color")?;
            let n: i64 = row.try_get("n")?;
            match color {
                Color::Yellow => counts.yellow = n,
                Color::Green => counts.green = n,
                Color::Blue => counts.blue = n,
                Color::Purple => counts.purple = n,
            }
        }
        Ok(counts)
    }

    async fn freshest_set(&self, exclude_ids: &[Uuid], genre: &Genre) -> Result<FreshestSet> {
        let mut set = FreshestSet::default();
        for color in Color::ALL {
            let row: Option<GroupRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM connection_groups \
                 WHERE genre = $1 AND status = 'approved' AND color = $2 AND NOT (id = ANY($3)) \
                 ORDER BY usage_count ASC, last_used_at ASC NULLS FIRST, created_at ASC \
                 LIMIT 1"
            ))
            .bind(genre.as_str())
            .bind(color)
            .bind(exclude_ids)
            .fetch_optional(&self.pool)
            .await
            .context("failed to query freshest group for color")?;

            let group = row.map(Group::try_from).transpose()?;
            match color {
                Color::Yellow => set.yellow = group,
                Color::Green => set.green = group,
                Color::Blue => set.blue = group,
                Color::Purple => set.purple = group,
            }
        }
        Ok(set)
    }
}
