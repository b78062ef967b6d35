use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::dao::traits::connection_type::{ConnectionTypePatch, ConnectionTypeStore, NewConnectionType};
use crate::store::models::{ConnectionCategory, ConnectionType, Genre};

pub struct PgConnectionTypeStore {
    pool: PgPool,
}

impl PgConnectionTypeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ConnectionTypeRow {
    id: Uuid,
    name: String,
    category: ConnectionCategory,
    description: String,
    examples: Option<sqlx::types::Json<Vec<String>>>,
    active: bool,
    genre: String,
}

impl TryFrom<ConnectionTypeRow> for ConnectionType {
    type Error = anyhow::Error;

    fn try_from(row: ConnectionTypeRow) -> Result<Self> {
        let genre = Genre::new(row.genre.clone())
            .ok_or_else(|| anyhow::anyhow!("connection type {} has empty genre", row.id))?;
        Ok(ConnectionType {
            id: row.id,
            name: row.name,
            category: row.category,
            description: row.description,
            examples: row.examples.map(|j| j.0),
            active: row.active,
            genre,
        })
    }
}

const SELECT_COLUMNS: &str = "id, name, category, description, examples, active, genre";

#[async_trait]
impl ConnectionTypeStore for PgConnectionTypeStore {
    async fn list_active(&self, genre: &Genre) -> Result<Vec<ConnectionType>> {
        let rows: Vec<ConnectionTypeRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM connection_types WHERE genre = $1 AND active = true ORDER BY name"
        ))
        .bind(genre.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to list active connection types")?;
        rows.into_iter().map(ConnectionType::try_from).collect()
    }

    async fn list_all(&self, genre: &Genre) -> Result<Vec<ConnectionType>> {
        let rows: Vec<ConnectionTypeRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM connection_types WHERE genre = $1 ORDER BY name"
        ))
        .bind(genre.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to list connection types")?;
        rows.into_iter().map(ConnectionType::try_from).collect()
    }

    async fn create(&self, input: NewConnectionType) -> Result<ConnectionType> {
        let row: ConnectionTypeRow = sqlx::query_as(&format!(
            "INSERT INTO connection_types (id, name, category, description, examples, active, genre) \
             VALUES (gen_random_uuid(), $1, $2, $3, $4, true, $5) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(input.name)
        .bind(input.category)
        .bind(input.description)
        .bind(input.examples.map(sqlx::types::Json))
        .bind(input.genre.as_str())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert connection_types row")?;
        row.try_into()
    }

    async fn update(&self, id: Uuid, patch: ConnectionTypePatch) -> Result<ConnectionType> {
        let row: ConnectionTypeRow = sqlx::query_as(&format!(
            "UPDATE connection_types SET \
               name = COALESCE($2, name), \
               category = COALESCE($3, category), \
               description = COALESCE($4, description), \
               examples = COALESCE($5, examples), \
               active = COALESCE($6, active) \
             WHERE id = $1 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.category)
        .bind(patch.description)
        .bind(patch.examples.map(sqlx::types::Json))
        .bind(patch.active)
        .fetch_one(&self.pool)
        .await
        .context("failed to update connection_types row")?;
        row.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM connection_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete connection_types row")?;
        Ok(())
    }

    async fn toggle_active(&self, id: Uuid) -> Result<ConnectionType> {
        let row: ConnectionTypeRow = sqlx::query_as(&format!(
            "UPDATE connection_types SET active = NOT active WHERE id = $1 RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .context("failed to toggle connection_types active flag")?;
        row.try_into()
    }
}
