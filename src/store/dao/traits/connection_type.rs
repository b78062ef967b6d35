//! `ConnectionTypeStore` — the active/inactive taxonomy of connection
//! categories used only as prompt material (spec §4.E).

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::{ConnectionCategory, ConnectionType, Genre};

#[derive(Debug, Clone)]
pub struct NewConnectionType {
    pub name: String,
    pub category: ConnectionCategory,
    pub description: String,
    pub examples: Option<Vec<String>>,
    pub genre: Genre,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionTypePatch {
    pub name: Option<String>,
    pub category: Option<ConnectionCategory>,
    pub description: Option<String>,
    pub examples: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[async_trait]
pub trait ConnectionTypeStore: Send + Sync {
    async fn list_active(&self, genre: &Genre) -> Result<Vec<ConnectionType>>;

    async fn list_all(&self, genre: &Genre) -> Result<Vec<ConnectionType>>;

    async fn create(&self, input: NewConnectionType) -> Result<ConnectionType>;

    async fn update(&self, id: Uuid, patch: ConnectionTypePatch) -> Result<ConnectionType>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn toggle_active(&self, id: Uuid) -> Result<ConnectionType>;
}
