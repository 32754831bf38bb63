//! Persistence collaborators: the store interface and its PostgreSQL and in-memory backends.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::model::{EntityDescriptor, Instance};
use crate::settings::Settings;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// `DATABASE_URL` prefix selecting the in-memory store.
pub const MEMORY_URL_PREFIX: &str = "memory:";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    /// 1-based page number to limit/offset.
    pub fn new(page: u64, per_page: u64) -> Self {
        Page {
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }
}

/// Row storage for every entity type. Each write commits on its own; there is no
/// cross-call transaction.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn fetch(&self, entity: &EntityDescriptor, id: i64) -> Result<Option<Instance>, AppError>;

    /// Rows matching every criterion exactly, ordered by id. Unknown column names are a store error.
    async fn filter(
        &self,
        entity: &EntityDescriptor,
        criteria: &[(String, Value)],
        page: Option<Page>,
    ) -> Result<Vec<Instance>, AppError>;

    async fn count(&self, entity: &EntityDescriptor, criteria: &[(String, Value)]) -> Result<u64, AppError>;

    /// Persists a new row and returns it with its assigned id.
    async fn insert(&self, entity: &EntityDescriptor, values: &Instance) -> Result<Instance, AppError>;

    /// Applies `changes` to row `id`; None when the row is gone.
    async fn update(
        &self,
        entity: &EntityDescriptor,
        id: i64,
        changes: &Instance,
    ) -> Result<Option<Instance>, AppError>;

    /// True when a row was removed.
    async fn delete(&self, entity: &EntityDescriptor, id: i64) -> Result<bool, AppError>;

    /// Creates missing tables.
    async fn ensure_tables(&self, entities: &[Arc<EntityDescriptor>]) -> Result<(), AppError>;

    /// Drops and recreates every table. Destroys all rows.
    async fn reset(&self, entities: &[Arc<EntityDescriptor>]) -> Result<(), AppError>;
}

/// Opens the store named by `DATABASE_URL`.
pub async fn connect(settings: &Settings) -> Result<Arc<dyn EntityStore>, AppError> {
    if settings.database_url.starts_with(MEMORY_URL_PREFIX) {
        tracing::warn!("using in-memory store; rows are lost on shutdown");
        return Ok(Arc::new(MemoryStore::new()));
    }
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    Ok(Arc::new(PgStore::new(pool)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_one_based() {
        assert_eq!(Page::new(1, 10), Page { limit: 10, offset: 0 });
        assert_eq!(Page::new(3, 2), Page { limit: 2, offset: 4 });
    }
}
