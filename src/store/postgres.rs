//! PostgreSQL store: descriptor-built SQL over a sqlx pool.

use crate::error::AppError;
use crate::migration::{create_table_statements, drop_table_statement};
use crate::model::{EntityDescriptor, Instance};
use crate::sql::{self, PgBindValue, QueryBuf};
use crate::store::{EntityStore, Page};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Instance>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
        Ok(rows.iter().map(row_to_instance).collect())
    }

    async fn query_optional(&self, q: &QueryBuf) -> Result<Option<Instance>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(&self.pool).await.map_err(map_db_error)?;
        Ok(row.map(|r| row_to_instance(&r)))
    }

    async fn execute_all(&self, statements: &[String]) -> Result<(), AppError> {
        for stmt in statements {
            tracing::debug!(sql = %stmt, "ddl");
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn fetch(&self, entity: &EntityDescriptor, id: i64) -> Result<Option<Instance>, AppError> {
        let mut q = sql::select_by_id(entity);
        q.params.push(Value::from(id));
        self.query_optional(&q).await
    }

    async fn filter(
        &self,
        entity: &EntityDescriptor,
        criteria: &[(String, Value)],
        page: Option<Page>,
    ) -> Result<Vec<Instance>, AppError> {
        let q = sql::select_list(
            entity,
            criteria,
            page.map(|p| p.limit),
            page.map(|p| p.offset),
        );
        self.query_many(&q).await
    }

    async fn count(&self, entity: &EntityDescriptor, criteria: &[(String, Value)]) -> Result<u64, AppError> {
        let q = sql::select_count(entity, criteria);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let n = query.fetch_one(&self.pool).await.map_err(map_db_error)?;
        Ok(n.max(0) as u64)
    }

    async fn insert(&self, entity: &EntityDescriptor, values: &Instance) -> Result<Instance, AppError> {
        let q = sql::insert(entity, values);
        self.query_optional(&q)
            .await?
            .ok_or_else(|| AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        entity: &EntityDescriptor,
        id: i64,
        changes: &Instance,
    ) -> Result<Option<Instance>, AppError> {
        let q = sql::update(entity, id, changes);
        self.query_optional(&q).await
    }

    async fn delete(&self, entity: &EntityDescriptor, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(entity, id);
        Ok(self.query_optional(&q).await?.is_some())
    }

    async fn ensure_tables(&self, entities: &[Arc<EntityDescriptor>]) -> Result<(), AppError> {
        for e in entities {
            self.execute_all(&create_table_statements(e)).await?;
        }
        Ok(())
    }

    async fn reset(&self, entities: &[Arc<EntityDescriptor>]) -> Result<(), AppError> {
        let drops: Vec<String> = entities.iter().rev().map(|e| drop_table_statement(e)).collect();
        self.execute_all(&drops).await?;
        self.ensure_tables(entities).await
    }
}

/// Unique violations become conflicts; everything else stays a database error.
fn map_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AppError::Conflict(db.message().to_string());
        }
    }
    AppError::Db(e)
}

fn row_to_instance(row: &sqlx::postgres::PgRow) -> Instance {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Instance::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// Connects to the `postgres` maintenance database and creates the target database if missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
