//! Generic CRUD over any bound entity, dispatched through its generated schema.

use crate::error::{AppError, FieldError, ValidationErrors};
use crate::model::{now, EntityDescriptor, EntityRegistry, Instance};
use crate::schema::Schema;
use crate::store::{EntityStore, Page};
use serde_json::Value;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
/// Used when a caller asks for a negative page size.
pub const FALLBACK_PER_PAGE: i64 = 20;

const UPDATED_DATE: &str = "updated_date";

/// Borrowed per request; holds no rows between calls.
pub struct CrudController<'a> {
    store: &'a dyn EntityStore,
    registry: &'a EntityRegistry,
    schema: &'a Schema,
}

impl<'a> CrudController<'a> {
    pub fn new(store: &'a dyn EntityStore, registry: &'a EntityRegistry, schema: &'a Schema) -> Self {
        CrudController {
            store,
            registry,
            schema,
        }
    }

    fn entity(&self) -> &EntityDescriptor {
        self.schema.descriptor()
    }

    fn not_found(&self, id: i64) -> AppError {
        AppError::NotFound(format!("{} with id {} not found.", self.entity().name, id))
    }

    /// Validate, check references, load, persist. Returns the dumped row with its id.
    pub async fn create(&self, data: &Value) -> Result<Value, AppError> {
        let instance = self.schema.load(data)?;
        self.check_references(&instance).await?;
        let row = self.store.insert(self.entity(), &instance).await?;
        tracing::info!(entity = %self.entity().name, id = ?row.get("id"), "created");
        Ok(self.schema.dump(&row))
    }

    /// Raw stored row, internal fields included.
    pub async fn fetch(&self, id: i64) -> Result<Instance, AppError> {
        self.store
            .fetch(self.entity(), id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn read(&self, id: i64) -> Result<Value, AppError> {
        let row = self.fetch(id).await?;
        Ok(self.schema.dump(&row))
    }

    /// Only fields present in `data` are validated and written.
    pub async fn update(&self, id: i64, data: &Value) -> Result<Value, AppError> {
        self.fetch(id).await?;
        let changes = self.schema.load_partial(data)?;
        self.apply(id, changes).await
    }

    /// Writes already-loaded changes after the reference pass; stamps `updated_date`.
    pub async fn apply(&self, id: i64, mut changes: Instance) -> Result<Value, AppError> {
        self.check_references(&changes).await?;
        if self.entity().has_field(UPDATED_DATE) && !changes.contains_key(UPDATED_DATE) {
            changes.insert(UPDATED_DATE.to_string(), now());
        }
        let row = self
            .store
            .update(self.entity(), id, &changes)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        tracing::info!(entity = %self.entity().name, id, fields = changes.len(), "updated");
        Ok(self.schema.dump(&row))
    }

    pub async fn delete(&self, id: i64) -> Result<Value, AppError> {
        self.fetch(id).await?;
        if !self.store.delete(self.entity(), id).await? {
            return Err(self.not_found(id));
        }
        tracing::info!(entity = %self.entity().name, id, "deleted");
        Ok(serde_json::json!({
            "message": format!("{} with id {} deleted.", self.entity().name, id)
        }))
    }

    /// 1-based pagination. No upper bound on `per_page`.
    pub async fn list(&self, page: i64, per_page: i64) -> Result<Vec<Value>, AppError> {
        let page = if page < 1 { DEFAULT_PAGE } else { page };
        let per_page = if per_page < 0 { FALLBACK_PER_PAGE } else { per_page };
        let rows = self
            .store
            .filter(self.entity(), &[], Some(Page::new(page as u64, per_page as u64)))
            .await?;
        Ok(self.schema.dump_many(&rows))
    }

    pub async fn search(&self, criteria: &[(String, Value)]) -> Result<Vec<Value>, AppError> {
        let rows = self.store.filter(self.entity(), criteria, None).await?;
        Ok(self.schema.dump_many(&rows))
    }

    pub async fn count(&self, criteria: &[(String, Value)]) -> Result<u64, AppError> {
        self.store.count(self.entity(), criteria).await
    }

    pub async fn exists(&self, criteria: &[(String, Value)]) -> Result<bool, AppError> {
        let first = self
            .store
            .filter(self.entity(), criteria, Some(Page { limit: 1, offset: 0 }))
            .await?;
        Ok(!first.is_empty())
    }

    /// Unpaginated scan; meant for small tables.
    pub async fn read_all(&self) -> Result<Vec<Value>, AppError> {
        self.search(&[]).await
    }

    /// Every reference field must be its sentinel or the id of an existing row.
    async fn check_references(&self, values: &Instance) -> Result<(), AppError> {
        let mut errors = Vec::new();
        for field in &self.entity().fields {
            let Some(reference) = &field.references else { continue };
            let Some(id) = values.get(&field.name).and_then(Value::as_i64) else { continue };
            if reference.sentinel == Some(id) {
                continue;
            }
            let target = self.registry.by_table(&reference.table).ok_or_else(|| {
                AppError::Store(format!("no entity registered for table {}", reference.table))
            })?;
            if self.store.fetch(target, id).await?.is_none() {
                errors.push(FieldError::new(
                    &field.name,
                    format!("Invalid {} value: {} does not exist.", field.name, id),
                ));
            }
        }
        ValidationErrors(errors).into_result()
    }
}
