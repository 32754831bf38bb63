//! In-memory store for tests and `DATABASE_URL=memory://` development runs.

use crate::error::AppError;
use crate::model::{EntityDescriptor, Instance, ID_FIELD};
use crate::store::{EntityStore, Page};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Instance>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, f: impl FnOnce(&HashMap<String, Table>) -> R) -> Result<R, AppError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))?;
        Ok(f(&guard))
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashMap<String, Table>) -> R) -> Result<R, AppError> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

fn check_columns(entity: &EntityDescriptor, criteria: &[(String, Value)]) -> Result<(), AppError> {
    for (col, _) in criteria {
        if !entity.has_field(col) {
            return Err(AppError::Store(format!(
                "column \"{}\" does not exist on {}",
                col, entity.table
            )));
        }
    }
    Ok(())
}

fn matches(row: &Instance, criteria: &[(String, Value)]) -> bool {
    criteria
        .iter()
        .all(|(col, v)| row.get(col).unwrap_or(&Value::Null) == v)
}

/// Rejects a row whose unique columns collide with another row.
fn check_unique(entity: &EntityDescriptor, table: &Table, row: &Instance, own_id: Option<i64>) -> Result<(), AppError> {
    for f in entity.fields.iter().filter(|f| f.unique) {
        let Some(v) = row.get(&f.name).filter(|v| !v.is_null()) else { continue };
        let clash = table
            .rows
            .iter()
            .any(|(id, other)| Some(*id) != own_id && other.get(&f.name) == Some(v));
        if clash {
            return Err(AppError::Conflict(format!(
                "duplicate key value violates unique constraint on {}.{}",
                entity.table, f.name
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(&self, entity: &EntityDescriptor, id: i64) -> Result<Option<Instance>, AppError> {
        self.read(|tables| tables.get(&entity.table).and_then(|t| t.rows.get(&id).cloned()))
    }

    async fn filter(
        &self,
        entity: &EntityDescriptor,
        criteria: &[(String, Value)],
        page: Option<Page>,
    ) -> Result<Vec<Instance>, AppError> {
        check_columns(entity, criteria)?;
        self.read(|tables| {
            let Some(table) = tables.get(&entity.table) else {
                return Vec::new();
            };
            let hits = table.rows.values().filter(|r| matches(r, criteria)).cloned();
            match page {
                Some(p) => hits
                    .skip(usize::try_from(p.offset).unwrap_or(usize::MAX))
                    .take(usize::try_from(p.limit).unwrap_or(usize::MAX))
                    .collect(),
                None => hits.collect(),
            }
        })
    }

    async fn count(&self, entity: &EntityDescriptor, criteria: &[(String, Value)]) -> Result<u64, AppError> {
        check_columns(entity, criteria)?;
        self.read(|tables| {
            tables
                .get(&entity.table)
                .map(|t| t.rows.values().filter(|r| matches(r, criteria)).count() as u64)
                .unwrap_or(0)
        })
    }

    async fn insert(&self, entity: &EntityDescriptor, values: &Instance) -> Result<Instance, AppError> {
        self.write(|tables| -> Result<Instance, AppError> {
            let table = tables.entry(entity.table.clone()).or_default();
            check_unique(entity, table, values, None)?;
            table.next_id += 1;
            let id = table.next_id;
            let mut row = Instance::new();
            for f in &entity.fields {
                let v = values.get(&f.name).cloned().unwrap_or(Value::Null);
                row.insert(f.name.clone(), v);
            }
            row.insert(ID_FIELD.to_string(), Value::from(id));
            table.rows.insert(id, row.clone());
            Ok(row)
        })?
    }

    async fn update(
        &self,
        entity: &EntityDescriptor,
        id: i64,
        changes: &Instance,
    ) -> Result<Option<Instance>, AppError> {
        self.write(|tables| -> Result<Option<Instance>, AppError> {
            let Some(table) = tables.get_mut(&entity.table) else {
                return Ok(None);
            };
            let Some(current) = table.rows.get(&id) else {
                return Ok(None);
            };
            let mut next = current.clone();
            for (k, v) in changes {
                if k != ID_FIELD && entity.has_field(k) {
                    next.insert(k.clone(), v.clone());
                }
            }
            check_unique(entity, table, &next, Some(id))?;
            table.rows.insert(id, next.clone());
            Ok(Some(next))
        })?
    }

    async fn delete(&self, entity: &EntityDescriptor, id: i64) -> Result<bool, AppError> {
        self.write(|tables| {
            tables
                .get_mut(&entity.table)
                .map(|t| t.rows.remove(&id).is_some())
                .unwrap_or(false)
        })
    }

    async fn ensure_tables(&self, entities: &[Arc<EntityDescriptor>]) -> Result<(), AppError> {
        self.write(|tables| {
            for e in entities {
                tables.entry(e.table.clone()).or_default();
            }
        })
    }

    async fn reset(&self, entities: &[Arc<EntityDescriptor>]) -> Result<(), AppError> {
        self.write(|tables| {
            for e in entities {
                tables.insert(e.table.clone(), Table::default());
            }
        })
    }
}
