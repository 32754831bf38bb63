//! Registry of entity descriptors, validated once at startup.

use crate::error::DescriptorError;
use crate::model::EntityDescriptor;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct EntityRegistry {
    entities: Vec<Arc<EntityDescriptor>>,
    by_table: HashMap<String, Arc<EntityDescriptor>>,
}

impl EntityRegistry {
    /// Validates and registers descriptors; order is kept for route and DDL output.
    pub fn new(descriptors: Vec<EntityDescriptor>) -> Result<Self, DescriptorError> {
        validate(&descriptors)?;
        let entities: Vec<Arc<EntityDescriptor>> = descriptors.into_iter().map(Arc::new).collect();
        let by_table = entities
            .iter()
            .map(|e| (e.table.clone(), e.clone()))
            .collect();
        Ok(EntityRegistry { entities, by_table })
    }

    pub fn entities(&self) -> &[Arc<EntityDescriptor>] {
        &self.entities
    }

    pub fn by_table(&self, table: &str) -> Option<&Arc<EntityDescriptor>> {
        self.by_table.get(table)
    }
}

fn validate(descriptors: &[EntityDescriptor]) -> Result<(), DescriptorError> {
    let tables: HashSet<&str> = descriptors.iter().map(|d| d.table.as_str()).collect();
    let mut seen_tables = HashSet::new();
    let mut seen_paths = HashSet::new();

    for d in descriptors {
        if !seen_tables.insert(d.table.as_str()) {
            return Err(DescriptorError::DuplicateTable(d.table.clone()));
        }
        if !seen_paths.insert(d.path_segment.as_str()) {
            return Err(DescriptorError::DuplicatePathSegment(d.path_segment.clone()));
        }
        let mut fields = HashSet::new();
        for f in &d.fields {
            if !fields.insert(f.name.as_str()) {
                return Err(DescriptorError::DuplicateField {
                    entity: d.name.clone(),
                    field: f.name.clone(),
                });
            }
            if let Some(r) = &f.references {
                if !tables.contains(r.table.as_str()) {
                    return Err(DescriptorError::MissingReference {
                        entity: d.name.clone(),
                        field: f.name.clone(),
                        table: r.table.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}
