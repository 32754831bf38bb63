//! Shared application state. Immutable after startup apart from the store.

use crate::hash::PasswordHasher;
use crate::model::EntityRegistry;
use crate::routes::binder::{EntityBinding, RouteTable};
use crate::service::CrudController;
use crate::store::EntityStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub registry: Arc<EntityRegistry>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub bindings: Arc<Vec<Arc<EntityBinding>>>,
    /// Recorded once at startup for the introspection endpoint.
    pub routes: Arc<RouteTable>,
    pub base_url: String,
}

impl AppState {
    pub fn binding_for(&self, table: &str) -> Option<&Arc<EntityBinding>> {
        self.bindings.iter().find(|b| b.descriptor().table == table)
    }

    pub fn controller<'a>(&'a self, binding: &'a EntityBinding) -> CrudController<'a> {
        CrudController::new(self.store.as_ref(), &self.registry, binding.schema())
    }
}

/// State for one entity's generic routes.
#[derive(Clone)]
pub struct EntityState {
    pub app: AppState,
    pub binding: Arc<EntityBinding>,
}

impl EntityState {
    pub fn controller(&self) -> CrudController<'_> {
        self.app.controller(&self.binding)
    }
}
