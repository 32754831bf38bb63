//! Startup sequence: describe, synthesize, bind. Each stage is a plain function call.

use crate::error::DescriptorError;
use crate::hash::PasswordHasher;
use crate::model::{synthesize, EntityRegistry};
use crate::routes::binder::{EntityBinding, RouteBinder, RouteTable};
use crate::routes::{common, CustomRoutes};
use crate::schema::Schema;
use crate::state::AppState;
use crate::store::EntityStore;
use std::sync::Arc;

/// Synthesizes a sentinel per entity and binds its schema and routes. Runs once.
pub fn bind_entities(
    registry: &EntityRegistry,
    hasher: &Arc<dyn PasswordHasher>,
    custom: &CustomRoutes,
) -> Result<Vec<Arc<EntityBinding>>, DescriptorError> {
    custom.check_targets(registry)?;
    let mut bindings = Vec::with_capacity(registry.entities().len());
    for descriptor in registry.entities() {
        let sentinel = synthesize(descriptor.clone())?;
        let schema = Schema::generate(descriptor.clone(), hasher.clone())?;
        let binding = RouteBinder::bind(sentinel, schema, custom);
        tracing::info!(entity = %descriptor.name, routes = binding.routes().len(), "entity bound");
        bindings.push(Arc::new(binding));
    }
    Ok(bindings)
}

pub fn bootstrap(
    store: Arc<dyn EntityStore>,
    registry: Arc<EntityRegistry>,
    hasher: Arc<dyn PasswordHasher>,
    custom: &CustomRoutes,
    base_url: &str,
) -> Result<AppState, DescriptorError> {
    let bindings = bind_entities(&registry, &hasher, custom)?;
    let mut routes = RouteTable::default();
    common::record_fixed(&mut routes, base_url);
    for binding in &bindings {
        routes.record_binding(base_url, binding);
    }
    Ok(AppState {
        store,
        registry,
        hasher,
        bindings: Arc::new(bindings),
        routes: Arc::new(routes),
        base_url: base_url.to_string(),
    })
}
