//! Entity-specific routes registered by table name, alongside the generic table.

use crate::error::{AppError, DescriptorError};
use crate::model::EntityRegistry;
use crate::routes::binder::EntityBinding;
use crate::state::AppState;
use async_trait::async_trait;
use axum::http::Method;
use axum::response::Response;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Default parameter naming the table a custom route was bound for.
pub const ENTITY_PARAM: &str = "entity";

/// Everything a custom handler receives for one request.
pub struct CustomCall {
    pub state: AppState,
    pub defaults: Map<String, Value>,
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
}

impl CustomCall {
    /// Binding of the entity named by the `entity` default.
    pub fn target(&self) -> Result<Arc<EntityBinding>, AppError> {
        let table = self
            .defaults
            .get(ENTITY_PARAM)
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::BadRequest("route has no target entity".into()))?;
        self.state
            .binding_for(table)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("unknown entity {}", table)))
    }

    pub fn id(&self) -> Result<i64, AppError> {
        let raw = self
            .params
            .get("id")
            .ok_or_else(|| AppError::BadRequest("missing id".into()))?;
        crate::handlers::parse_id(raw)
    }

    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(name))
    }
}

#[async_trait]
pub trait CustomHandler: Send + Sync {
    async fn call(&self, call: CustomCall) -> Result<Response, AppError>;
}

#[derive(Clone)]
pub struct CustomRoute {
    pub rule: String,
    pub endpoint: String,
    pub methods: Vec<Method>,
    pub handler: Arc<dyn CustomHandler>,
    pub defaults: Map<String, Value>,
}

impl CustomRoute {
    pub fn new(rule: &str, endpoint: &str, methods: &[Method], handler: Arc<dyn CustomHandler>) -> Self {
        CustomRoute {
            rule: rule.to_string(),
            endpoint: endpoint.to_string(),
            methods: methods.to_vec(),
            handler,
            defaults: Map::new(),
        }
    }

    pub fn with_default(mut self, key: &str, value: Value) -> Self {
        self.defaults.insert(key.to_string(), value);
        self
    }
}

/// Custom routes keyed by entity table. Owned by startup; nothing is global.
#[derive(Clone, Default)]
pub struct CustomRoutes {
    by_table: BTreeMap<String, Vec<CustomRoute>>,
}

impl CustomRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: &str, route: CustomRoute) -> &mut Self {
        self.by_table.entry(table.to_string()).or_default().push(route);
        self
    }

    pub fn for_table(&self, table: &str) -> &[CustomRoute] {
        self.by_table.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every registration must name a registered table.
    pub fn check_targets(&self, registry: &EntityRegistry) -> Result<(), DescriptorError> {
        for (table, routes) in &self.by_table {
            if registry.by_table(table).is_none() {
                let endpoint = routes.first().map(|r| r.endpoint.clone()).unwrap_or_default();
                return Err(DescriptorError::UnknownRouteTarget {
                    endpoint,
                    table: table.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entities;
    use axum::response::IntoResponse;

    struct Noop;

    #[async_trait]
    impl CustomHandler for Noop {
        async fn call(&self, _call: CustomCall) -> Result<Response, AppError> {
            Ok(().into_response())
        }
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let registry = EntityRegistry::new(entities::descriptors()).unwrap();
        let mut routes = CustomRoutes::new();
        routes.register(entities::ROLES, CustomRoute::new("/x", "x", &[Method::GET], Arc::new(Noop)));
        assert!(routes.check_targets(&registry).is_ok());
        routes.register("widgets", CustomRoute::new("/y", "y", &[Method::GET], Arc::new(Noop)));
        let err = routes.check_targets(&registry).unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownRouteTarget { table, .. } if table == "widgets"));
    }

    #[test]
    fn routes_are_kept_per_table() {
        let mut routes = CustomRoutes::new();
        routes
            .register(entities::ROLES, CustomRoute::new("/a", "a", &[Method::GET], Arc::new(Noop)))
            .register(entities::ROLES, CustomRoute::new("/b", "b", &[Method::POST], Arc::new(Noop)));
        assert_eq!(routes.for_table(entities::ROLES).len(), 2);
        assert!(routes.for_table(entities::ACCOUNTS).is_empty());
    }
}
