//! Per-entity route tables, built once at startup from each entity's sentinel.

use crate::model::{DefaultInstance, EntityDescriptor};
use crate::routes::custom::{CustomHandler, CustomRoutes, ENTITY_PARAM};
use crate::schema::Schema;
use axum::http::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Controller operations every entity exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Index,
    Create,
    Read,
    Update,
    Delete,
    List,
    Search,
    Count,
    Exists,
    ReadAll,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Index,
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::List,
        Operation::Search,
        Operation::Count,
        Operation::Exists,
        Operation::ReadAll,
    ];

    pub fn rule(&self) -> &'static str {
        match self {
            Operation::Index | Operation::Create => "/",
            Operation::Read | Operation::Update | Operation::Delete => "/:id",
            Operation::List => "/list",
            Operation::Search => "/search",
            Operation::Count => "/count",
            Operation::Exists => "/exists",
            Operation::ReadAll => "/all",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Operation::Index => "index_instance",
            Operation::Create => "create_instance",
            Operation::Read => "get_instance",
            Operation::Update => "update_instance",
            Operation::Delete => "delete_instance",
            Operation::List => "list_instances",
            Operation::Search => "search_instances",
            Operation::Count => "count_instances",
            Operation::Exists => "exists_instances",
            Operation::ReadAll => "read_all_instances",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::Create => Method::POST,
            Operation::Update => Method::PUT,
            Operation::Delete => Method::DELETE,
            _ => Method::GET,
        }
    }
}

#[derive(Clone)]
pub enum RouteTarget {
    Generic(Operation),
    Custom {
        handler: Arc<dyn CustomHandler>,
        defaults: Map<String, Value>,
    },
}

#[derive(Clone)]
pub struct BoundRoute {
    pub rule: String,
    pub endpoint: String,
    pub methods: Vec<Method>,
    pub target: RouteTarget,
}

/// Everything attached to one entity type: its sentinel, schema, and routes.
pub struct EntityBinding {
    sentinel: DefaultInstance,
    schema: Schema,
    routes: Vec<BoundRoute>,
}

impl std::fmt::Debug for EntityBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBinding")
            .field("entity", &self.descriptor().name)
            .finish()
    }
}

impl EntityBinding {
    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        self.sentinel.descriptor()
    }

    pub fn sentinel(&self) -> &DefaultInstance {
        &self.sentinel
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn routes(&self) -> &[BoundRoute] {
        &self.routes
    }

    /// Introspection namespace: the entity name.
    pub fn namespace(&self) -> &str {
        &self.descriptor().name
    }

    pub fn prefix(&self, base_url: &str) -> String {
        format!("{}/{}", base_url, self.descriptor().path_segment)
    }
}

pub struct RouteBinder;

impl RouteBinder {
    /// Generic operations first, then the entity's custom routes with `entity` injected
    /// into their defaults.
    pub fn bind(sentinel: DefaultInstance, schema: Schema, custom: &CustomRoutes) -> EntityBinding {
        let table = sentinel.descriptor().table.clone();
        let mut routes: Vec<BoundRoute> = Operation::ALL
            .iter()
            .map(|op| BoundRoute {
                rule: op.rule().to_string(),
                endpoint: op.endpoint().to_string(),
                methods: vec![op.method()],
                target: RouteTarget::Generic(*op),
            })
            .collect();
        for route in custom.for_table(&table) {
            let mut defaults = route.defaults.clone();
            defaults
                .entry(ENTITY_PARAM.to_string())
                .or_insert_with(|| Value::String(table.clone()));
            routes.push(BoundRoute {
                rule: route.rule.clone(),
                endpoint: route.endpoint.clone(),
                methods: route.methods.clone(),
                target: RouteTarget::Custom {
                    handler: route.handler.clone(),
                    defaults,
                },
            });
        }
        EntityBinding {
            sentinel,
            schema,
            routes,
        }
    }
}

/// Full paths a rule is mounted at under `prefix`. The root rule answers with and without
/// the trailing slash.
pub fn mount_paths(prefix: &str, rule: &str) -> Vec<String> {
    if rule == "/" {
        if prefix.is_empty() {
            vec!["/".to_string()]
        } else {
            vec![prefix.to_string(), format!("{}/", prefix)]
        }
    } else {
        vec![format!("{}{}", prefix, rule)]
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RouteInfo {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Endpoint")]
    pub endpoint: String,
    #[serde(rename = "Methods")]
    pub methods: Vec<String>,
}

/// Bound routes per namespace, as served by the introspection endpoint.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct RouteTable(BTreeMap<String, Vec<RouteInfo>>);

impl RouteTable {
    pub fn record(&mut self, namespace: &str, url: String, endpoint: &str, methods: &[Method]) {
        self.0.entry(namespace.to_string()).or_default().push(RouteInfo {
            url,
            endpoint: endpoint.to_string(),
            methods: methods.iter().map(|m| m.as_str().to_string()).collect(),
        });
    }

    pub fn record_binding(&mut self, base_url: &str, binding: &EntityBinding) {
        let prefix = binding.prefix(base_url);
        for route in binding.routes() {
            self.record(
                binding.namespace(),
                format!("{}{}", prefix, route.rule),
                &route.endpoint,
                &route.methods,
            );
        }
    }

    pub fn namespace(&self, name: &str) -> Option<&[RouteInfo]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Argon2Hasher;
    use crate::model::{entities, synthesize};

    fn binding(descriptor: crate::model::EntityDescriptor, custom: &CustomRoutes) -> EntityBinding {
        let sentinel = synthesize(Arc::new(descriptor)).unwrap();
        let schema = Schema::generate(sentinel.descriptor().clone(), Arc::new(Argon2Hasher)).unwrap();
        RouteBinder::bind(sentinel, schema, custom)
    }

    #[test]
    fn every_entity_gets_the_generic_table() {
        let b = binding(entities::application(), &CustomRoutes::new());
        let endpoints: Vec<_> = b.routes().iter().map(|r| r.endpoint.as_str()).collect();
        assert_eq!(endpoints.len(), 10);
        assert!(endpoints.contains(&"exists_instances"));
        assert_eq!(b.prefix("/api/main"), "/api/main/application");
    }

    #[test]
    fn root_rule_is_mounted_with_and_without_slash() {
        assert_eq!(mount_paths("/api/main/roles", "/"), vec!["/api/main/roles", "/api/main/roles/"]);
        assert_eq!(mount_paths("/api/main/roles", "/:id"), vec!["/api/main/roles/:id"]);
        assert_eq!(mount_paths("", "/"), vec!["/"]);
    }

    #[test]
    fn route_table_serializes_per_namespace() {
        let b = binding(entities::role(), &CustomRoutes::new());
        let mut table = RouteTable::default();
        table.record_binding("/api/main", &b);
        let json = serde_json::to_value(&table).unwrap();
        let first = &json["Role"][0];
        assert_eq!(first["URL"], "/api/main/roles/");
        assert_eq!(first["Endpoint"], "index_instance");
        assert_eq!(first["Methods"], serde_json::json!(["GET"]));
    }
}
