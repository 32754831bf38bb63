//! Router assembly: fixed routes, one router per entity binding, logging and body limit layers.

pub mod binder;
pub mod common;
pub mod custom;
pub mod entity;

pub use binder::{EntityBinding, Operation, RouteBinder, RouteInfo, RouteTable};
pub use custom::{CustomCall, CustomHandler, CustomRoute, CustomRoutes, ENTITY_PARAM};

use crate::middleware::log_request;
use crate::state::AppState;
use axum::{middleware, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let mut app = Router::new();
    for binding in state.bindings.iter() {
        app = app.merge(entity::entity_routes(&state, binding.clone()));
    }
    app.merge(common::common_routes(state))
        .fallback(common::not_found)
        .layer(middleware::from_fn(log_request))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::builtin_custom_routes;
    use crate::hash::Argon2Hasher;
    use crate::model::{entities, EntityRegistry};
    use crate::startup::bootstrap;
    use crate::store::MemoryStore;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let registry = Arc::new(EntityRegistry::new(entities::descriptors()).unwrap());
        let custom = builtin_custom_routes(&registry);
        let state = bootstrap(
            Arc::new(MemoryStore::new()),
            registry,
            Arc::new(Argon2Hasher),
            &custom,
            "/api/main",
        )
        .unwrap();
        build_router(state, 1024 * 1024)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn fixed_routes_answer() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/main/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "This is the index page of api/main route:main");

        let (status, body) = send(&app, "GET", "/api/main/nowhere/at/all", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "catching nowhere/at/all");

        let (status, body) = send(&app, "GET", "/api/main/superadmin/routes", None).await;
        assert_eq!(status, StatusCode::OK);
        let accounts = body["Account"].as_array().unwrap();
        assert!(accounts
            .iter()
            .any(|r| r["URL"] == "/api/main/account/:id" && r["Methods"] == json!(["PUT"])));
        assert!(body["main"].is_array());
    }

    #[tokio::test]
    async fn entity_crud_over_http() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/main/roles/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "This is the index route for the Role");

        let (status, created) = send(&app, "POST", "/api/main/roles/", Some(json!({"role": "admin"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "ADMIN");
        let id = created["id"].as_i64().unwrap();

        let (status, read) = send(&app, "GET", &format!("/api/main/roles/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read, created);

        let (status, updated) = send(&app, "PUT", &format!("/api/main/roles/{}", id), Some(json!({"role": "staff"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["role"], "STAFF");

        let (_, count) = send(&app, "GET", "/api/main/roles/count?role=STAFF", None).await;
        assert_eq!(count["count"], 1);
        let (_, exists) = send(&app, "GET", "/api/main/roles/exists?role=ADMIN", None).await;
        assert_eq!(exists["exists"], false);

        let (status, _) = send(&app, "DELETE", &format!("/api/main/roles/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", &format!("/api/main/roles/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("Role with id {} not found.", id));
    }

    #[tokio::test]
    async fn errors_map_to_status_codes() {
        let app = app();
        let (status, body) = send(&app, "POST", "/api/main/application/", Some(json!({"name": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("description"));

        let (status, _) = send(&app, "GET", "/api/main/application/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(&app, "POST", "/api/main/roles/", Some(json!({"role": "admin"}))).await;
        let (status, _) = send(&app, "POST", "/api/main/roles/", Some(json!({"role": "ADMIN"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "GET", "/api/main/roles/search?colour=red", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn send_raw(app: &Router, method: &str, uri: &str, content_type: Option<&str>, body: &'static str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let res = app.clone().oneshot(builder.body(Body::from(body)).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        let app = app();
        let (status, body) = send_raw(&app, "POST", "/api/main/roles/", Some("application/json"), "{").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid JSON body"));

        let (status, body) = send_raw(&app, "POST", "/api/main/roles/", None, r#"{"role": "ops"}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "OPS");

        let (status, body) = send_raw(&app, "POST", "/api/main/roles/", None, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send_raw(&app, "PUT", "/api/main/roles/1", Some("application/json"), "[1,").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn omitted_optional_fields_are_null() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/main/application/", Some(json!({"name": "n", "description": "d"}))).await;
        assert_eq!(created["index"], Value::Null);
        assert_eq!(created["api"], Value::Null);
        let (_, hits) = send(&app, "GET", "/api/main/application/search?api=", None).await;
        assert!(hits.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_uses_query_pagination() {
        let app = app();
        for name in ["a", "b", "c", "d", "e"] {
            send(&app, "POST", "/api/main/application/", Some(json!({"name": name, "description": "d"}))).await;
        }
        let (_, page) = send(&app, "GET", "/api/main/application/list?page=3&per_page=2", None).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["name"], "e");
        let (_, page) = send(&app, "GET", "/api/main/application/list", None).await;
        assert_eq!(page.as_array().unwrap().len(), 5);
        let (_, all) = send(&app, "GET", "/api/main/application/all", None).await;
        assert_eq!(all.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn account_custom_routes() {
        let app = app();
        let (_, alice) = send(&app, "POST", "/api/main/account/", Some(json!({"username": "alice", "password": "secret"}))).await;
        let id = alice["id"].as_i64().unwrap();
        assert!(alice.get("password").is_none());

        let (_, check) = send(&app, "POST", &format!("/api/main/account/{}/check-password", id), Some(json!({"password": "secret"}))).await;
        assert_eq!(check["valid"], true);
        let (_, check) = send(&app, "POST", &format!("/api/main/account/{}/check-password", id), Some(json!({"password": "wrong"}))).await;
        assert_eq!(check["valid"], false);

        let (_, status) = send(&app, "GET", &format!("/api/main/account/{}/status", id), None).await;
        assert_eq!(status["status"], "INACTIVE");
        assert_eq!(status["is_not_verified"], true);

        let (code, _) = send(&app, "POST", &format!("/api/main/account/{}/verify", id), Some(json!({"verified_by": 999}))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let (code, verified) = send(&app, "POST", &format!("/api/main/account/{}/verify", id), Some(json!({"verified_by": id}))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(verified["status"], "ACTIVE");
        assert_eq!(verified["verified_by"], id);

        send(&app, "POST", &format!("/api/main/account/{}/block", id), None).await;
        let (_, status) = send(&app, "GET", &format!("/api/main/account/{}/status", id), None).await;
        assert_eq!(status["is_blocked"], true);
        assert_eq!(status["is_verified"], false);

        let (code, _) = send(&app, "GET", "/api/main/account/77/status", None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shared_describe_resolves_its_entity() {
        let app = app();
        let (_, role) = send(&app, "GET", "/api/main/roles/describe", None).await;
        assert_eq!(role["entity"], "Role");
        let (_, account) = send(&app, "GET", "/api/main/account/describe", None).await;
        assert_eq!(account["entity"], "Account");
        let names: Vec<_> = account["fields"].as_array().unwrap().iter().map(|f| f["name"].clone()).collect();
        assert!(!names.contains(&json!("password")));
        assert!(names.contains(&json!("username")));
        let (_, custom) = send(&app, "GET", "/api/main/roles/custom", None).await;
        assert_eq!(custom["message"], "Custom method response");
    }
}
