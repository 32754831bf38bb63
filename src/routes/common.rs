//! Fixed routes: liveness, catch-all, superadmin index and route introspection.

use crate::response::message_body;
use crate::routes::binder::{mount_paths, RouteTable};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    routing::get,
    Json, Router,
};
use serde_json::Value;

pub const MAIN_NAMESPACE: &str = "main";
pub const SUPERADMIN_NAMESPACE: &str = "superadmin";

async fn main_index() -> Json<Value> {
    Json(message_body("This is the index page of api/main route:main"))
}

async fn default_path(Path(path): Path<String>) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(message_body(format!("catching {}", path))))
}

async fn superadmin_index() -> Json<Value> {
    tracing::info!("super admin index route called");
    Json(message_body("This is the index page of api/superadmin route:superadmin"))
}

async fn routes_path(State(state): State<AppState>) -> Json<RouteTable> {
    Json(state.routes.as_ref().clone())
}

/// JSON 404 for anything outside the base URL.
pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(crate::response::error_body(format!("no route for {}", uri.path()))),
    )
}

/// Records the fixed routes under their namespaces.
pub fn record_fixed(table: &mut RouteTable, base_url: &str) {
    let get = [Method::GET];
    table.record(MAIN_NAMESPACE, format!("{}/", base_url), "index", &get);
    table.record(MAIN_NAMESPACE, format!("{}/*path", base_url), "default_path", &get);
    table.record(SUPERADMIN_NAMESPACE, format!("{}/superadmin/", base_url), "index", &get);
    table.record(SUPERADMIN_NAMESPACE, format!("{}/superadmin/routes", base_url), "routes_path", &get);
}

pub fn common_routes(state: AppState) -> Router {
    let base = state.base_url.clone();
    let superadmin = format!("{}/superadmin", base);
    let mut router: Router<AppState> = Router::new();
    for path in mount_paths(&base, "/") {
        router = router.route(&path, get(main_index));
    }
    for path in mount_paths(&superadmin, "/") {
        router = router.route(&path, get(superadmin_index));
    }
    router
        .route(&format!("{}/routes", superadmin), get(routes_path))
        .route(&format!("{}/*path", base), get(default_path))
        .with_state(state)
}
