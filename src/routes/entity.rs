//! Mounts one entity binding: generic operations plus its custom routes.

use crate::error::AppError;
use crate::handlers::{entity as h, parse_optional_json};
use crate::routes::binder::{mount_paths, EntityBinding, Operation, RouteTarget};
use crate::routes::custom::{CustomCall, CustomHandler};
use crate::state::{AppState, EntityState};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::Method,
    response::Response,
    routing::{delete, get, on, post, put, MethodFilter, MethodRouter},
    Router,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn generic_handler(op: Operation) -> MethodRouter<EntityState> {
    match op {
        Operation::Index => get(h::index),
        Operation::Create => post(h::create),
        Operation::Read => get(h::read),
        Operation::Update => put(h::update),
        Operation::Delete => delete(h::delete),
        Operation::List => get(h::list),
        Operation::Search => get(h::search),
        Operation::Count => get(h::count),
        Operation::Exists => get(h::exists),
        Operation::ReadAll => get(h::read_all),
    }
}

fn method_filter(methods: &[Method]) -> MethodFilter {
    methods
        .iter()
        .filter_map(|m| MethodFilter::try_from(m.clone()).ok())
        .reduce(MethodFilter::or)
        .unwrap_or(MethodFilter::GET)
}

fn custom_handler(
    methods: &[Method],
    handler: Arc<dyn CustomHandler>,
    defaults: Map<String, Value>,
) -> MethodRouter<AppState> {
    on(
        method_filter(methods),
        move |State(state): State<AppState>,
              params: Option<Path<HashMap<String, String>>>,
              body: Bytes| {
            let handler = handler.clone();
            let defaults = defaults.clone();
            let params = params.map(|Path(p)| p).unwrap_or_default();
            dispatch(handler, state, defaults, params, body)
        },
    )
}

async fn dispatch(
    handler: Arc<dyn CustomHandler>,
    state: AppState,
    defaults: Map<String, Value>,
    params: HashMap<String, String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let call = CustomCall {
        state,
        defaults,
        params,
        body: parse_optional_json(&body)?,
    };
    handler.call(call).await
}

/// Router for one entity, with its state applied.
pub fn entity_routes(state: &AppState, binding: Arc<EntityBinding>) -> Router {
    let prefix = binding.prefix(&state.base_url);
    let mut generic: Router<EntityState> = Router::new();
    let mut custom: Router<AppState> = Router::new();
    for route in binding.routes() {
        for path in mount_paths(&prefix, &route.rule) {
            match &route.target {
                RouteTarget::Generic(op) => {
                    generic = generic.route(&path, generic_handler(*op));
                }
                RouteTarget::Custom { handler, defaults } => {
                    custom = custom.route(
                        &path,
                        custom_handler(&route.methods, handler.clone(), defaults.clone()),
                    );
                }
            }
        }
    }
    tracing::debug!(entity = %binding.namespace(), prefix = %prefix, "mounted");
    let entity_state = EntityState {
        app: state.clone(),
        binding,
    };
    generic
        .with_state(entity_state)
        .merge(custom.with_state(state.clone()))
}
