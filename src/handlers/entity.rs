//! Generic entity handlers. One set serves every entity; the bound `EntityState` selects the type.

use crate::error::AppError;
use crate::handlers::{parse_id, parse_json};
use crate::response::{created, message_body, ok, ok_many};
use crate::service::{DEFAULT_PAGE, DEFAULT_PER_PAGE};
use crate::state::EntityState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use std::collections::HashMap;

/// Integer query parameter; unparsable values fall back to the default.
fn int_param(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub async fn index(State(state): State<EntityState>) -> impl IntoResponse {
    ok(message_body(format!(
        "This is the index route for the {}",
        state.binding.namespace()
    )))
}

pub async fn create(
    State(state): State<EntityState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let body = parse_json(&body)?;
    let row = state.controller().create(&body).await?;
    Ok(created(row))
}

pub async fn read(
    State(state): State<EntityState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    Ok(ok(state.controller().read(id).await?))
}

pub async fn update(
    State(state): State<EntityState>,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = parse_json(&body)?;
    Ok(ok(state.controller().update(id, &body).await?))
}

pub async fn delete(
    State(state): State<EntityState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    Ok(ok(state.controller().delete(id).await?))
}

pub async fn list(
    State(state): State<EntityState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = int_param(&params, "page", DEFAULT_PAGE);
    let per_page = int_param(&params, "per_page", DEFAULT_PER_PAGE);
    Ok(ok_many(state.controller().list(page, per_page).await?))
}

pub async fn search(
    State(state): State<EntityState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let criteria = state.binding.schema().criteria(params);
    Ok(ok_many(state.controller().search(&criteria).await?))
}

pub async fn count(
    State(state): State<EntityState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let criteria = state.binding.schema().criteria(params);
    let count = state.controller().count(&criteria).await?;
    Ok(ok(json!({ "count": count })))
}

pub async fn exists(
    State(state): State<EntityState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let criteria = state.binding.schema().criteria(params);
    let exists = state.controller().exists(&criteria).await?;
    Ok(ok(json!({ "exists": exists })))
}

pub async fn read_all(State(state): State<EntityState>) -> Result<impl IntoResponse, AppError> {
    Ok(ok_many(state.controller().read_all().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_integers_fall_back() {
        let mut params = HashMap::new();
        params.insert("page".to_string(), "two".to_string());
        params.insert("per_page".to_string(), " 5 ".to_string());
        assert_eq!(int_param(&params, "page", 1), 1);
        assert_eq!(int_param(&params, "per_page", 10), 5);
        assert_eq!(int_param(&params, "missing", 7), 7);
    }
}
