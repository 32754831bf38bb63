//! HTTP handlers: generic entity CRUD and the shipped custom routes.

pub mod custom;
pub mod entity;

pub use custom::builtin_custom_routes;

use crate::error::AppError;
use serde_json::Value;

/// Path ids are integers; anything else is a bad request.
pub fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

/// Optional JSON body: empty means none.
pub fn parse_optional_json(body: &[u8]) -> Result<Option<Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// Required JSON body. Content type is not checked; an empty body is a bad request.
pub fn parse_json(body: &[u8]) -> Result<Value, AppError> {
    parse_optional_json(body)?.ok_or_else(|| AppError::BadRequest("request body is required".into()))
}
