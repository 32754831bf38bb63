//! Response body helpers.

use axum::{http::StatusCode, Json};
use serde_json::Value;

pub fn error_body(message: String) -> Value {
    serde_json::json!({ "error": message })
}

pub fn message_body(message: impl Into<String>) -> Value {
    serde_json::json!({ "message": message.into() })
}

pub fn ok(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(data))
}

pub fn created(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok_many(data: Vec<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(Value::Array(data)))
}
