//! Typed errors and HTTP mapping.

use crate::response::error_body;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use thiserror::Error;

/// Startup-time defects in entity declarations. Fatal: boot aborts.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("required field '{field}' of {entity} is missing a default value and is not nullable")]
    MissingDefault { entity: String, field: String },
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate field '{field}' on {entity}")]
    DuplicateField { entity: String, field: String },
    #[error("missing reference: {entity}.{field} targets unknown table '{table}'")]
    MissingReference {
        entity: String,
        field: String,
        table: String,
    },
    #[error("invalid pattern for {entity}.{field}: {message}")]
    InvalidPattern {
        entity: String,
        field: String,
        message: String,
    },
    #[error("custom route '{endpoint}' targets unknown table '{table}'")]
    UnknownRouteTarget { endpoint: String, table: String },
}

/// Environment settings that failed to parse.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {var}: {message}")]
    Env { var: &'static str, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every problem found in one payload, in field order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Ok when empty, otherwise the aggregated error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation errors: ")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store: {0}")]
    Store(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("password hashing: {0}")]
    Hash(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Descriptor(_) | AppError::Db(_) | AppError::Store(_) | AppError::Hash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(error_body(self.to_string()))).into_response()
    }
}
