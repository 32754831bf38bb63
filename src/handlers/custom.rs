//! Custom routes shipped with the built-in entities.

use crate::error::{AppError, FieldError, ValidationErrors};
use crate::model::entities::{self, AccountStatus};
use crate::model::{now, EntityRegistry, Instance};
use crate::response::{message_body, ok};
use crate::routes::custom::{CustomCall, CustomHandler, CustomRoute, CustomRoutes};
use async_trait::async_trait;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct RoleCustom;

#[async_trait]
impl CustomHandler for RoleCustom {
    async fn call(&self, _call: CustomCall) -> Result<Response, AppError> {
        Ok(ok(message_body("Custom method response")).into_response())
    }
}

/// Shared by every entity; the target comes from the `entity` default.
pub struct DescribeEntity;

#[async_trait]
impl CustomHandler for DescribeEntity {
    async fn call(&self, call: CustomCall) -> Result<Response, AppError> {
        let binding = call.target()?;
        let descriptor = binding.descriptor();
        let fields: Vec<Value> = descriptor
            .fields
            .iter()
            .filter(|f| !f.internal)
            .map(|f| {
                json!({
                    "name": f.name,
                    "type": f.field_type.tag(),
                    "nullable": f.nullable,
                    "required": f.is_required(),
                })
            })
            .collect();
        let body = json!({
            "entity": descriptor.name,
            "table": descriptor.table,
            "fields": fields,
            "defaults": binding.schema().dump(binding.sentinel().values()),
        });
        Ok(ok(body).into_response())
    }
}

pub struct CheckPassword;

#[async_trait]
impl CustomHandler for CheckPassword {
    async fn call(&self, call: CustomCall) -> Result<Response, AppError> {
        let binding = call.target()?;
        let id = call.id()?;
        let password = call
            .body_field("password")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::from(ValidationErrors(vec![FieldError::new(
                    "password",
                    "Missing data for required field.",
                )]))
            })?;
        let row = call.state.controller(&binding).fetch(id).await?;
        let valid = entities::check_password(call.state.hasher.as_ref(), &row, password);
        tracing::info!(account = id, valid, "password check");
        Ok(ok(json!({ "valid": valid })).into_response())
    }
}

/// Marks an account ACTIVE and records who verified it.
pub struct VerifyAccount;

#[async_trait]
impl CustomHandler for VerifyAccount {
    async fn call(&self, call: CustomCall) -> Result<Response, AppError> {
        let binding = call.target()?;
        let id = call.id()?;
        let verified_by = call.body_field("verified_by").cloned().unwrap_or(Value::from(0));
        let mut changes = binding
            .schema()
            .load_partial(&json!({ "verified_by": verified_by }))?;
        changes.insert("status".into(), Value::from(AccountStatus::Active.as_str()));
        changes.insert("verified_date".into(), now());
        let row = call.state.controller(&binding).apply(id, changes).await?;
        Ok(ok(row).into_response())
    }
}

pub struct BlockAccount;

#[async_trait]
impl CustomHandler for BlockAccount {
    async fn call(&self, call: CustomCall) -> Result<Response, AppError> {
        let binding = call.target()?;
        let id = call.id()?;
        let mut changes = Instance::new();
        changes.insert("status".into(), Value::from(AccountStatus::Blocked.as_str()));
        let row = call.state.controller(&binding).apply(id, changes).await?;
        Ok(ok(row).into_response())
    }
}

pub struct AccountStatusView;

#[async_trait]
impl CustomHandler for AccountStatusView {
    async fn call(&self, call: CustomCall) -> Result<Response, AppError> {
        let binding = call.target()?;
        let id = call.id()?;
        let row = call.state.controller(&binding).fetch(id).await?;
        Ok(ok(json!({
            "status": row.get("status").cloned().unwrap_or(Value::Null),
            "is_verified": entities::is_verified(&row),
            "is_not_verified": entities::is_not_verified(&row),
            "is_blocked": entities::is_blocked(&row),
        }))
        .into_response())
    }
}

/// Custom routes for the built-in entities, plus `/describe` on every registered entity.
pub fn builtin_custom_routes(registry: &EntityRegistry) -> CustomRoutes {
    let mut routes = CustomRoutes::new();
    let describe: Arc<dyn CustomHandler> = Arc::new(DescribeEntity);
    for entity in registry.entities() {
        routes.register(
            &entity.table,
            CustomRoute::new("/describe", "describe_entity", &[Method::GET], describe.clone()),
        );
    }
    if registry.by_table(entities::ROLES).is_some() {
        routes.register(
            entities::ROLES,
            CustomRoute::new("/custom", "custom_route", &[Method::GET], Arc::new(RoleCustom)),
        );
    }
    if registry.by_table(entities::ACCOUNTS).is_some() {
        routes
            .register(
                entities::ACCOUNTS,
                CustomRoute::new("/:id/check-password", "check_password", &[Method::POST], Arc::new(CheckPassword)),
            )
            .register(
                entities::ACCOUNTS,
                CustomRoute::new("/:id/verify", "verify_account", &[Method::POST], Arc::new(VerifyAccount)),
            )
            .register(
                entities::ACCOUNTS,
                CustomRoute::new("/:id/block", "block_account", &[Method::POST], Arc::new(BlockAccount)),
            )
            .register(
                entities::ACCOUNTS,
                CustomRoute::new("/:id/status", "account_status", &[Method::GET], Arc::new(AccountStatusView)),
            );
    }
    routes
}
