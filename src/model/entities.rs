//! Shipped entity declarations: Account, Role, Application.

use crate::hash::PasswordHasher;
use crate::model::descriptor::now;
use crate::model::{EntityDescriptor, FieldDescriptor, FieldType, Instance, Transform, SYSTEM_ACTOR};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const ACCOUNTS: &str = "accounts";
pub const ROLES: &str = "roles";
pub const APPLICATIONS: &str = "applications";

pub const ACCOUNT_STATUSES: &[&str] = &["INACTIVE", "ACTIVE", "SUSPENDED", "BLOCKED"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountStatus {
    Inactive,
    Active,
    Suspended,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INACTIVE" => Ok(AccountStatus::Inactive),
            "ACTIVE" => Ok(AccountStatus::Active),
            "SUSPENDED" => Ok(AccountStatus::Suspended),
            "BLOCKED" => Ok(AccountStatus::Blocked),
            _ => Err(format!("Invalid status value: {}", s)),
        }
    }
}

/// All shipped descriptors, in registration order.
pub fn descriptors() -> Vec<EntityDescriptor> {
    vec![role(), application(), account()]
}

pub fn role() -> EntityDescriptor {
    EntityDescriptor::new("Role", ROLES, "roles")
        .field(
            FieldDescriptor::new("role", FieldType::text(30))
                .required()
                .min_length(1)
                .unique()
                .indexed()
                .transform(Transform::Uppercase),
        )
        .with_audit_fields(ACCOUNTS)
}

pub fn application() -> EntityDescriptor {
    EntityDescriptor::new("Application", APPLICATIONS, "application")
        .field(FieldDescriptor::new("name", FieldType::text(30)).required())
        .field(FieldDescriptor::new("description", FieldType::text(50)).required())
        .field(FieldDescriptor::new("index", FieldType::text(50)).nullable())
        .field(FieldDescriptor::new("api", FieldType::text(50)).nullable())
        .with_audit_fields(ACCOUNTS)
}

pub fn account() -> EntityDescriptor {
    EntityDescriptor::new("Account", ACCOUNTS, "account")
        .field(
            FieldDescriptor::new("username", FieldType::text(30))
                .required()
                .min_length(1)
                .pattern(r"^[A-Za-z0-9_.@-]+$")
                .unique()
                .indexed(),
        )
        .field(
            FieldDescriptor::new("password", FieldType::text(120))
                .required()
                .transform(Transform::PasswordHash)
                .internal(),
        )
        .field(
            FieldDescriptor::new("verified_by", FieldType::Integer)
                .nullable()
                .references(ACCOUNTS, Some(SYSTEM_ACTOR)),
        )
        .field(FieldDescriptor::new("verified_date", FieldType::DateTime).nullable().default_with(now))
        .field(
            FieldDescriptor::new("status", FieldType::Enum(ACCOUNT_STATUSES))
                .default_value(Value::from(AccountStatus::Inactive.as_str())),
        )
        .field(
            FieldDescriptor::new("user_id", FieldType::Integer)
                .default_value(Value::from(0))
                .indexed(),
        )
        .field(
            FieldDescriptor::new("wrong_attempt", FieldType::Integer)
                .default_value(Value::from(0))
                .minimum(0.0),
        )
        .with_audit_fields(ACCOUNTS)
}

/// Status of a stored account row, if it carries a known label.
pub fn account_status(instance: &Instance) -> Option<AccountStatus> {
    instance.get("status")?.as_str()?.parse().ok()
}

pub fn is_verified(instance: &Instance) -> bool {
    account_status(instance) == Some(AccountStatus::Active)
}

pub fn is_not_verified(instance: &Instance) -> bool {
    account_status(instance) == Some(AccountStatus::Inactive)
}

pub fn is_blocked(instance: &Instance) -> bool {
    account_status(instance) == Some(AccountStatus::Blocked)
}

/// Compares a plaintext against the stored hash. An empty stored password never matches.
pub fn check_password(hasher: &dyn PasswordHasher, instance: &Instance, plaintext: &str) -> bool {
    match instance.get("password").and_then(Value::as_str) {
        Some(digest) if !digest.is_empty() => hasher.verify(digest, plaintext),
        _ => false,
    }
}
