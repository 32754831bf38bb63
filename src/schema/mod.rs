//! Generic schema: validate, load, and dump contracts derived from an entity descriptor.

mod coerce;
mod validation;

pub use coerce::{coerce, coerce_query, parse_datetime};
pub use validation::check_rules;

use crate::error::{AppError, DescriptorError, FieldError, ValidationErrors};
use crate::hash::PasswordHasher;
use crate::model::defaults::default_for;
use crate::model::{EntityDescriptor, FieldDescriptor, Instance, Transform};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Create payloads are checked in full; update payloads only for the fields they carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Full,
    Partial,
}

#[derive(Clone)]
pub struct Schema {
    descriptor: Arc<EntityDescriptor>,
    hasher: Arc<dyn PasswordHasher>,
    patterns: HashMap<String, Regex>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("entity", &self.descriptor.name)
            .finish()
    }
}

impl Schema {
    /// Compiles pattern rules once; an invalid pattern is a descriptor defect.
    pub fn generate(
        descriptor: Arc<EntityDescriptor>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, DescriptorError> {
        let mut patterns = HashMap::new();
        for field in &descriptor.fields {
            if let Some(p) = &field.rule.pattern {
                let re = Regex::new(p).map_err(|e| DescriptorError::InvalidPattern {
                    entity: descriptor.name.clone(),
                    field: field.name.clone(),
                    message: e.to_string(),
                })?;
                patterns.insert(field.name.clone(), re);
            }
        }
        Ok(Schema {
            descriptor,
            hasher,
            patterns,
        })
    }

    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }

    /// Collects every type, nullability, enum, rule, and presence problem in `data`.
    pub fn validate(&self, data: &Value, mode: Mode) -> ValidationErrors {
        let Some(obj) = data.as_object() else {
            return ValidationErrors(vec![FieldError::new("_schema", "Invalid input type.")]);
        };
        let mut errors = Vec::new();
        for key in obj.keys() {
            match self.descriptor.get(key) {
                None => errors.push(FieldError::new(key, "Unknown field.")),
                Some(f) if f.server_assigned => {
                    errors.push(FieldError::new(key, "Field is assigned by the server."))
                }
                Some(_) => {}
            }
        }
        for field in self.writable_fields() {
            match obj.get(&field.name) {
                None => {
                    if mode == Mode::Full && field.is_required() {
                        errors.push(FieldError::new(&field.name, "Missing data for required field."));
                    }
                }
                Some(v) => match coerce(field, v) {
                    Err(message) => errors.push(FieldError::new(&field.name, message)),
                    Ok(c) => {
                        if let Some(message) = check_rules(field, &c, self.patterns.get(&field.name)) {
                            errors.push(FieldError::new(&field.name, message));
                        }
                    }
                },
            }
        }
        ValidationErrors(errors)
    }

    /// Full instance from a create payload, then transforms. Absent fields take their declared
    /// default; nullable fields without one stay null.
    pub fn load(&self, data: &Value) -> Result<Instance, AppError> {
        self.validate(data, Mode::Full).into_result()?;
        let empty = Map::new();
        let obj = data.as_object().unwrap_or(&empty);
        let mut instance = Instance::new();
        for field in self.writable_fields() {
            let value = match obj.get(&field.name) {
                Some(v) => self.coerced(field, v)?,
                None if field.nullable && field.default.is_none() => Value::Null,
                None => default_for(&self.descriptor, field)?,
            };
            let value = self.apply_transform(field, value)?;
            instance.insert(field.name.clone(), value);
        }
        Ok(instance)
    }

    /// Only the fields present in an update payload, coerced and transformed.
    pub fn load_partial(&self, data: &Value) -> Result<Instance, AppError> {
        self.validate(data, Mode::Partial).into_result()?;
        let mut changes = Instance::new();
        if let Some(obj) = data.as_object() {
            for field in self.writable_fields() {
                if let Some(v) = obj.get(&field.name) {
                    let value = self.coerced(field, v)?;
                    changes.insert(field.name.clone(), self.apply_transform(field, value)?);
                }
            }
        }
        Ok(changes)
    }

    /// Plain mapping of declared fields; internal fields are left out.
    pub fn dump(&self, instance: &Instance) -> Value {
        let mut out = Map::new();
        for field in self.descriptor.fields.iter().filter(|f| !f.internal) {
            let v = instance.get(&field.name).cloned().unwrap_or(Value::Null);
            out.insert(field.name.clone(), v);
        }
        Value::Object(out)
    }

    pub fn dump_many(&self, instances: &[Instance]) -> Vec<Value> {
        instances.iter().map(|i| self.dump(i)).collect()
    }

    /// Exact-match criteria from query parameters. Unknown names pass through for the store to reject.
    pub fn criteria<I>(&self, params: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut out: Vec<(String, Value)> = params
            .into_iter()
            .map(|(k, raw)| {
                let v = match self.descriptor.get(&k) {
                    Some(field) => coerce_query(field, &raw),
                    None => Value::String(raw),
                };
                (k, v)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn writable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptor.fields.iter().filter(|f| !f.server_assigned)
    }

    fn coerced(&self, field: &FieldDescriptor, v: &Value) -> Result<Value, AppError> {
        coerce(field, v).map_err(|m| AppError::Validation(ValidationErrors(vec![FieldError::new(&field.name, m)])))
    }

    fn apply_transform(&self, field: &FieldDescriptor, value: Value) -> Result<Value, AppError> {
        let Some(transform) = field.transform else {
            return Ok(value);
        };
        let Value::String(s) = value else {
            return Ok(value);
        };
        Ok(Value::String(match transform {
            Transform::Uppercase => s.to_uppercase(),
            Transform::PasswordHash if s.is_empty() => s,
            Transform::PasswordHash => self.hasher.hash(&s)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Argon2Hasher;
    use crate::model::entities;
    use serde_json::json;

    fn schema(d: EntityDescriptor) -> Schema {
        Schema::generate(Arc::new(d), Arc::new(Argon2Hasher)).unwrap()
    }

    #[test]
    fn missing_required_fields_are_reported_together() {
        let s = schema(entities::application());
        let errors = s.validate(&json!({}), Mode::Full);
        assert!(errors.has_field("name"));
        assert!(errors.has_field("description"));
        assert!(!errors.has_field("index"));
    }

    #[test]
    fn partial_mode_skips_presence_checks() {
        let s = schema(entities::application());
        assert!(s.validate(&json!({"index": "http://x"}), Mode::Partial).is_empty());
    }

    #[test]
    fn unknown_and_server_fields_are_rejected() {
        let s = schema(entities::role());
        let errors = s.validate(&json!({"role": "a", "colour": "red", "id": 4}), Mode::Full);
        assert!(errors.has_field("colour"));
        assert!(errors.has_field("id"));
    }

    #[test]
    fn non_object_payload_is_invalid() {
        let s = schema(entities::role());
        assert!(!s.validate(&json!(["role"]), Mode::Full).is_empty());
    }

    #[test]
    fn enum_values_outside_the_set_are_rejected() {
        let s = schema(entities::account());
        let errors = s.validate(
            &json!({"username": "u", "password": "p", "status": "ASLEEP", "deleted": "MAYBE"}),
            Mode::Full,
        );
        assert!(errors.has_field("status"));
        assert!(errors.has_field("deleted"));
    }

    #[test]
    fn load_fills_defaults_and_uppercases_roles() {
        let s = schema(entities::role());
        let inst = s.load(&json!({"role": "admin"})).unwrap();
        assert_eq!(inst.get("role"), Some(&json!("ADMIN")));
        assert_eq!(inst.get("deleted"), Some(&json!("NO")));
        assert_eq!(inst.get("created_by"), Some(&json!(0)));
        assert!(inst.get("created_date").unwrap().is_string());
        assert!(inst.get("id").is_none());
    }

    #[test]
    fn absent_nullable_fields_load_as_null() {
        let apps = schema(entities::application());
        let inst = apps.load(&json!({"name": "n", "description": "d"})).unwrap();
        assert_eq!(inst.get("index"), Some(&Value::Null));
        assert_eq!(inst.get("api"), Some(&Value::Null));

        let accounts = schema(entities::account());
        let inst = accounts.load(&json!({"username": "u", "password": ""})).unwrap();
        assert_eq!(inst.get("verified_by"), Some(&Value::Null));
        assert!(inst.get("verified_date").unwrap().is_string());
    }

    #[test]
    fn load_hashes_passwords_but_keeps_empty_ones() {
        let s = schema(entities::account());
        let inst = s.load(&json!({"username": "alice", "password": "secret"})).unwrap();
        let stored = inst.get("password").unwrap().as_str().unwrap();
        assert_ne!(stored, "secret");
        assert!(entities::check_password(s.hasher(), &inst, "secret"));

        let empty = s.load(&json!({"username": "bob", "password": ""})).unwrap();
        assert_eq!(empty.get("password"), Some(&json!("")));
    }

    #[test]
    fn dump_omits_internal_fields() {
        let s = schema(entities::account());
        let mut inst = s.load(&json!({"username": "alice", "password": ""})).unwrap();
        inst.insert("id".into(), json!(3));
        let out = s.dump(&inst);
        assert_eq!(out["id"], json!(3));
        assert_eq!(out["username"], json!("alice"));
        assert!(out.get("password").is_none());
    }

    #[test]
    fn load_partial_only_carries_present_fields() {
        let s = schema(entities::account());
        let changes = s.load_partial(&json!({"wrong_attempt": "2"})).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("wrong_attempt"), Some(&json!(2)));
    }

    #[test]
    fn criteria_coerce_known_fields_only() {
        let s = schema(entities::account());
        let c = s.criteria(vec![
            ("user_id".to_string(), "5".to_string()),
            ("nope".to_string(), "5".to_string()),
        ]);
        assert_eq!(c, vec![("nope".to_string(), json!("5")), ("user_id".to_string(), json!(5))]);
    }

    #[test]
    fn invalid_patterns_fail_generation() {
        let d = EntityDescriptor::new("Bad", "bad", "bad")
            .field(FieldDescriptor::new("x", crate::model::FieldType::text(5)).pattern("(["));
        assert!(matches!(
            Schema::generate(Arc::new(d), Arc::new(Argon2Hasher)),
            Err(DescriptorError::InvalidPattern { .. })
        ));
    }
}
