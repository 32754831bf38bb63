//! Default-instance synthesis: a zero-identity placeholder per entity type.
//!
//! The placeholder is never persisted; it only carries the generated schema and
//! route table for its type during startup binding.

use crate::error::DescriptorError;
use crate::model::{EntityDescriptor, FieldDescriptor, FieldType, Instance};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct DefaultInstance {
    descriptor: Arc<EntityDescriptor>,
    values: Instance,
}

impl DefaultInstance {
    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    pub fn values(&self) -> &Instance {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

/// Builds the placeholder: declared default or generator first, then the type fallback.
pub fn synthesize(descriptor: Arc<EntityDescriptor>) -> Result<DefaultInstance, DescriptorError> {
    let mut values = Instance::new();
    for field in &descriptor.fields {
        let value = default_for(&descriptor, field)?;
        values.insert(field.name.clone(), value);
    }
    Ok(DefaultInstance { descriptor, values })
}

/// Default value of a single field, used by both synthesis and payload loading.
pub(crate) fn default_for(
    descriptor: &EntityDescriptor,
    field: &FieldDescriptor,
) -> Result<Value, DescriptorError> {
    if let Some(default) = &field.default {
        return Ok(default.produce());
    }
    match type_fallback(&field.field_type) {
        Some(v) if !v.is_null() || field.nullable => Ok(v),
        _ if field.nullable => Ok(Value::Null),
        _ => Err(DescriptorError::MissingDefault {
            entity: descriptor.name.clone(),
            field: field.name.clone(),
        }),
    }
}

fn type_fallback(field_type: &FieldType) -> Option<Value> {
    match field_type {
        FieldType::Integer => Some(Value::from(0)),
        FieldType::Float => Some(Value::from(0.0)),
        FieldType::Text { .. } => Some(Value::String(String::new())),
        FieldType::Boolean => Some(Value::Bool(false)),
        FieldType::DateTime => Some(Value::Null),
        FieldType::Enum(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{entities, FieldDescriptor, ID_FIELD};

    #[test]
    fn shipped_entities_synthesize_without_nulls_in_required_columns() {
        for d in entities::descriptors() {
            let d = Arc::new(d);
            let inst = synthesize(d.clone()).expect("synthesis");
            for f in &d.fields {
                let v = inst.get(&f.name).expect("every field present");
                if !f.nullable {
                    assert!(!v.is_null(), "{}.{} is null", d.name, f.name);
                }
            }
            assert_eq!(inst.get(ID_FIELD), Some(&Value::from(0)));
        }
    }

    #[test]
    fn type_fallbacks_apply_without_declared_defaults() {
        let d = Arc::new(
            EntityDescriptor::new("Sample", "samples", "sample")
                .field(FieldDescriptor::new("count", FieldType::Integer))
                .field(FieldDescriptor::new("ratio", FieldType::Float))
                .field(FieldDescriptor::new("label", FieldType::text(10)))
                .field(FieldDescriptor::new("flag", FieldType::Boolean))
                .field(FieldDescriptor::new("seen_at", FieldType::DateTime).nullable()),
        );
        let inst = synthesize(d).unwrap();
        assert_eq!(inst.get("count"), Some(&Value::from(0)));
        assert_eq!(inst.get("ratio"), Some(&Value::from(0.0)));
        assert_eq!(inst.get("label"), Some(&Value::from("")));
        assert_eq!(inst.get("flag"), Some(&Value::Bool(false)));
        assert_eq!(inst.get("seen_at"), Some(&Value::Null));
    }

    #[test]
    fn generators_are_invoked() {
        fn seven() -> Value {
            Value::from(7)
        }
        let d = Arc::new(
            EntityDescriptor::new("Sample", "samples", "sample")
                .field(FieldDescriptor::new("n", FieldType::Integer).default_with(seven)),
        );
        assert_eq!(synthesize(d).unwrap().get("n"), Some(&Value::from(7)));
    }

    #[test]
    fn enum_without_default_is_missing_default() {
        let d = Arc::new(
            EntityDescriptor::new("Sample", "samples", "sample")
                .field(FieldDescriptor::new("kind", FieldType::Enum(&["A", "B"]))),
        );
        match synthesize(d) {
            Err(DescriptorError::MissingDefault { entity, field }) => {
                assert_eq!(entity, "Sample");
                assert_eq!(field, "kind");
            }
            other => panic!("expected MissingDefault, got {:?}", other),
        }
    }

    #[test]
    fn non_nullable_datetime_without_generator_is_missing_default() {
        let d = Arc::new(
            EntityDescriptor::new("Sample", "samples", "sample")
                .field(FieldDescriptor::new("stamp", FieldType::DateTime)),
        );
        let err = synthesize(d).unwrap_err();
        assert!(err.to_string().contains("stamp"));
    }
}
