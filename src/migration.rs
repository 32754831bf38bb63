//! Table DDL derived from entity descriptors: create-if-missing and drop-and-recreate.

use crate::model::{EntityDescriptor, FieldDescriptor, FieldType};
use crate::sql::quoted;
use serde_json::Value;

/// `CREATE TABLE IF NOT EXISTS` plus one index statement per indexed column.
pub fn create_table_statements(entity: &EntityDescriptor) -> Vec<String> {
    let mut col_defs: Vec<String> = entity.fields.iter().map(column_def).collect();
    for f in &entity.fields {
        if let FieldType::Enum(labels) = &f.field_type {
            let values: Vec<String> = labels.iter().map(|l| literal(l)).collect();
            col_defs.push(format!(
                "CONSTRAINT {} CHECK ({} IN ({}))",
                quoted(&format!("{}_{}_check", entity.table, f.name)),
                quoted(&f.name),
                values.join(", ")
            ));
        }
    }
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quoted(&entity.table),
        col_defs.join(", ")
    )];
    for f in entity.fields.iter().filter(|f| f.indexed && !f.unique) {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quoted(&format!("ix_{}_{}", entity.table, f.name)),
            quoted(&entity.table),
            quoted(&f.name)
        ));
    }
    statements
}

pub fn drop_table_statement(entity: &EntityDescriptor) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", quoted(&entity.table))
}

fn column_def(f: &FieldDescriptor) -> String {
    if f.server_assigned {
        return format!("{} BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY", quoted(&f.name));
    }
    let mut def = format!("{} {}", quoted(&f.name), f.field_type.pg_type());
    if !f.nullable {
        def.push_str(" NOT NULL");
    }
    if f.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(crate::model::FieldDefault::Value(v)) = &f.default {
        if let Some(lit) = default_literal(v) {
            def.push_str(" DEFAULT ");
            def.push_str(&lit);
        }
    }
    def
}

fn default_literal(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) => Some(literal(s)),
        _ => None,
    }
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
