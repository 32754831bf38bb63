//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from an entity descriptor.

use crate::model::{EntityDescriptor, Instance, ID_FIELD};
use serde_json::Value;

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Placeholder with a cast to the column type when the column is declared.
    fn placeholder(&mut self, entity: &EntityDescriptor, col: &str, v: Value) -> String {
        let n = self.push_param(v);
        entity
            .get(col)
            .map(|f| format!("${}::{}", n, f.field_type.pg_type()))
            .unwrap_or_else(|| format!("${}", n))
    }
}

fn select_column_list(entity: &EntityDescriptor) -> String {
    entity
        .fields
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// WHERE clause for exact-match criteria. Names are quoted but not checked against the
/// descriptor, so an unknown column surfaces as a database error.
fn where_clause(q: &mut QueryBuf, entity: &EntityDescriptor, filters: &[(String, Value)]) -> String {
    let parts: Vec<String> = filters
        .iter()
        .map(|(col, val)| {
            if val.is_null() {
                format!("{} IS NULL", quoted(col))
            } else {
                let ph = q.placeholder(entity, col, val.clone());
                format!("{} = {}", quoted(col), ph)
            }
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key. Caller binds id as the sole param.
pub fn select_by_id(entity: &EntityDescriptor) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_column_list(entity),
        quoted(&entity.table),
        quoted(ID_FIELD)
    );
    q
}

/// SELECT with exact-match filters, ORDER BY id, optional LIMIT/OFFSET.
pub fn select_list(
    entity: &EntityDescriptor,
    filters: &[(String, Value)],
    limit: Option<u64>,
    offset: Option<u64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, entity, filters);
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}{}",
        select_column_list(entity),
        quoted(&entity.table),
        where_clause,
        quoted(ID_FIELD),
        limit_clause,
        offset_clause
    );
    q
}

pub fn select_count(entity: &EntityDescriptor, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, entity, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&entity.table), where_clause);
    q
}

/// INSERT every declared column present in `values`; id is left to the identity column.
pub fn insert(entity: &EntityDescriptor, values: &Instance) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in &entity.fields {
        if f.server_assigned {
            continue;
        }
        let Some(v) = values.get(&f.name) else { continue };
        placeholders.push(q.placeholder(entity, &f.name, v.clone()));
        cols.push(quoted(&f.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&entity.table),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity)
    );
    q
}

/// UPDATE by id: SET only declared, non-server columns present in `changes`.
pub fn update(entity: &EntityDescriptor, id: i64, changes: &Instance) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in &entity.fields {
        if f.server_assigned {
            continue;
        }
        let Some(v) = changes.get(&f.name) else { continue };
        let rhs = q.placeholder(entity, &f.name, v.clone());
        sets.push(format!("{} = {}", quoted(&f.name), rhs));
    }
    let returning = select_column_list(entity);
    if sets.is_empty() {
        let n = q.push_param(Value::from(id));
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = ${}",
            returning,
            quoted(&entity.table),
            quoted(ID_FIELD),
            n
        );
        return q;
    }
    let id_param = q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        quoted(&entity.table),
        sets.join(", "),
        quoted(ID_FIELD),
        id_param,
        returning
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &EntityDescriptor, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1 RETURNING {}",
        quoted(&entity.table),
        quoted(ID_FIELD),
        quoted(ID_FIELD)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entities;
    use serde_json::json;

    #[test]
    fn list_casts_known_columns_and_quotes_unknown_ones() {
        let e = entities::account();
        let q = select_list(
            &e,
            &[("status".into(), json!("ACTIVE")), ("bogus".into(), json!("x"))],
            Some(2),
            Some(4),
        );
        assert!(q.sql.contains(r#""status" = $1::text"#));
        assert!(q.sql.contains(r#""bogus" = $2"#));
        assert!(q.sql.ends_with(r#"ORDER BY "id" LIMIT 2 OFFSET 4"#));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn insert_skips_id_and_absent_columns() {
        let e = entities::role();
        let mut values = Instance::new();
        values.insert("role".into(), json!("ADMIN"));
        values.insert("created_by".into(), json!(0));
        let q = insert(&e, &values);
        assert!(q.sql.starts_with(r#"INSERT INTO "roles" ("role", "created_by") VALUES ($1::varchar(30), $2::bigint)"#));
        assert!(!q.sql.contains(r#"("id""#));
    }

    #[test]
    fn update_binds_id_last() {
        let e = entities::role();
        let mut changes = Instance::new();
        changes.insert("role".into(), json!("USER"));
        let q = update(&e, 9, &changes);
        assert!(q.sql.contains(r#"WHERE "id" = $2"#));
        assert_eq!(q.params, vec![json!("USER"), json!(9)]);
    }

    #[test]
    fn null_criteria_use_is_null() {
        let e = entities::account();
        let q = select_count(&e, &[("verified_by".into(), Value::Null)]);
        assert_eq!(q.sql, r#"SELECT COUNT(*) FROM "accounts" WHERE "verified_by" IS NULL"#);
        assert!(q.params.is_empty());
    }
}
