//! Entity descriptors: statically declared fields, type tags, defaults, and rules.

use chrono::Utc;
use serde_json::{Map, Value};

/// A concrete row: field name to JSON-typed value.
pub type Instance = Map<String, Value>;

/// Callable default, invoked each time a default is needed.
pub type DefaultGenerator = fn() -> Value;

/// Primary key column shared by every entity.
pub const ID_FIELD: &str = "id";

/// Reference sentinel meaning "system / unauthenticated".
pub const SYSTEM_ACTOR: i64 = 0;

/// Type tag of a field. Drives coercion, fallbacks, and column DDL.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Integer,
    Float,
    Text { max_length: Option<u32> },
    Boolean,
    DateTime,
    Enum(&'static [&'static str]),
}

impl FieldType {
    pub fn text(max_length: u32) -> Self {
        FieldType::Text {
            max_length: Some(max_length),
        }
    }

    /// Short tag used in introspection output.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Text { .. } => "text",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
            FieldType::Enum(_) => "enum",
        }
    }

    /// PostgreSQL type used for DDL and parameter casts.
    pub fn pg_type(&self) -> String {
        match self {
            FieldType::Integer => "bigint".into(),
            FieldType::Float => "double precision".into(),
            FieldType::Text { max_length: Some(n) } => format!("varchar({})", n),
            FieldType::Text { max_length: None } => "text".into(),
            FieldType::Boolean => "boolean".into(),
            FieldType::DateTime => "timestamptz".into(),
            FieldType::Enum(_) => "text".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum FieldDefault {
    Value(Value),
    Generator(DefaultGenerator),
}

impl FieldDefault {
    pub fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Generator(f) => f(),
        }
    }
}

/// Value rewrite applied when a payload is loaded into an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    Uppercase,
    /// One-way hash through the hashing collaborator; empty input stays empty.
    PasswordHash,
}

/// Foreign key to another entity's id; `sentinel` is accepted without a lookup.
#[derive(Clone, Debug)]
pub struct Reference {
    pub table: String,
    pub sentinel: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub min_length: Option<u32>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub default: Option<FieldDefault>,
    pub rule: ValidationRule,
    pub references: Option<Reference>,
    pub transform: Option<Transform>,
    /// Never included in dumped output (e.g. password hashes).
    pub internal: bool,
    pub unique: bool,
    pub indexed: bool,
    /// Assigned by the store; rejected in payloads.
    pub server_assigned: bool,
}

impl FieldDescriptor {
    /// Non-nullable field with no default.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            field_type,
            nullable: false,
            default: None,
            rule: ValidationRule::default(),
            references: None,
            transform: None,
            internal: false,
            unique: false,
            indexed: false,
            server_assigned: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.rule.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Value(value));
        self
    }

    pub fn default_with(mut self, generator: DefaultGenerator) -> Self {
        self.default = Some(FieldDefault::Generator(generator));
        self
    }

    pub fn references(mut self, table: &str, sentinel: Option<i64>) -> Self {
        self.references = Some(Reference {
            table: table.to_string(),
            sentinel,
        });
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.rule.pattern = Some(pattern.to_string());
        self
    }

    pub fn min_length(mut self, n: u32) -> Self {
        self.rule.min_length = Some(n);
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.rule.minimum = Some(n);
        self
    }

    pub fn max_length(&self) -> Option<u32> {
        match self.field_type {
            FieldType::Text { max_length } => max_length,
            _ => None,
        }
    }

    /// Must appear in a create payload.
    pub fn is_required(&self) -> bool {
        if self.server_assigned {
            return false;
        }
        self.rule.required
    }
}

/// Declared shape of one entity type.
#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    /// Display name, e.g. "Account". Used in messages and as the route namespace.
    pub name: String,
    pub table: String,
    /// URL segment under the API base, e.g. "account".
    pub path_segment: String,
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Starts a descriptor with the store-assigned `id` field.
    pub fn new(name: &str, table: &str, path_segment: &str) -> Self {
        let mut id = FieldDescriptor::new(ID_FIELD, FieldType::Integer).default_value(Value::from(0));
        id.server_assigned = true;
        EntityDescriptor {
            name: name.to_string(),
            table: table.to_string(),
            path_segment: path_segment.to_string(),
            fields: vec![id],
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends the soft-delete flag and created/updated audit columns.
    pub fn with_audit_fields(self, account_table: &str) -> Self {
        self.field(
            FieldDescriptor::new("deleted", FieldType::Enum(YES_NO)).default_value(Value::from("NO")),
        )
        .field(
            FieldDescriptor::new("created_by", FieldType::Integer)
                .default_value(Value::from(SYSTEM_ACTOR))
                .references(account_table, Some(SYSTEM_ACTOR))
                .indexed(),
        )
        .field(FieldDescriptor::new("created_date", FieldType::DateTime).default_with(now))
        .field(
            FieldDescriptor::new("updated_by", FieldType::Integer)
                .default_value(Value::from(SYSTEM_ACTOR))
                .references(account_table, Some(SYSTEM_ACTOR))
                .indexed(),
        )
        .field(FieldDescriptor::new("updated_date", FieldType::DateTime).default_with(now))
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

pub const YES_NO: &[&str] = &["NO", "YES"];

/// Current UTC time in the canonical instance representation.
pub fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}
