//! Type coercion from JSON payloads and query strings to canonical instance values.

use crate::model::{FieldDescriptor, FieldType};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Canonical value for `field`, or the message explaining why it is not acceptable.
pub fn coerce(field: &FieldDescriptor, value: &Value) -> Result<Value, String> {
    if value.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err("Field may not be null.".into())
        };
    }
    match &field.field_type {
        FieldType::Integer => coerce_integer(value).ok_or_else(|| "Not a valid integer.".into()),
        FieldType::Float => coerce_float(value).ok_or_else(|| "Not a valid number.".into()),
        FieldType::Text { .. } => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err("Not a valid string.".into()),
        },
        FieldType::Boolean => coerce_bool(value).ok_or_else(|| "Not a valid boolean.".into()),
        FieldType::DateTime => match value.as_str().and_then(parse_datetime) {
            Some(dt) => Ok(Value::String(dt.to_rfc3339())),
            None => Err("Not a valid datetime.".into()),
        },
        FieldType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Ok(Value::String(s.to_string())),
            _ => Err(format!("Invalid {} value: {}", field.name, display(value))),
        },
    }
}

/// Query-string form of `coerce`; unparseable input is kept as text for the store to judge.
pub fn coerce_query(field: &FieldDescriptor, raw: &str) -> Value {
    let as_json = Value::String(raw.to_string());
    coerce(field, &as_json).unwrap_or(as_json)
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_i64().map(Value::from),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<Value> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    serde_json::Number::from_f64(n).map(Value::Number)
}

fn coerce_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|naive| naive.and_utc())
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::YES_NO;
    use serde_json::json;

    fn field(t: FieldType) -> FieldDescriptor {
        FieldDescriptor::new("f", t)
    }

    #[test]
    fn integers_accept_numbers_and_numeric_strings() {
        let f = field(FieldType::Integer);
        assert_eq!(coerce(&f, &json!(5)), Ok(json!(5)));
        assert_eq!(coerce(&f, &json!(" 12 ")), Ok(json!(12)));
        assert!(coerce(&f, &json!(1.5)).is_err());
        assert!(coerce(&f, &json!("abc")).is_err());
        assert!(coerce(&f, &json!(true)).is_err());
    }

    #[test]
    fn null_depends_on_nullability() {
        assert!(coerce(&field(FieldType::Integer), &Value::Null).is_err());
        assert_eq!(
            coerce(&field(FieldType::Integer).nullable(), &Value::Null),
            Ok(Value::Null)
        );
    }

    #[test]
    fn enums_reject_unknown_labels() {
        let f = FieldDescriptor::new("deleted", FieldType::Enum(YES_NO));
        assert_eq!(coerce(&f, &json!("YES")), Ok(json!("YES")));
        assert_eq!(
            coerce(&f, &json!("MAYBE")),
            Err("Invalid deleted value: MAYBE".to_string())
        );
    }

    #[test]
    fn datetimes_normalise_to_utc_rfc3339() {
        let f = field(FieldType::DateTime);
        let v = coerce(&f, &json!("2024-03-01T10:00:00+02:00")).unwrap();
        assert_eq!(v, json!("2024-03-01T08:00:00+00:00"));
        let naive = coerce(&f, &json!("2024-03-01T10:00:00")).unwrap();
        assert_eq!(naive, json!("2024-03-01T10:00:00+00:00"));
        assert!(coerce(&f, &json!("yesterday")).is_err());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let f = field(FieldType::Boolean);
        assert_eq!(coerce(&f, &json!("TRUE")), Ok(json!(true)));
        assert_eq!(coerce(&f, &json!(0)), Ok(json!(false)));
        assert!(coerce(&f, &json!("yes")).is_err());
    }

    #[test]
    fn query_values_fall_back_to_text() {
        let f = field(FieldType::Integer);
        assert_eq!(coerce_query(&f, "7"), json!(7));
        assert_eq!(coerce_query(&f, "seven"), json!("seven"));
    }
}
