//! Field rule checks applied after coercion.

use crate::model::FieldDescriptor;
use regex::Regex;
use serde_json::Value;

/// Checks a coerced, non-null value against length, pattern, and range rules.
pub fn check_rules(field: &FieldDescriptor, v: &Value, pattern: Option<&Regex>) -> Option<String> {
    if v.is_null() {
        return None;
    }
    let rule = &field.rule;
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = field.max_length() {
            if len > max as usize {
                return Some(format!("Longer than maximum length {}.", max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Some(format!("Shorter than minimum length {}.", min));
            }
        }
        if let Some(re) = pattern {
            if !re.is_match(s) {
                return Some("String does not match expected pattern.".into());
            }
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Some(format!("Must be greater than or equal to {}.", min));
            }
        }
    }
    None
}
