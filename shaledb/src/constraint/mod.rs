// Pure validation rules over a value or a batch of entries. Constraints
// carry no mutable state and are composed externally by the caller per
// field before inserting -- the store never auto-invokes them.

use crate::container::Entry;
use crate::error::{Result, ShaleDbError};
use crate::field::{json_type_name, FieldType};
use serde_json::Value;
use std::collections::HashSet;

/// Validates that a value matches a declared field type.
#[derive(Debug, Clone)]
pub struct TypeConstraint {
    field_type: FieldType,
}

impl TypeConstraint {
    pub fn new(field_type: FieldType) -> Self {
        TypeConstraint { field_type }
    }

    pub fn validate(&self, value: &Value) -> bool {
        self.field_type.matches(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "type": self.field_type.tag() })
    }
}

/// Validates that a numeric value lies within `[minimum, maximum]`.
/// Non-numeric values are a type error, not a plain failure.
#[derive(Debug, Clone)]
pub struct RangeConstraint {
    minimum: f64,
    maximum: f64,
}

impl RangeConstraint {
    pub fn new(minimum: f64, maximum: f64) -> Self {
        RangeConstraint { minimum, maximum }
    }

    pub fn validate(&self, value: &Value) -> Result<bool> {
        let number = value.as_f64().ok_or_else(|| ShaleDbError::TypeMismatch {
            field: "range".to_string(),
            expected: "number".to_string(),
            actual: format!("{} ({})", json_type_name(value), value),
        })?;
        Ok(self.minimum <= number && number <= self.maximum)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "minimum": self.minimum, "maximum": self.maximum })
    }
}

/// Validates that a string matches a pattern anchored at its start.
#[derive(Debug, Clone)]
pub struct RegexConstraint {
    pattern: regex::Regex,
}

impl RegexConstraint {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(RegexConstraint {
            pattern: regex::Regex::new(pattern)?,
        })
    }

    pub fn validate(&self, value: &Value) -> Result<bool> {
        let text = value.as_str().ok_or_else(|| ShaleDbError::TypeMismatch {
            field: "regex".to_string(),
            expected: "string".to_string(),
            actual: json_type_name(value).to_string(),
        })?;
        // Anchored at the start only, not a full match.
        Ok(self
            .pattern
            .find(text)
            .map(|m| m.start() == 0)
            .unwrap_or(false))
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "pattern": self.pattern.as_str() })
    }
}

/// Validates membership in an enumerated set of allowed values.
#[derive(Debug, Clone)]
pub struct ChoiceConstraint {
    choices: Vec<Value>,
}

impl ChoiceConstraint {
    pub fn new(choices: Vec<Value>) -> Self {
        ChoiceConstraint { choices }
    }

    pub fn validate(&self, value: &Value) -> bool {
        self.choices.contains(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "choices": self.choices })
    }
}

/// Length of a value that supports length: string (characters), list, object.
fn length_of(value: &Value) -> Result<usize> {
    match value {
        Value::String(s) => Ok(s.chars().count()),
        Value::Array(a) => Ok(a.len()),
        Value::Object(o) => Ok(o.len()),
        other => Err(ShaleDbError::TypeMismatch {
            field: "length".to_string(),
            expected: "string, list or object".to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

/// Validates a lower bound on a value's length.
#[derive(Debug, Clone)]
pub struct MinLengthConstraint {
    length: usize,
}

impl MinLengthConstraint {
    pub fn new(length: usize) -> Self {
        MinLengthConstraint { length }
    }

    pub fn validate(&self, value: &Value) -> Result<bool> {
        Ok(length_of(value)? >= self.length)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "min_length": self.length })
    }
}

/// Validates an upper bound on a value's length.
#[derive(Debug, Clone)]
pub struct MaxLengthConstraint {
    length: usize,
}

impl MaxLengthConstraint {
    pub fn new(length: usize) -> Self {
        MaxLengthConstraint { length }
    }

    pub fn validate(&self, value: &Value) -> Result<bool> {
        Ok(length_of(value)? <= self.length)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "max_length": self.length })
    }
}

/// Validates that a value is not null.
#[derive(Debug, Clone, Default)]
pub struct NotNullConstraint;

impl NotNullConstraint {
    pub fn new() -> Self {
        NotNullConstraint
    }

    pub fn validate(&self, value: &Value) -> bool {
        !value.is_null()
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "not_null": true })
    }
}

/// Validates that a value is null.
#[derive(Debug, Clone, Default)]
pub struct IsNullConstraint;

impl IsNullConstraint {
    pub fn new() -> Self {
        IsNullConstraint
    }

    pub fn validate(&self, value: &Value) -> bool {
        value.is_null()
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "is_null": true })
    }
}

/// Validates that no two entries in a batch share a non-null value for a
/// field. Entries where the field is null or absent are ignored. The first
/// duplicate found short-circuits to failure.
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    field: String,
}

impl UniqueConstraint {
    pub fn new(field: impl Into<String>) -> Self {
        UniqueConstraint {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn validate(&self, entries: &[Entry]) -> bool {
        let mut seen: HashSet<String> = HashSet::new();
        for entry in entries {
            let value = match entry.get(&self.field) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            // JSON values are not hashable; the canonical serialization is.
            if !seen.insert(value.to_string()) {
                return false;
            }
        }
        true
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "unique": self.field })
    }
}

/// Validates that an entry carries a non-null value for a field.
#[derive(Debug, Clone)]
pub struct RequiredConstraint {
    field: String,
}

impl RequiredConstraint {
    pub fn new(field: impl Into<String>) -> Self {
        RequiredConstraint {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn validate(&self, entry: &Entry) -> bool {
        entry.get(&self.field).is_some_and(|v| !v.is_null())
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "required": self.field })
    }
}
