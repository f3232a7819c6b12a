// Typed field model: declarative, nullable field declarations with a closed
// set of scalar type tags. Fields never touch the entry store directly --
// callers validate values against fields before inserting.

use crate::error::{Result, ShaleDbError};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Closed set of field type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    String,
    Date,
    Datetime,
    Time,
    Decimal,
    Dictionary,
    List,
    Tuple,
    Set,
    FrozenSet,
    FrozenDict,
    Path,
    Regex,
    Uuid,
    Null,
    Custom,
}

impl FieldType {
    /// The tag name used in error messages and serialized definitions.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Time => "time",
            FieldType::Decimal => "decimal",
            FieldType::Dictionary => "dictionary",
            FieldType::List => "list",
            FieldType::Tuple => "tuple",
            FieldType::Set => "set",
            FieldType::FrozenSet => "frozen_set",
            FieldType::FrozenDict => "frozen_dict",
            FieldType::Path => "path",
            FieldType::Regex => "regex",
            FieldType::Uuid => "uuid",
            FieldType::Null => "null",
            FieldType::Custom => "custom",
        }
    }

    /// Whether a JSON value matches this type tag. String-encoded scalar
    /// types (dates, decimals, uuids, patterns) are format-checked, not just
    /// type-checked.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::String => value.is_string(),
            FieldType::Date => value
                .as_str()
                .is_some_and(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            FieldType::Datetime => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            FieldType::Time => value.as_str().is_some_and(|s| {
                chrono::NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
                    || chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
            }),
            FieldType::Decimal => {
                value.is_number()
                    || value.as_str().is_some_and(|s| BigDecimal::from_str(s).is_ok())
            }
            FieldType::Dictionary | FieldType::FrozenDict => value.is_object(),
            FieldType::List | FieldType::Tuple | FieldType::Set | FieldType::FrozenSet => {
                value.is_array()
            }
            FieldType::Path => value.as_str().is_some_and(|s| !s.is_empty()),
            FieldType::Regex => value.as_str().is_some_and(|s| regex::Regex::new(s).is_ok()),
            FieldType::Uuid => value.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),
            FieldType::Null => value.is_null(),
            FieldType::Custom => true,
        }
    }
}

/// Describe a JSON value's own type, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// A typed, nullable field declaration: `(name, type tag, default, nullable)`
/// plus the currently held value. The declaration itself is immutable after
/// construction; the held value mutates only through [`Field::set`], which
/// re-validates the type on every assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    default: Value,
    nullable: bool,
    value: Value,
}

impl Field {
    /// Create a field declaration. The default value is validated against
    /// the declared type and becomes the initial held value.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        default: Value,
        nullable: bool,
    ) -> Result<Self> {
        let mut field = Field {
            name: name.into(),
            field_type,
            default: default.clone(),
            nullable,
            value: Value::Null,
        };
        field.set(default)?;
        Ok(field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn get(&self) -> &Value {
        &self.value
    }

    /// Assign a value, re-validating the declared type. Null is accepted
    /// only for nullable fields. Violations raise synchronously; there is no
    /// collect-all mode for fields.
    pub fn set(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            if self.nullable {
                self.value = value;
                return Ok(());
            }
            return Err(ShaleDbError::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.tag().to_string(),
                actual: "null".to_string(),
            });
        }
        if !self.field_type.matches(&value) {
            return Err(ShaleDbError::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.tag().to_string(),
                actual: format!("{} ({})", json_type_name(&value), value),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Serialized declaration form, for embedding in a table definition.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "type": self.field_type.tag(),
            "default": self.default,
            "nullable": self.nullable,
            "value": self.value,
        })
    }

    /// Rebuild a field from its serialized declaration form.
    pub fn from_value(value: &Value) -> Result<Self> {
        let field: Field = serde_json::from_value(value.clone())?;
        // Re-validate, the serialized form is not trusted.
        let mut rebuilt = Field::new(
            field.name,
            field.field_type,
            field.default,
            field.nullable,
        )?;
        rebuilt.set(field.value)?;
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_valid_value() {
        let mut field = Field::new("age", FieldType::Integer, Value::Null, true).unwrap();
        field.set(json!(42)).unwrap();
        assert_eq!(field.get(), &json!(42));
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut field = Field::new("age", FieldType::Integer, Value::Null, true).unwrap();
        let err = field.set(json!("forty-two")).unwrap_err();
        match err {
            ShaleDbError::TypeMismatch { field, expected, .. } => {
                assert_eq!(field, "age");
                assert_eq!(expected, "integer");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
        // Failed set leaves the previous value in place.
        assert_eq!(field.get(), &Value::Null);
    }

    #[test]
    fn test_null_rejected_when_not_nullable() {
        let mut field = Field::new("name", FieldType::String, json!("anonymous"), false).unwrap();
        assert!(field.set(Value::Null).is_err());
        assert_eq!(field.get(), &json!("anonymous"));
    }

    #[test]
    fn test_non_nullable_default_validated_at_construction() {
        let result = Field::new("name", FieldType::String, Value::Null, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_date_field_format_checked() {
        let mut field = Field::new("born", FieldType::Date, Value::Null, true).unwrap();
        field.set(json!("1999-12-31")).unwrap();
        assert!(field.set(json!("31/12/1999")).is_err());
        assert!(field.set(json!(19991231)).is_err());
    }

    #[test]
    fn test_datetime_and_time_fields() {
        let mut dt = Field::new("at", FieldType::Datetime, Value::Null, true).unwrap();
        dt.set(json!("2025-06-01T12:00:00Z")).unwrap();
        assert!(dt.set(json!("2025-06-01")).is_err());

        let mut t = Field::new("when", FieldType::Time, Value::Null, true).unwrap();
        t.set(json!("23:59:59")).unwrap();
        t.set(json!("23:59:59.125")).unwrap();
        assert!(t.set(json!("25:00:00")).is_err());
    }

    #[test]
    fn test_decimal_field_accepts_numbers_and_decimal_strings() {
        let mut field = Field::new("price", FieldType::Decimal, Value::Null, true).unwrap();
        field.set(json!(19.99)).unwrap();
        field.set(json!("123456789.000000001")).unwrap();
        assert!(field.set(json!("not a number")).is_err());
    }

    #[test]
    fn test_uuid_and_regex_fields() {
        let mut id = Field::new("id", FieldType::Uuid, Value::Null, true).unwrap();
        id.set(json!(uuid::Uuid::new_v4().to_string())).unwrap();
        assert!(id.set(json!("not-a-uuid")).is_err());

        let mut pat = Field::new("pattern", FieldType::Regex, Value::Null, true).unwrap();
        pat.set(json!("^[a-z]+$")).unwrap();
        assert!(pat.set(json!("([unclosed")).is_err());
    }

    #[test]
    fn test_collection_field_types() {
        let mut items = Field::new("items", FieldType::List, Value::Null, true).unwrap();
        items.set(json!([1, 2, 3])).unwrap();
        assert!(items.set(json!({"a": 1})).is_err());

        let mut attrs = Field::new("attrs", FieldType::Dictionary, Value::Null, true).unwrap();
        attrs.set(json!({"a": 1})).unwrap();
        assert!(attrs.set(json!([1])).is_err());
    }

    #[test]
    fn test_declaration_round_trip() {
        let mut field = Field::new("email", FieldType::String, Value::Null, true).unwrap();
        field.set(json!("a@b.c")).unwrap();

        let restored = Field::from_value(&field.to_value()).unwrap();
        assert_eq!(restored.name(), "email");
        assert_eq!(restored.field_type(), FieldType::String);
        assert_eq!(restored.get(), &json!("a@b.c"));
    }

    #[test]
    fn test_custom_field_accepts_anything() {
        let mut field = Field::new("blob", FieldType::Custom, Value::Null, true).unwrap();
        field.set(json!({"nested": [1, "two", null]})).unwrap();
        field.set(json!(true)).unwrap();
    }
}
