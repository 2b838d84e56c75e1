//! Data schemas — the JSON-schema-like metadata attached to properties,
//! action inputs and event payloads.
//!
//! A [`DataSchema`] doubles as documentation (it is rendered verbatim into
//! descriptions) and as a validator. Validation covers the primitive type
//! table, numeric bounds, `multipleOf`, `enum` membership, `required` keys
//! and nested `properties` / `items`. Presentation-only keys (`title`,
//! `unit`, `@type`, `description`) never constrain data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

use crate::link::Link;

/// Primitive JSON type names accepted in the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl JsonType {
    /// Whether `value` belongs to this type.
    ///
    /// `integer` accepts any number without a fractional component, so
    /// `5.0` is an integer while `5.5` is not.
    #[must_use]
    pub fn matches(self, value: &JsonValue) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Number => value.is_number(),
            Self::Integer => match value {
                JsonValue::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            Self::String => value.is_string(),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
        })
    }
}

/// Reasons a value fails schema validation. `path` is a JSON pointer into
/// the validated value (`/` for the root).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("expected {expected} at {path}")]
    TypeMismatch { path: String, expected: JsonType },

    #[error("value at {path} is below the minimum of {minimum}")]
    BelowMinimum { path: String, minimum: Number },

    #[error("value at {path} is above the maximum of {maximum}")]
    AboveMaximum { path: String, maximum: Number },

    #[error("value at {path} is not a multiple of {multiple_of}")]
    NotMultipleOf { path: String, multiple_of: Number },

    #[error("value at {path} is not one of the allowed values")]
    NotInEnum { path: String },

    #[error("missing required property {property} at {path}")]
    MissingRequired { path: String, property: String },
}

/// Schema metadata for a property, an action input or an event payload.
///
/// Unknown keys are kept in [`extra`](Self::extra) so descriptions render
/// exactly what was declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSchema {
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none", default)]
    pub at_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub json_type: Option<JsonType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub maximum: Option<Number>,
    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none", default)]
    pub multiple_of: Option<Number>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none", default)]
    pub enumeration: Option<Vec<JsonValue>>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none", default)]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub properties: Option<BTreeMap<String, DataSchema>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub items: Option<Box<DataSchema>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub links: Option<Vec<Link>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl DataSchema {
    /// Schema constraining values to a primitive type.
    #[must_use]
    pub fn new(json_type: JsonType) -> Self {
        Self {
            json_type: Some(json_type),
            ..Self::default()
        }
    }

    /// Schema without a type constraint (accepts anything).
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_at_type(mut self, at_type: impl Into<String>) -> Self {
        self.at_type = Some(at_type.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_minimum(mut self, minimum: impl Into<Number>) -> Self {
        self.minimum = Some(minimum.into());
        self
    }

    #[must_use]
    pub fn with_maximum(mut self, maximum: impl Into<Number>) -> Self {
        self.maximum = Some(maximum.into());
        self
    }

    #[must_use]
    pub fn with_multiple_of(mut self, multiple_of: impl Into<Number>) -> Self {
        self.multiple_of = Some(multiple_of.into());
        self
    }

    #[must_use]
    pub fn with_enum(mut self, values: impl IntoIterator<Item = JsonValue>) -> Self {
        self.enumeration = Some(values.into_iter().collect());
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = Some(true);
        self
    }

    /// Declare a nested object property; `required` adds it to the
    /// `required` list.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, schema: Self, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.get_or_insert_with(Vec::new).push(name.clone());
        }
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name, schema);
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: Self) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Whether writes must be refused.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }

    /// Copy of the schema with presentation-only keys (`title`, `unit`,
    /// `@type`) removed from every nested schema.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut schema = self.clone();
        if let Some(properties) = schema.properties.as_mut() {
            for nested in properties.values_mut() {
                *nested = nested.sanitized();
                nested.title = None;
                nested.unit = None;
                nested.at_type = None;
            }
        }
        if let Some(items) = schema.items.as_mut() {
            let mut nested = items.sanitized();
            nested.title = None;
            nested.unit = None;
            nested.at_type = None;
            **items = nested;
        }
        schema
    }

    /// Check `value` against every data constraint of the schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] encountered.
    pub fn validate(&self, value: &JsonValue) -> Result<(), SchemaError> {
        self.validate_at("/", value)
    }

    fn validate_at(&self, path: &str, value: &JsonValue) -> Result<(), SchemaError> {
        if let Some(expected) = self.json_type {
            if !expected.matches(value) {
                return Err(SchemaError::TypeMismatch {
                    path: path.to_string(),
                    expected,
                });
            }
        }

        if let Some(n) = value.as_f64() {
            self.validate_number(path, n)?;
        }

        if let Some(allowed) = &self.enumeration {
            if !allowed.iter().any(|candidate| json_eq(candidate, value)) {
                return Err(SchemaError::NotInEnum {
                    path: path.to_string(),
                });
            }
        }

        if let JsonValue::Object(map) = value {
            for name in self.required.iter().flatten() {
                if !map.contains_key(name) {
                    return Err(SchemaError::MissingRequired {
                        path: path.to_string(),
                        property: name.clone(),
                    });
                }
            }
            for (name, nested) in self.properties.iter().flatten() {
                if let Some(child) = map.get(name) {
                    nested.validate_at(&child_path(path, name), child)?;
                }
            }
        }

        if let (Some(items), JsonValue::Array(values)) = (&self.items, value) {
            for (index, child) in values.iter().enumerate() {
                items.validate_at(&child_path(path, &index.to_string()), child)?;
            }
        }

        Ok(())
    }

    fn validate_number(&self, path: &str, n: f64) -> Result<(), SchemaError> {
        if let Some(minimum) = &self.minimum {
            if minimum.as_f64().is_some_and(|min| n < min) {
                return Err(SchemaError::BelowMinimum {
                    path: path.to_string(),
                    minimum: minimum.clone(),
                });
            }
        }
        if let Some(maximum) = &self.maximum {
            if maximum.as_f64().is_some_and(|max| n > max) {
                return Err(SchemaError::AboveMaximum {
                    path: path.to_string(),
                    maximum: maximum.clone(),
                });
            }
        }
        if let Some(multiple_of) = &self.multiple_of {
            if let Some(step) = multiple_of.as_f64().filter(|step| *step > 0.0) {
                let quotient = n / step;
                if (quotient - quotient.round()).abs() > 1e-9 {
                    return Err(SchemaError::NotMultipleOf {
                        path: path.to_string(),
                        multiple_of: multiple_of.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Metadata of an action type: presentation keys plus an optional input
/// schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none", default)]
    pub at_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input: Option<DataSchema>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub links: Option<Vec<Link>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ActionMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_at_type(mut self, at_type: impl Into<String>) -> Self {
        self.at_type = Some(at_type.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: DataSchema) -> Self {
        self.input = Some(input);
        self
    }

    /// Check an action input against the declared schema, ignoring
    /// presentation-only keys. Actions without an input schema accept
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] encountered.
    pub fn validate_input(&self, input: &JsonValue) -> Result<(), SchemaError> {
        match &self.input {
            Some(schema) => schema.sanitized().validate(input),
            None => Ok(()),
        }
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent == "/" {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`).
#[allow(clippy::float_cmp)]
pub(crate) fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (JsonValue::Object(xs), JsonValue::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fade_input() -> DataSchema {
        DataSchema::new(JsonType::Object)
            .with_property(
                "level",
                DataSchema::new(JsonType::Integer)
                    .with_minimum(0)
                    .with_maximum(100)
                    .with_unit("percent"),
                true,
            )
            .with_property(
                "duration",
                DataSchema::new(JsonType::Integer)
                    .with_minimum(1)
                    .with_unit("milliseconds"),
                true,
            )
    }

    #[test]
    fn should_check_every_primitive_type() {
        assert!(JsonType::Null.matches(&json!(null)));
        assert!(JsonType::Boolean.matches(&json!(false)));
        assert!(JsonType::Object.matches(&json!({})));
        assert!(JsonType::Array.matches(&json!([])));
        assert!(JsonType::Number.matches(&json!(1.5)));
        assert!(JsonType::String.matches(&json!("on")));
        assert!(!JsonType::String.matches(&json!(1)));
        assert!(!JsonType::Boolean.matches(&json!("true")));
    }

    #[test]
    fn should_accept_integer_without_fractional_part() {
        assert!(JsonType::Integer.matches(&json!(5)));
        assert!(JsonType::Integer.matches(&json!(5.0)));
        assert!(JsonType::Integer.matches(&json!(-3)));
        assert!(!JsonType::Integer.matches(&json!(5.5)));
    }

    #[test]
    fn should_reject_value_below_minimum() {
        let schema = DataSchema::new(JsonType::Integer).with_minimum(0);
        let err = schema.validate(&json!(-1)).unwrap_err();
        assert!(matches!(err, SchemaError::BelowMinimum { .. }));
    }

    #[test]
    fn should_reject_value_above_maximum() {
        let schema = DataSchema::new(JsonType::Integer).with_maximum(100);
        assert!(schema.validate(&json!(100)).is_ok());
        let err = schema.validate(&json!(101)).unwrap_err();
        assert!(matches!(err, SchemaError::AboveMaximum { .. }));
    }

    #[test]
    fn should_reject_value_not_multiple_of_step() {
        let schema = DataSchema::new(JsonType::Number).with_multiple_of(5);
        assert!(schema.validate(&json!(15)).is_ok());
        assert!(matches!(
            schema.validate(&json!(12)),
            Err(SchemaError::NotMultipleOf { .. })
        ));
    }

    #[test]
    fn should_check_enum_membership_with_numeric_equality() {
        let schema = DataSchema::any().with_enum([json!(1), json!("auto")]);
        assert!(schema.validate(&json!(1.0)).is_ok());
        assert!(schema.validate(&json!("auto")).is_ok());
        assert!(matches!(
            schema.validate(&json!("manual")),
            Err(SchemaError::NotInEnum { .. })
        ));
    }

    #[test]
    fn should_accept_anything_when_type_is_absent() {
        let schema = DataSchema::any();
        assert!(schema.validate(&json!(null)).is_ok());
        assert!(schema.validate(&json!({"a": [1, 2]})).is_ok());
    }

    #[test]
    fn should_report_missing_required_property() {
        let err = fade_input().validate(&json!({"level": 50})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingRequired {
                path: "/".to_string(),
                property: "duration".to_string(),
            }
        );
    }

    #[test]
    fn should_report_nested_path_when_nested_value_is_invalid() {
        let err = fade_input()
            .validate(&json!({"level": 150, "duration": 10}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::AboveMaximum { path, .. } if path == "/level"));
    }

    #[test]
    fn should_validate_array_items() {
        let schema = DataSchema::new(JsonType::Array).with_items(DataSchema::new(JsonType::String));
        assert!(schema.validate(&json!(["a", "b"])).is_ok());
        let err = schema.validate(&json!(["a", 2])).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { path, .. } if path == "/1"));
    }

    #[test]
    fn should_strip_presentation_keys_from_nested_schemas_when_sanitized() {
        let schema = fade_input().with_title("Fade");
        let sanitized = schema.sanitized();

        assert_eq!(sanitized.title.as_deref(), Some("Fade"));
        let level = &sanitized.properties.as_ref().unwrap()["level"];
        assert!(level.unit.is_none());
        assert_eq!(level.maximum, Some(Number::from(100)));
    }

    #[test]
    fn should_render_declared_keys_with_wire_names() {
        let schema = DataSchema::new(JsonType::Integer)
            .with_at_type("BrightnessProperty")
            .with_minimum(0)
            .read_only();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            json!({
                "@type": "BrightnessProperty",
                "type": "integer",
                "minimum": 0,
                "readOnly": true
            })
        );
    }

    #[test]
    fn should_validate_action_input_against_declared_schema() {
        let metadata = ActionMetadata::new().with_title("Fade").with_input(fade_input());
        assert!(metadata.validate_input(&json!({"level": 50, "duration": 10})).is_ok());
        assert!(metadata.validate_input(&json!({"level": 150, "duration": 10})).is_err());
        assert!(metadata.validate_input(&json!({"level": 50, "duration": 0})).is_err());
    }

    #[test]
    fn should_accept_any_input_when_action_declares_none() {
        let metadata = ActionMetadata::new();
        assert!(metadata.validate_input(&JsonValue::Null).is_ok());
        assert!(metadata.validate_input(&json!({"x": 1})).is_ok());
    }

    #[test]
    fn should_keep_unknown_keys_when_deserialized() {
        let schema: DataSchema =
            serde_json::from_value(json!({"type": "string", "format": "uri"})).unwrap();
        assert_eq!(schema.json_type, Some(JsonType::String));
        assert_eq!(schema.extra.get("format"), Some(&json!("uri")));
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({"type": "string", "format": "uri"})
        );
    }
}
