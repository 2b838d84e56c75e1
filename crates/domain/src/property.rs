//! Property — a named, schema-described attribute of a thing.

use serde_json::Value as JsonValue;

use crate::error::{ValidationError, WebThingError};
use crate::link::Link;
use crate::schema::DataSchema;
use crate::value::Value;

/// Binds a [`Value`] to a name and a [`DataSchema`].
///
/// Writes are checked against the schema and the `readOnly` flag before the
/// value is touched, so a rejected write never partially applies.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    value: Value,
    metadata: DataSchema,
    href_prefix: String,
}

impl Property {
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value, metadata: DataSchema) -> Self {
        Self {
            name: name.into(),
            value,
            metadata,
            href_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing value cell.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn metadata(&self) -> &DataSchema {
        &self.metadata
    }

    /// Path of this property, relative to the server root.
    #[must_use]
    pub fn href(&self) -> String {
        format!("{}/properties/{}", self.href_prefix, self.name)
    }

    pub fn set_href_prefix(&mut self, prefix: impl Into<String>) {
        self.href_prefix = prefix.into();
    }

    #[must_use]
    pub fn get_value(&self) -> JsonValue {
        self.value.get()
    }

    /// Check a candidate value without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ReadOnly`] for read-only properties and
    /// [`ValidationError::Schema`] when the value breaks the schema.
    pub fn validate_value(&self, value: &JsonValue) -> Result<(), ValidationError> {
        if self.metadata.is_read_only() {
            return Err(ValidationError::ReadOnly {
                property: self.name.clone(),
            });
        }
        self.metadata
            .validate(value)
            .map_err(|source| ValidationError::Schema {
                property: self.name.clone(),
                source,
            })
    }

    /// Validate, then forward and record `value`.
    ///
    /// # Errors
    ///
    /// Returns [`WebThingError::Validation`] before anything changes, or
    /// [`WebThingError::Forward`] when the device refuses the write.
    pub fn set_value(&self, value: JsonValue) -> Result<(), WebThingError> {
        self.validate_value(&value)?;
        self.value.set(value)
    }

    /// The metadata with a `property` link to this property appended.
    #[must_use]
    pub fn as_property_description(&self) -> DataSchema {
        let mut description = self.metadata.clone();
        description
            .links
            .get_or_insert_with(Vec::new)
            .push(Link::new("property", self.href()));
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonType;
    use serde_json::json;

    fn brightness() -> Property {
        Property::new(
            "brightness",
            Value::new(json!(50)),
            DataSchema::new(JsonType::Integer)
                .with_title("Brightness")
                .with_minimum(0)
                .with_maximum(100),
        )
    }

    #[test]
    fn should_update_value_when_write_is_valid() {
        let property = brightness();
        property.set_value(json!(75)).unwrap();
        assert_eq!(property.get_value(), json!(75));
    }

    #[test]
    fn should_reject_write_when_read_only() {
        let property = Property::new(
            "level",
            Value::new(json!(40)),
            DataSchema::new(JsonType::Number).read_only(),
        );

        let result = property.set_value(json!(41));

        assert!(matches!(
            result,
            Err(WebThingError::Validation(ValidationError::ReadOnly { .. }))
        ));
        assert_eq!(property.get_value(), json!(40));
    }

    #[test]
    fn should_reject_write_when_out_of_bounds() {
        let property = brightness();

        let result = property.set_value(json!(101));

        assert!(matches!(
            result,
            Err(WebThingError::Validation(ValidationError::Schema { .. }))
        ));
        assert_eq!(property.get_value(), json!(50));
    }

    #[test]
    fn should_reject_write_when_type_does_not_match() {
        let property = brightness();
        assert!(property.set_value(json!("bright")).is_err());
        assert!(property.set_value(json!(12.5)).is_err());
    }

    #[test]
    fn should_not_call_forwarder_when_validation_fails() {
        let property = Property::new(
            "on",
            Value::with_forwarder(json!(true), |_| panic!("must not forward")),
            DataSchema::new(JsonType::Boolean),
        );
        assert!(property.set_value(json!("off")).is_err());
    }

    #[test]
    fn should_build_href_from_prefix() {
        let mut property = brightness();
        assert_eq!(property.href(), "/properties/brightness");
        property.set_href_prefix("/0");
        assert_eq!(property.href(), "/0/properties/brightness");
    }

    #[test]
    fn should_append_property_link_to_description() {
        let mut property = brightness();
        property.set_href_prefix("/things/lamp");

        let description = serde_json::to_value(property.as_property_description()).unwrap();

        assert_eq!(
            description,
            json!({
                "title": "Brightness",
                "type": "integer",
                "minimum": 0,
                "maximum": 100,
                "links": [{"rel": "property", "href": "/things/lamp/properties/brightness"}]
            })
        );
    }

    #[test]
    fn should_produce_identical_descriptions_when_called_twice() {
        let property = brightness();
        assert_eq!(
            property.as_property_description(),
            property.as_property_description()
        );
        assert!(property.metadata().links.is_none());
    }
}
