//! Single-entry `{name: body}` wrappers used by action and event
//! descriptions.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A body keyed by its name, rendered as a one-key JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Named<T> {
    pub name: String,
    pub body: T,
}

impl<T> Named<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, body: T) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

impl<T: Serialize> Serialize for Named<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.body)?;
        map.end()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Named<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, T>::deserialize(deserializer)?;
        if map.len() != 1 {
            return Err(D::Error::invalid_length(map.len(), &"exactly one entry"));
        }
        map.into_iter()
            .next()
            .map(|(name, body)| Self { name, body })
            .ok_or_else(|| D::Error::invalid_length(0, &"exactly one entry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_serialize_as_single_key_object() {
        let named = Named::new("fade", json!({"status": "created"}));
        assert_eq!(
            serde_json::to_value(&named).unwrap(),
            json!({"fade": {"status": "created"}})
        );
    }

    #[test]
    fn should_reject_object_with_several_keys() {
        let result: Result<Named<serde_json::Value>, _> =
            serde_json::from_value(json!({"a": 1, "b": 2}));
        assert!(result.is_err());
    }

    #[test]
    fn should_deserialize_single_key_object() {
        let named: Named<u8> = serde_json::from_value(json!({"level": 3})).unwrap();
        assert_eq!(named, Named::new("level", 3));
    }
}
