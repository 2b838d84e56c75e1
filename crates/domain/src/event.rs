//! Event — an immutable record of something that happened to a thing.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::description::Named;
use crate::time::{self, Timestamp};

/// Wire form of an event: `{name: {timestamp, data?}}`.
pub type EventDescription = Named<EventBody>;

/// Body of an [`EventDescription`].
///
/// `data` is omitted, not `null`, when the event carried no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    #[serde(with = "time::wire")]
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<JsonValue>,
}

/// An emitted event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    data: Option<JsonValue>,
    time: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self::at(name, data, time::now())
    }

    /// Create an event with an explicit timestamp.
    #[must_use]
    pub fn at(name: impl Into<String>, data: Option<JsonValue>, time: Timestamp) -> Self {
        Self {
            name: name.into(),
            data,
            time,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn data(&self) -> Option<&JsonValue> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn time(&self) -> Timestamp {
        self.time
    }

    #[must_use]
    pub fn as_event_description(&self) -> EventDescription {
        Named::new(
            self.name.clone(),
            EventBody {
                timestamp: self.time,
                data: self.data.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn should_include_data_when_supplied() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let event = Event::at("overheated", Some(json!(102)), at);

        assert_eq!(
            serde_json::to_value(event.as_event_description()).unwrap(),
            json!({"overheated": {"timestamp": "2024-01-02T03:04:05+00:00", "data": 102}})
        );
    }

    #[test]
    fn should_omit_data_key_when_not_supplied() {
        let event = Event::new("motion", None);
        let json = serde_json::to_value(event.as_event_description()).unwrap();
        assert!(json["motion"].get("data").is_none());
        assert!(json["motion"].get("timestamp").is_some());
    }

    #[test]
    fn should_keep_explicit_null_data() {
        let event = Event::new("reset", Some(JsonValue::Null));
        let json = serde_json::to_value(event.as_event_description()).unwrap();
        assert_eq!(json["reset"].get("data"), Some(&JsonValue::Null));
    }

    #[test]
    fn should_produce_identical_descriptions_when_called_twice() {
        let event = Event::new("overheated", Some(json!(99)));
        assert_eq!(event.as_event_description(), event.as_event_description());
    }
}
