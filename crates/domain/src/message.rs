//! Notification messages pushed to subscribers.
//!
//! Every message is `{"messageType": ..., "data": ...}` on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::action::ActionDescription;
use crate::event::EventDescription;

/// A notification produced by a thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "data", rename_all = "camelCase")]
pub enum Message {
    /// Property values that changed, keyed by property name.
    PropertyStatus(Map<String, JsonValue>),
    /// The full description of an action that changed state.
    ActionStatus(ActionDescription),
    /// An emitted event.
    Event(EventDescription),
}

impl Message {
    /// A `propertyStatus` message for a single property.
    #[must_use]
    pub fn property_status(name: impl Into<String>, value: JsonValue) -> Self {
        let mut data = Map::new();
        data.insert(name.into(), value);
        Self::PropertyStatus(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::event::Event;
    use crate::id::ActionId;
    use serde_json::json;

    #[test]
    fn should_tag_property_status_message() {
        let message = Message::property_status("on", json!(false));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"messageType": "propertyStatus", "data": {"on": false}})
        );
    }

    #[test]
    fn should_tag_action_status_message() {
        let action = Action::new(ActionId::new(), "fade", None);
        let json = serde_json::to_value(Message::ActionStatus(action.as_action_description()))
            .unwrap();
        assert_eq!(json["messageType"], "actionStatus");
        assert_eq!(json["data"]["fade"]["status"], "created");
    }

    #[test]
    fn should_tag_event_message() {
        let event = Event::new("overheated", Some(json!(102)));
        let json = serde_json::to_value(Message::Event(event.as_event_description())).unwrap();
        assert_eq!(json["messageType"], "event");
        assert_eq!(json["data"]["overheated"]["data"], 102);
    }

    #[test]
    fn should_parse_message_back() {
        let message: Message = serde_json::from_value(
            json!({"messageType": "propertyStatus", "data": {"brightness": 10}}),
        )
        .unwrap();
        assert_eq!(message, Message::property_status("brightness", json!(10)));
    }
}
