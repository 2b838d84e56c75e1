//! WebSocket message protocol.
//!
//! Clients send `{"messageType": ..., "data": {...}}` frames. The server
//! answers bad requests with error frames:
//!
//! ```json
//! {"messageType": "error", "data": {"status": "400 Bad Request", "message": "...", "request": {...}}}
//! ```

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

pub const BAD_REQUEST: &str = "400 Bad Request";
pub const NOT_FOUND: &str = "404 Not Found";

/// A request received from a client.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Write each `name: value` pair.
    SetProperty(Map<String, JsonValue>),
    /// Request each `name: {"input": ...}` action.
    RequestAction(Map<String, JsonValue>),
    /// Receive every event named in the map's keys.
    AddEventSubscription(Map<String, JsonValue>),
    Unknown(String),
}

/// A parsed frame, keeping the raw message for error echoes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub request: Request,
    pub raw: JsonValue,
}

impl Frame {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns the error frame to send back when the text is not JSON or
    /// lacks `messageType` or `data`.
    pub fn parse(text: &str) -> Result<Self, ErrorFrame> {
        let raw: JsonValue = serde_json::from_str(text)
            .map_err(|_| ErrorFrame::bad_request("Parsing request failed"))?;

        let (Some(message_type), Some(data)) = (raw.get("messageType"), raw.get("data")) else {
            return Err(ErrorFrame::bad_request("Invalid message"));
        };
        let Some(message_type) = message_type.as_str() else {
            return Err(ErrorFrame::bad_request("Invalid message"));
        };
        let data = data.as_object().cloned().unwrap_or_default();

        let request = match message_type {
            "setProperty" => Request::SetProperty(data),
            "requestAction" => Request::RequestAction(data),
            "addEventSubscription" => Request::AddEventSubscription(data),
            other => Request::Unknown(other.to_string()),
        };
        Ok(Self { request, raw })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorData {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<JsonValue>,
}

/// Outbound error frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "messageType", content = "data", rename_all = "camelCase")]
pub enum ErrorFrame {
    Error(ErrorData),
}

impl ErrorFrame {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Error(ErrorData {
            status: BAD_REQUEST,
            message: message.into(),
            request: None,
        })
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Error(ErrorData {
            status: NOT_FOUND,
            message: message.into(),
            request: None,
        })
    }

    /// Echo the offending request back to the client.
    #[must_use]
    pub fn with_request(self, request: JsonValue) -> Self {
        let Self::Error(data) = self;
        Self::Error(ErrorData {
            request: Some(request),
            ..data
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_parse_set_property_frame() {
        let frame = Frame::parse(r#"{"messageType":"setProperty","data":{"on":true}}"#).unwrap();

        let mut expected = Map::new();
        expected.insert("on".to_string(), json!(true));
        assert_eq!(frame.request, Request::SetProperty(expected));
    }

    #[test]
    fn should_keep_unknown_message_type() {
        let frame = Frame::parse(r#"{"messageType":"reboot","data":{}}"#).unwrap();
        assert_eq!(frame.request, Request::Unknown("reboot".to_string()));
    }

    #[test]
    fn should_fail_parsing_when_text_is_not_json() {
        let err = Frame::parse("not json").unwrap_err();
        assert_eq!(err, ErrorFrame::bad_request("Parsing request failed"));
    }

    #[test]
    fn should_fail_parsing_when_data_is_missing() {
        let err = Frame::parse(r#"{"messageType":"setProperty"}"#).unwrap_err();
        assert_eq!(err, ErrorFrame::bad_request("Invalid message"));
    }

    #[test]
    fn should_serialize_error_frame_with_request_echo() {
        let frame = ErrorFrame::bad_request("Invalid action request")
            .with_request(json!({"messageType": "requestAction", "data": {}}));

        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "messageType": "error",
                "data": {
                    "status": "400 Bad Request",
                    "message": "Invalid action request",
                    "request": {"messageType": "requestAction", "data": {}},
                }
            })
        );
    }

    #[test]
    fn should_omit_request_when_not_echoed() {
        let frame = ErrorFrame::not_found("The requested thing was not found");
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "messageType": "error",
                "data": {"status": "404 Not Found", "message": "The requested thing was not found"}
            })
        );
    }
}
