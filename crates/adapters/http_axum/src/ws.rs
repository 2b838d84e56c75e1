//! WebSocket session of one client with one thing.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;

use webthing_app::subscriber::ChannelSubscriber;
use webthing_app::thing_handle::ThingHandle;
use webthing_domain::subscriber::Subscriber;

use crate::protocol::{ErrorFrame, Frame, Request};

/// Notifications queued per client before new ones are dropped.
const NOTIFICATION_BUFFER: usize = 64;

/// Serve a client until it disconnects.
///
/// The client is subscribed to the thing's property and action updates for
/// the lifetime of the socket, and unsubscribed from everything on close.
pub async fn serve(socket: WebSocket, thing: Option<ThingHandle>) {
    let (mut sender, mut receiver) = socket.split();

    let Some(thing) = thing else {
        let frame = ErrorFrame::not_found("The requested thing was not found");
        let _ = send(&mut sender, &frame).await;
        let _ = sender.close().await;
        return;
    };

    let (subscriber, mut notifications) = ChannelSubscriber::channel(NOTIFICATION_BUFFER);
    let subscriber_id = subscriber.id();
    thing.add_subscriber(subscriber.clone());
    tracing::debug!(thing = %thing.id(), subscriber = %subscriber_id, "websocket connected");

    loop {
        tokio::select! {
            Some(message) = notifications.recv() => {
                if send(&mut sender, &message).await.is_err() {
                    break;
                }
            }
            frame = receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let replies = handle_text(&thing, &subscriber, text.as_str());
                    let mut closed = false;
                    for reply in &replies {
                        if send(&mut sender, reply).await.is_err() {
                            closed = true;
                            break;
                        }
                    }
                    if closed {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    thing.remove_subscriber(subscriber_id);
    tracing::debug!(thing = %thing.id(), subscriber = %subscriber_id, "websocket disconnected");
}

/// Apply one text frame to the thing and return the error frames to send
/// back. Requests inside a frame are applied one by one; a failing request
/// does not stop the others.
pub fn handle_text(
    thing: &ThingHandle,
    subscriber: &Arc<ChannelSubscriber>,
    text: &str,
) -> Vec<ErrorFrame> {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(reply) => {
            tracing::debug!("malformed websocket frame");
            return vec![reply];
        }
    };

    let mut replies = Vec::new();
    match frame.request {
        Request::SetProperty(values) => {
            for (name, value) in values {
                if let Err(err) = thing.set_property(&name, value) {
                    tracing::debug!(property = %name, error = %err, "websocket write rejected");
                    replies.push(ErrorFrame::bad_request(describe(&err)));
                }
            }
        }
        Request::RequestAction(requests) => {
            for (name, body) in requests {
                let input = body.get("input").cloned();
                match thing.perform_action(&name, input) {
                    Some(pending) => {
                        pending.start();
                    }
                    None => replies.push(
                        ErrorFrame::bad_request("Invalid action request")
                            .with_request(frame.raw.clone()),
                    ),
                }
            }
        }
        Request::AddEventSubscription(events) => {
            for name in events.keys() {
                thing.add_event_subscriber(name, subscriber.clone());
            }
        }
        Request::Unknown(message_type) => {
            tracing::debug!(message_type = %message_type, "unknown websocket message type");
            replies.push(
                ErrorFrame::bad_request(format!("Unknown messageType: {message_type}"))
                    .with_request(frame.raw),
            );
        }
    }
    replies
}

/// The error and its causes, outermost first.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

async fn send<T>(sender: &mut SplitSink<WebSocket, WsMessage>, payload: &T) -> Result<(), ()>
where
    T: Serialize,
{
    let json = match serde_json::to_string(payload) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize websocket message");
            return Ok(());
        }
    };
    sender
        .send(WsMessage::Text(json.into()))
        .await
        .map_err(|err| tracing::trace!(error = %err, "websocket send failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use webthing_app::ports::ActionContext;
    use webthing_domain::message::Message;
    use webthing_domain::property::Property;
    use webthing_domain::schema::{ActionMetadata, DataSchema, JsonType};
    use webthing_domain::thing::Thing;
    use webthing_domain::value::Value;

    use crate::protocol::BAD_REQUEST;

    fn lamp() -> ThingHandle {
        let thing = ThingHandle::new(
            Thing::builder()
                .id("urn:dev:ops:lamp")
                .title("Lamp")
                .build()
                .unwrap(),
        );
        thing.add_property(Property::new(
            "brightness",
            Value::new(json!(50)),
            DataSchema::new(JsonType::Integer)
                .with_minimum(0)
                .with_maximum(100),
        ));
        thing.add_available_action(
            "fade",
            ActionMetadata::new().with_input(
                DataSchema::new(JsonType::Object).with_property(
                    "level",
                    DataSchema::new(JsonType::Integer),
                    true,
                ),
            ),
            |_: &ActionContext| webthing_app::ports::action::NoopBehavior,
        );
        thing.add_available_event("overheated", DataSchema::new(JsonType::Number));
        thing
    }

    fn status(frame: &ErrorFrame) -> &'static str {
        let ErrorFrame::Error(data) = frame;
        data.status
    }

    #[tokio::test]
    async fn should_set_property_when_value_is_valid() {
        let thing = lamp();
        let (subscriber, _rx) = ChannelSubscriber::channel(8);

        let replies = handle_text(
            &thing,
            &subscriber,
            r#"{"messageType":"setProperty","data":{"brightness":80}}"#,
        );

        assert!(replies.is_empty());
        assert_eq!(thing.get_property("brightness"), Some(json!(80)));
    }

    #[tokio::test]
    async fn should_reply_bad_request_when_property_value_is_invalid() {
        let thing = lamp();
        let (subscriber, _rx) = ChannelSubscriber::channel(8);

        let replies = handle_text(
            &thing,
            &subscriber,
            r#"{"messageType":"setProperty","data":{"brightness":150}}"#,
        );

        assert_eq!(replies.len(), 1);
        assert_eq!(status(&replies[0]), BAD_REQUEST);
        assert_eq!(thing.get_property("brightness"), Some(json!(50)));
    }

    #[tokio::test]
    async fn should_start_action_when_requested() {
        let thing = lamp();
        let (subscriber, _rx) = ChannelSubscriber::channel(8);

        let replies = handle_text(
            &thing,
            &subscriber,
            r#"{"messageType":"requestAction","data":{"fade":{"input":{"level":20}}}}"#,
        );

        assert!(replies.is_empty());
        assert_eq!(thing.get_action_descriptions(Some("fade")).len(), 1);
    }

    #[tokio::test]
    async fn should_echo_request_when_action_is_rejected() {
        let thing = lamp();
        let (subscriber, _rx) = ChannelSubscriber::channel(8);
        let text = r#"{"messageType":"requestAction","data":{"explode":{}}}"#;

        let replies = handle_text(&thing, &subscriber, text);

        let ErrorFrame::Error(data) = &replies[0];
        assert_eq!(data.message, "Invalid action request");
        assert_eq!(
            data.request,
            Some(serde_json::from_str::<serde_json::Value>(text).unwrap())
        );
    }

    #[tokio::test]
    async fn should_deliver_events_when_subscribed() {
        let thing = lamp();
        let (subscriber, mut rx) = ChannelSubscriber::channel(8);

        let replies = handle_text(
            &thing,
            &subscriber,
            r#"{"messageType":"addEventSubscription","data":{"overheated":{}}}"#,
        );
        thing.add_event(webthing_domain::event::Event::new(
            "overheated",
            Some(json!(102)),
        ));

        assert!(replies.is_empty());
        assert!(matches!(rx.recv().await, Some(Message::Event(_))));
    }

    #[tokio::test]
    async fn should_reply_bad_request_when_message_type_is_unknown() {
        let thing = lamp();
        let (subscriber, _rx) = ChannelSubscriber::channel(8);

        let replies = handle_text(&thing, &subscriber, r#"{"messageType":"reboot","data":{}}"#);

        let ErrorFrame::Error(data) = &replies[0];
        assert_eq!(data.status, BAD_REQUEST);
        assert_eq!(data.message, "Unknown messageType: reboot");
    }

    #[tokio::test]
    async fn should_reply_bad_request_when_frame_is_not_json() {
        let thing = lamp();
        let (subscriber, _rx) = ChannelSubscriber::channel(8);

        let replies = handle_text(&thing, &subscriber, "{");

        assert_eq!(replies, vec![ErrorFrame::bad_request("Parsing request failed")]);
    }
}
