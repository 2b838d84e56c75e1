//! Virtual dimmable lamp — logs received commands and fades on request.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tokio::sync::Notify;

use webthing_app::ports::{ActionBehavior, ActionContext, ActionFailure};
use webthing_app::thing_handle::ThingHandle;
use webthing_domain::error::WebThingError;
use webthing_domain::event::Event;
use webthing_domain::property::Property;
use webthing_domain::schema::{ActionMetadata, DataSchema, JsonType};
use webthing_domain::thing::Thing;
use webthing_domain::value::Value;

pub const LAMP_ID: &str = "urn:dev:ops:my-lamp-1234";

/// Temperature reported by the `overheated` event after a fade.
const OVERHEAT_CELSIUS: i64 = 102;

/// Build the lamp thing with its properties, `fade` action and
/// `overheated` event.
///
/// # Errors
///
/// Returns a validation error if the thing cannot be built.
pub fn build(event_history_limit: Option<usize>) -> Result<ThingHandle, WebThingError> {
    let mut builder = Thing::builder()
        .id(LAMP_ID)
        .title("My Lamp")
        .at_type("OnOffSwitch")
        .at_type("Light")
        .description("A web connected lamp");
    if let Some(limit) = event_history_limit {
        builder = builder.event_history_limit(limit);
    }
    let thing = ThingHandle::new(builder.build()?);

    thing.add_property(Property::new(
        "on",
        Value::with_forwarder(json!(true), |value| {
            tracing::info!(%value, "lamp on-state is now");
            Ok(())
        }),
        DataSchema::new(JsonType::Boolean)
            .with_at_type("OnOffProperty")
            .with_title("On/Off")
            .with_description("Whether the lamp is turned on"),
    ));
    thing.add_property(Property::new(
        "brightness",
        Value::with_forwarder(json!(50), |value| {
            tracing::info!(%value, "lamp brightness is now");
            Ok(())
        }),
        DataSchema::new(JsonType::Integer)
            .with_at_type("BrightnessProperty")
            .with_title("Brightness")
            .with_description("The level of light from 0-100")
            .with_minimum(0)
            .with_maximum(100)
            .with_unit("percent"),
    ));

    thing.add_available_action(
        "fade",
        ActionMetadata::new()
            .with_title("Fade")
            .with_description("Fade the lamp to a given level")
            .with_input(
                DataSchema::new(JsonType::Object)
                    .with_property(
                        "brightness",
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
                    ),
            ),
        |_: &ActionContext| Fade::default(),
    );

    thing.add_available_event(
        "overheated",
        DataSchema::new(JsonType::Number)
            .with_description("The lamp has exceeded its safe operating temperature")
            .with_unit("degree celsius"),
    );

    Ok(thing)
}

/// Fade to `brightness` over `duration` milliseconds, then report the lamp
/// overheating.
#[derive(Debug, Default)]
pub struct Fade {
    cancelled: Notify,
}

#[async_trait]
impl ActionBehavior for Fade {
    async fn perform(&self, ctx: &ActionContext) -> Result<(), ActionFailure> {
        let input = ctx.input.clone().unwrap_or(JsonValue::Null);
        let brightness = input.get("brightness").cloned().unwrap_or(JsonValue::Null);
        let duration = input
            .get("duration")
            .and_then(JsonValue::as_u64)
            .unwrap_or_default();

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(duration)) => {}
            () = self.cancelled.notified() => {
                tracing::debug!(id = %ctx.id, "fade cancelled");
                return Ok(());
            }
        }

        let Some(thing) = ctx.thing.upgrade() else {
            return Ok(());
        };
        thing.set_property("brightness", brightness)?;
        thing.add_event(Event::new("overheated", Some(json!(OVERHEAT_CELSIUS))));
        Ok(())
    }

    async fn cancel(&self) {
        self.cancelled.notify_one();
    }
}
