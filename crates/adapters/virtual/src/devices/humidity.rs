//! Virtual humidity sensor — pushes a new reading every few seconds.

use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::task::JoinHandle;

use webthing_app::thing_handle::ThingHandle;
use webthing_domain::error::WebThingError;
use webthing_domain::property::Property;
use webthing_domain::schema::{DataSchema, JsonType};
use webthing_domain::thing::Thing;
use webthing_domain::value::Value;

pub const SENSOR_ID: &str = "urn:dev:ops:my-humidity-sensor-1234";

/// A simulated humidity sensor.
///
/// The `level` property is read-only for clients; the driver side updates
/// it through [`Value::notify_of_external_update`].
#[derive(Debug, Clone)]
pub struct HumiditySensor {
    thing: ThingHandle,
    level: Value,
}

impl HumiditySensor {
    /// Build the sensor thing.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the thing cannot be built.
    pub fn new(event_history_limit: Option<usize>) -> Result<Self, WebThingError> {
        let mut builder = Thing::builder()
            .id(SENSOR_ID)
            .title("My Humidity Sensor")
            .at_type("MultiLevelSensor")
            .description("A web connected humidity sensor");
        if let Some(limit) = event_history_limit {
            builder = builder.event_history_limit(limit);
        }
        let thing = ThingHandle::new(builder.build()?);

        thing.add_property(Property::new(
            "on",
            Value::new(json!(true)),
            DataSchema::new(JsonType::Boolean)
                .with_title("On/Off")
                .with_description("Whether the sensor is on"),
        ));

        let level = Value::new(json!(0.0));
        thing.add_property(Property::new(
            "level",
            level.clone(),
            DataSchema::new(JsonType::Number)
                .with_at_type("LevelProperty")
                .with_title("Humidity")
                .with_description("The current humidity in %")
                .with_minimum(0)
                .with_maximum(100)
                .with_unit("percent")
                .read_only(),
        ));

        Ok(Self { thing, level })
    }

    #[must_use]
    pub fn thing(&self) -> &ThingHandle {
        &self.thing
    }

    /// Take a reading and publish it. Returns `false` when the reading did
    /// not change.
    pub fn poll(&self) -> bool {
        let reading = read_humidity();
        tracing::trace!(reading, "humidity sensor reading");
        self.level.notify_of_external_update(json!(reading))
    }

    /// Poll the sensor every `period` until the returned task is aborted.
    #[must_use]
    pub fn spawn(&self, period: Duration) -> JoinHandle<()> {
        let sensor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                sensor.poll();
            }
        })
    }
}

/// Mimic a sensor reading, in percent with one decimal.
fn read_humidity() -> f64 {
    let raw: f64 = rand::thread_rng().gen_range(0.0..100.0);
    (raw * 10.0).round() / 10.0
}
