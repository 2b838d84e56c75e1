//! # webthing-adapter-virtual
//!
//! Virtual/demo device drivers, for trying the server without hardware.
//!
//! ## Provided things
//!
//! | Thing | Id | Behaviour |
//! |-------|----|-----------|
//! | My Lamp | `urn:dev:ops:my-lamp-1234` | `on` / `brightness` writes are logged; `fade` moves the brightness then emits `overheated` |
//! | My Humidity Sensor | `urn:dev:ops:my-humidity-sensor-1234` | Read-only `level` refreshed on a timer |
//!
//! ## Dependency rule
//!
//! Depends on `webthing-app` (action ports, thing handle) and
//! `webthing-domain` only.

pub mod devices;

use std::time::Duration;

use tokio::task::JoinHandle;

use webthing_app::thing_handle::ThingHandle;
use webthing_domain::error::WebThingError;

use devices::HumiditySensor;

/// How often the humidity sensor takes a reading.
pub const SENSOR_PERIOD: Duration = Duration::from_secs(3);

/// The set of virtual things served by the demo daemon.
#[derive(Debug, Clone)]
pub struct VirtualThings {
    lamp: ThingHandle,
    sensor: HumiditySensor,
}

impl VirtualThings {
    /// Build every virtual thing.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a thing cannot be built.
    pub fn new(event_history_limit: Option<usize>) -> Result<Self, WebThingError> {
        Ok(Self {
            lamp: devices::lamp::build(event_history_limit)?,
            sensor: HumiditySensor::new(event_history_limit)?,
        })
    }

    #[must_use]
    pub fn lamp(&self) -> ThingHandle {
        self.lamp.clone()
    }

    #[must_use]
    pub fn sensor(&self) -> &HumiditySensor {
        &self.sensor
    }

    /// Every thing, lamp first.
    #[must_use]
    pub fn things(&self) -> Vec<ThingHandle> {
        vec![self.lamp.clone(), self.sensor.thing().clone()]
    }

    /// Start the background drivers. Abort the returned tasks to stop them.
    #[must_use]
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        tracing::info!(period = ?SENSOR_PERIOD, "starting virtual humidity sensor");
        vec![self.sensor.spawn(SENSOR_PERIOD)]
    }
}
