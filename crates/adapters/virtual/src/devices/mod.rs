//! Virtual device implementations — lamp and humidity sensor.
//!
//! Each device has a fixed thing id so clients recognise it across restarts.

pub mod humidity;
pub mod lamp;

pub use humidity::HumiditySensor;
pub use lamp::Fade;
