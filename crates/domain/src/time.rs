//! Time and timestamp helpers.
//!
//! Timestamps travel on the wire with second precision and an explicit
//! `+00:00` offset, e.g. `2024-05-01T12:30:00+00:00`.

use chrono::{DateTime, SecondsFormat, Utc};

/// UTC timestamp used for action request/completion times and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp in wire format.
#[must_use]
pub fn format(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Serde adapter for a [`Timestamp`] in wire format.
pub mod wire {
    use chrono::DateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    /// Serialize in wire format.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(ts))
    }

    /// Parse any RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Fails when the input is not a valid RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&chrono::Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for an optional [`Timestamp`] in wire format.
pub mod wire_option {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    /// Serialize in wire format, `null` when absent.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(
        ts: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => super::wire::serialize(ts, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Parse an optional RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Fails when a present value is not a valid RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::wire")] Timestamp);

        Option::<Wrapper>::deserialize(deserializer).map(|opt| opt.map(|Wrapper(ts)| ts))
    }
}
