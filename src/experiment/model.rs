//! Wire and domain types for experiments and sensor data.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use url::Url;

/// Ids arrive as JSON integers from the backend but are opaque to the client.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Int(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an id as received from the backend or the operator.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as it appears in request paths.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Ok(Self(RawId::deserialize(deserializer)?.into_string()))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of an experiment.
    ExperimentId
);
opaque_id!(
    /// Identifier of a captured data entry; also the capture result id.
    EntryId
);

/// An experiment and, when the backend includes them, its data entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: ExperimentId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Most recent first once captures have been merged.
    #[serde(default)]
    pub data_entries: Option<Vec<DataEntry>>,
}

/// One persisted sensor capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub id: EntryId,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub experiment_id: Option<ExperimentId>,
    #[serde(default)]
    pub image_filename: Option<String>,
}

impl DataEntry {
    /// Where the backend serves this entry's captured image, if it has one.
    pub fn image_url(&self, base: &Url) -> Option<Url> {
        let filename = self.image_filename.as_deref().filter(|f| !f.is_empty())?;
        let mut url = base.join("images/").ok()?;
        url.path_segments_mut().ok()?.pop_if_empty().push(filename);
        Some(url)
    }
}

/// Payload for creating an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExperiment {
    pub name: String,
    pub description: String,
}

impl NewExperiment {
    /// A missing description is sent as an empty string.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description: description.unwrap_or_default(),
        }
    }
}

/// Response of the capture trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureReceipt {
    pub id: EntryId,
}

/// Unpersisted sensor snapshot returned by the live endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    pub temperature: f64,
    pub humidity: f64,
}

/// A live reading stamped with the client receipt time, ready for charting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveTelemetryPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

impl LiveTelemetryPoint {
    /// Stamp a reading with the time it was received.
    pub fn received(reading: LiveReading, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339, naive ISO-8601 (assumed UTC) and RFC 2822 timestamps.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognised timestamp format: {raw}"))
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
