use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The measured quantity a series carries. Each kind gets its own Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Temperature,
    Humidity,
}

impl MetricKind {
    /// All metric kinds, in axis order.
    pub const ALL: &'static [MetricKind] = &[MetricKind::Temperature, MetricKind::Humidity];

    /// Get the string representation used in configuration and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Humidity => "humidity",
        }
    }

    /// Short suffix used in the string form of a [`SeriesKey`].
    pub fn suffix(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temp",
            MetricKind::Humidity => "hum",
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "temp" | "temperature" => Some(MetricKind::Temperature),
            "hum" | "humidity" => Some(MetricKind::Humidity),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one plotted line: a sensor paired with a metric kind.
///
/// Keys order by entity first, then metric, so iterating a `BTreeMap` of
/// series is deterministic. The string form is `"<entity>:<suffix>"`, e.g.
/// `"sensor-7:temp"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SeriesKey {
    /// Sensor or device identifier.
    pub entity_id: String,
    /// What the series measures.
    pub metric: MetricKind,
}

impl SeriesKey {
    /// Create a new series key.
    pub fn new(entity_id: impl Into<String>, metric: MetricKind) -> Self {
        Self {
            entity_id: entity_id.into(),
            metric,
        }
    }

    /// Shorthand for a temperature series.
    pub fn temperature(entity_id: impl Into<String>) -> Self {
        Self::new(entity_id, MetricKind::Temperature)
    }

    /// Shorthand for a humidity series.
    pub fn humidity(entity_id: impl Into<String>) -> Self {
        Self::new(entity_id, MetricKind::Humidity)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_id, self.metric.suffix())
    }
}

impl FromStr for SeriesKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (entity, suffix) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::SeriesKey(format!("missing metric suffix in '{}'", s)))?;

        if entity.is_empty() {
            return Err(Error::SeriesKey(format!("empty entity id in '{}'", s)));
        }

        let metric = MetricKind::from_suffix(suffix)
            .ok_or_else(|| Error::SeriesKey(format!("unknown metric '{}' in '{}'", suffix, s)))?;

        Ok(Self::new(entity, metric))
    }
}

impl From<SeriesKey> for String {
    fn from(key: SeriesKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for SeriesKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// A single timestamped reading. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix epoch milliseconds when the measurement was taken.
    pub timestamp: i64,
    /// The measured value.
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A timestamp as it arrives on the wire: epoch milliseconds or a date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Integer epoch milliseconds.
    Millis(i64),
    /// Fractional epoch milliseconds.
    FloatMillis(f64),
    /// ISO-8601 / RFC 3339 string, or a `datetime-local` value (`2024-05-01T10:30`).
    Text(String),
}

impl RawTimestamp {
    /// Convert to epoch milliseconds.
    ///
    /// Strings without an offset are read as UTC.
    pub fn to_millis(&self) -> Result<i64> {
        match self {
            RawTimestamp::Millis(ms) => Ok(*ms),
            RawTimestamp::FloatMillis(ms) if ms.is_finite() => Ok(*ms as i64),
            RawTimestamp::FloatMillis(ms) => Err(Error::Timestamp(ms.to_string())),
            RawTimestamp::Text(s) => parse_timestamp(s),
        }
    }
}

impl From<i64> for RawTimestamp {
    fn from(ms: i64) -> Self {
        RawTimestamp::Millis(ms)
    }
}

/// Parse a timestamp string into epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Result<i64> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }

    s.parse::<i64>()
        .map_err(|_| Error::Timestamp(s.to_string()))
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
