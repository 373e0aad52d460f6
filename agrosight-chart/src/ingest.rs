//! Normalization of inbound sensor messages.
//!
//! Devices and gateways do not agree on field names: the same reading may
//! arrive as `{sensor_id, temperature}`, as `{id, temperatura, humedad}` or
//! wrapped in a `sensor_update` envelope `{payload: {...}, ts}`. Each field
//! is looked up through an ordered list of paths and the first present one
//! wins. The adapter also applies the device filter before anything reaches
//! the buffers.

use std::collections::{BTreeSet, VecDeque};

use agrosight_common::{DeviceConfig, DeviceType, MetricKind, Sample, SeriesKey, parse_timestamp};
use serde_json::{Map, Value};

/// Entity id used when a message names no sensor.
pub const UNKNOWN_ENTITY: &str = "unknown";

/// Messages held while an endpoint's sensor list is unknown.
pub const DEFAULT_BACKLOG_LIMIT: usize = 256;

/// A path into a JSON object, e.g. `["payload", "id"]`.
pub type FieldPath = &'static [&'static str];

/// Where the sensor id is looked up, in order.
pub const ENTITY_RULES: &[FieldPath] = &[&["sensor_id"], &["id"], &["payload", "id"]];

/// Where the temperature is looked up, in order.
pub const TEMPERATURE_RULES: &[FieldPath] = &[
    &["temperature"],
    &["temp"],
    &["payload", "temperatura"],
    &["temperatura"],
];

/// Where the relative humidity is looked up, in order.
pub const HUMIDITY_RULES: &[FieldPath] = &[
    &["humidity"],
    &["humedad"],
    &["payload", "humedad"],
    &["hum"],
];

/// Where the measurement time is looked up, in order.
pub const TIMESTAMP_RULES: &[FieldPath] = &[&["timestamp"], &["payload", "timestamp"], &["ts"]];

/// Field naming the endpoint a reading came through.
const ENDPOINT_RULES: &[FieldPath] = &[&["endpoint_id"], &["payload", "endpoint_id"]];

fn lookup<'a>(message: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(message, |value, field| value.get(field))
}

/// Present, non-empty identifier at `value`. Numeric ids are accepted.
fn as_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Every id the message could be referring to, in rule order.
fn candidate_ids(message: &Value) -> Vec<String> {
    ENTITY_RULES
        .iter()
        .filter_map(|path| lookup(message, path).and_then(as_identifier))
        .collect()
}

/// Resolve the sensor id of a message, falling back to [`UNKNOWN_ENTITY`].
pub fn extract_entity(message: &Value) -> String {
    candidate_ids(message)
        .into_iter()
        .next()
        .unwrap_or_else(|| UNKNOWN_ENTITY.to_string())
}

/// Resolve a reading for `metric`.
///
/// The first rule whose field is present decides; a present field that is not
/// a finite number yields `None` rather than falling through to later rules.
pub fn extract_value(message: &Value, metric: MetricKind) -> Option<f64> {
    let rules = match metric {
        MetricKind::Temperature => TEMPERATURE_RULES,
        MetricKind::Humidity => HUMIDITY_RULES,
    };

    let value = rules.iter().find_map(|path| lookup(message, path))?;
    value.as_f64().filter(|v| v.is_finite())
}

/// Resolve the measurement time in epoch milliseconds, or `now` when no rule
/// yields a readable one.
pub fn extract_timestamp(message: &Value, now: i64) -> i64 {
    for path in TIMESTAMP_RULES {
        let Some(value) = lookup(message, path) else {
            continue;
        };

        let parsed = match value {
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => parse_timestamp(s).ok(),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
            _ => continue,
        };

        match parsed {
            Some(ms) if ms != 0 => return ms,
            _ => tracing::debug!(field = %path.join("."), value = %value, "Unreadable timestamp"),
        }
    }

    now
}

/// Accept a direct reading, refusing non-finite values.
pub fn validate_sample(timestamp: i64, value: f64) -> Option<Sample> {
    value.is_finite().then(|| Sample::new(timestamp, value))
}

/// Unwrap a `{topic: "temperature", payload: {...}, ts}` delivery into a flat
/// message. Anything else is returned unchanged.
pub fn flatten_topic_envelope(message: Value) -> Value {
    let is_temperature_topic = message.get("topic").and_then(Value::as_str) == Some("temperature");
    if !is_temperature_topic {
        return message;
    }

    let Value::Object(mut outer) = message else {
        return message;
    };
    let Some(Value::Object(payload)) = outer.remove("payload") else {
        return Value::Object(outer);
    };

    let mut flat: Map<String, Value> = payload;
    if !flat.contains_key("timestamp") {
        if let Some(ts) = outer.remove("ts") {
            flat.insert("timestamp".to_string(), ts);
        }
    }
    Value::Object(flat)
}

/// A normalized reading ready for the buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub key: SeriesKey,
    pub sample: Sample,
}

/// Which devices' readings are let through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceFilter {
    /// No device selected.
    #[default]
    All,
    /// A single sensor.
    Sensor(String),
    /// An endpoint and the sensors behind it. `None` while the list is loading.
    Endpoint {
        id: String,
        sensors: Option<BTreeSet<String>>,
    },
}

impl DeviceFilter {
    /// Build the filter for a configured device selection.
    pub fn from_config(device: &DeviceConfig) -> Self {
        match (&device.device_id, device.device_type) {
            (Some(id), Some(DeviceType::Sensor)) => DeviceFilter::Sensor(id.clone()),
            (Some(id), Some(DeviceType::Endpoint)) => DeviceFilter::Endpoint {
                id: id.clone(),
                sensors: device
                    .endpoint_sensors
                    .as_ref()
                    .map(|s| s.iter().cloned().collect()),
            },
            _ => DeviceFilter::All,
        }
    }

    /// True for an endpoint whose sensor list has not arrived yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, DeviceFilter::Endpoint { sensors: None, .. })
    }
}

/// Outcome of offering a message to the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// Readings to push, possibly none if the message carried no usable value.
    Accepted(Vec<Reading>),
    /// Held until the endpoint's sensor list is known.
    Deferred,
    /// Dropped.
    Rejected(Rejection),
}

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a JSON object.
    NotAnObject,
    /// From a sensor outside the selected device.
    OtherDevice,
    /// Routed through a different endpoint.
    OtherEndpoint,
}

/// Turns raw messages into readings for the selected device.
#[derive(Debug, Clone)]
pub struct IngestAdapter {
    filter: DeviceFilter,
    backlog: VecDeque<(Value, i64)>,
    backlog_limit: usize,
    dropped: usize,
}

impl Default for IngestAdapter {
    fn default() -> Self {
        Self::new(DeviceFilter::All)
    }
}

impl IngestAdapter {
    pub fn new(filter: DeviceFilter) -> Self {
        Self {
            filter,
            backlog: VecDeque::new(),
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            dropped: 0,
        }
    }

    /// Change how many messages are held while the sensor list loads.
    pub fn with_backlog_limit(mut self, limit: usize) -> Self {
        self.backlog_limit = limit.max(1);
        self
    }

    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    /// Messages currently held.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Messages evicted from a full backlog so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Normalize a message received at `now`.
    pub fn accept(&mut self, message: Value, now: i64) -> Ingest {
        let message = flatten_topic_envelope(message);
        if !message.is_object() {
            return Ingest::Rejected(Rejection::NotAnObject);
        }

        if let Some(rejection) = self.check_endpoint(&message) {
            return Ingest::Rejected(rejection);
        }

        if self.filter.is_pending() {
            self.defer(message, now);
            return Ingest::Deferred;
        }

        if !self.matches_device(&message) {
            return Ingest::Rejected(Rejection::OtherDevice);
        }

        Ingest::Accepted(normalize(&message, now))
    }

    /// Supply the endpoint's sensor list and replay held messages through it.
    ///
    /// Has no effect on the filter unless it targets an endpoint.
    pub fn set_endpoint_sensors(&mut self, sensors: impl IntoIterator<Item = String>) -> Vec<Reading> {
        let DeviceFilter::Endpoint { sensors: list, .. } = &mut self.filter else {
            tracing::debug!("Ignoring endpoint sensor list without an endpoint selected");
            return Vec::new();
        };
        *list = Some(sensors.into_iter().collect());

        let held = std::mem::take(&mut self.backlog);
        tracing::debug!(count = held.len(), "Replaying held messages");

        held.into_iter()
            .filter_map(|(message, received)| match self.accept(message, received) {
                Ingest::Accepted(readings) => Some(readings),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn defer(&mut self, message: Value, now: i64) {
        if self.backlog.len() >= self.backlog_limit {
            self.backlog.pop_front();
            self.dropped += 1;
        }
        self.backlog.push_back((message, now));
    }

    fn check_endpoint(&self, message: &Value) -> Option<Rejection> {
        let DeviceFilter::Endpoint { id, .. } = &self.filter else {
            return None;
        };

        let endpoint = ENDPOINT_RULES
            .iter()
            .find_map(|path| lookup(message, path).and_then(as_identifier))?;

        (endpoint != *id).then_some(Rejection::OtherEndpoint)
    }

    fn matches_device(&self, message: &Value) -> bool {
        match &self.filter {
            DeviceFilter::All => true,
            DeviceFilter::Sensor(id) => candidate_ids(message).iter().any(|c| c == id),
            DeviceFilter::Endpoint {
                sensors: Some(sensors),
                ..
            } => sensors.is_empty() || candidate_ids(message).iter().any(|c| sensors.contains(c)),
            DeviceFilter::Endpoint { sensors: None, .. } => false,
        }
    }
}

/// Extract every usable reading from a message.
pub fn normalize(message: &Value, now: i64) -> Vec<Reading> {
    let entity = extract_entity(message);
    let timestamp = extract_timestamp(message, now);

    MetricKind::ALL
        .iter()
        .filter_map(|&metric| {
            let value = extract_value(message, metric);
            if value.is_none() {
                tracing::trace!(entity = %entity, metric = %metric, "No usable value");
            }
            Some(Reading {
                key: SeriesKey::new(entity.clone(), metric),
                sample: validate_sample(timestamp, value?)?,
            })
        })
        .collect()
}
