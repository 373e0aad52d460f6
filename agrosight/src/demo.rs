//! Demo feed generator.
//!
//! Simulates a handful of greenhouse sensors with daily temperature and
//! humidity cycles, noise and occasional heat spikes, and emits their
//! readings in the different message shapes real gateways use.

use std::f64::consts::PI;

use chrono::{TimeZone, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

use crate::feed::FeedEvent;

/// Ticks in one simulated day cycle.
const CYCLE_TICKS: f64 = 96.0;

/// Message layouts the generator rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
    /// `{sensor_id, temperature, humidity, timestamp: epoch ms}`
    Flat,
    /// `{id, temp, hum, timestamp: ISO-8601}`
    Short,
    /// `{type: "sensor_update", payload: {id, temperatura, humedad, endpoint_id, timestamp}, ts}`
    SensorUpdate,
    /// `{topic: "temperature", payload: {...}, ts}`
    Topic,
}

impl MessageShape {
    const ALL: [MessageShape; 4] = [
        MessageShape::Flat,
        MessageShape::Short,
        MessageShape::SensorUpdate,
        MessageShape::Topic,
    ];
}

/// State of one simulated sensor.
#[derive(Debug, Clone)]
struct SimSensor {
    id: String,
    base_temp: f64,
    base_humidity: f64,
    phase: f64,
    /// Ticks left in the current heat spike.
    spike_ticks: u32,
    shape: MessageShape,
}

/// Seedable generator of a synthetic sensor feed.
#[derive(Debug)]
pub struct DemoFeed {
    rng: SmallRng,
    sensors: Vec<SimSensor>,
    endpoint: Option<String>,
    start_ms: i64,
    interval_ms: i64,
    tick: u64,
}

impl DemoFeed {
    /// Create a feed of `sensors` sensors whose first reading is at `start_ms`.
    ///
    /// The same seed always yields the same feed.
    pub fn new(sensors: usize, seed: Option<u64>, start_ms: i64, interval_ms: i64) -> Self {
        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let sensors = (0..sensors)
            .map(|i| SimSensor {
                id: format!("gh-{}", i + 1),
                base_temp: rng.random_range(18.0..26.0),
                base_humidity: rng.random_range(45.0..70.0),
                phase: rng.random_range(0.0..2.0 * PI),
                spike_ticks: 0,
                shape: MessageShape::ALL[i % MessageShape::ALL.len()],
            })
            .collect();

        Self {
            rng,
            sensors,
            endpoint: None,
            start_ms,
            interval_ms: interval_ms.max(1),
            tick: 0,
        }
    }

    /// Route every sensor through `endpoint`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn sensor_ids(&self) -> Vec<String> {
        self.sensors.iter().map(|s| s.id.clone()).collect()
    }

    /// Control message announcing the endpoint's sensors, if routed through one.
    pub fn endpoint_sensors_message(&self) -> Option<Value> {
        self.endpoint
            .as_ref()
            .map(|_| FeedEvent::endpoint_sensors_message(&self.sensor_ids()))
    }

    /// Timestamp of the next batch.
    pub fn current_timestamp(&self) -> i64 {
        self.start_ms + self.tick as i64 * self.interval_ms
    }

    /// One message per sensor for the next tick.
    pub fn next_batch(&mut self) -> Vec<Value> {
        let timestamp = self.current_timestamp();
        let t = self.tick as f64;
        let mut batch = Vec::with_capacity(self.sensors.len());

        for i in 0..self.sensors.len() {
            if self.sensors[i].spike_ticks == 0 && self.rng.random_bool(0.02) {
                self.sensors[i].spike_ticks = self.rng.random_range(3..8);
                tracing::debug!(sensor = %self.sensors[i].id, tick = self.tick, "Heat spike");
            }

            let temp_noise = self.rng.random_range(-0.3..0.3);
            let humidity_noise = self.rng.random_range(-1.5..1.5);

            let sensor = &mut self.sensors[i];
            let cycle = (2.0 * PI * t / CYCLE_TICKS + sensor.phase).sin();
            let mut temperature = sensor.base_temp + 5.0 * cycle + temp_noise;
            if sensor.spike_ticks > 0 {
                temperature += 14.0;
                sensor.spike_ticks -= 1;
            }
            // Warmer air holds the same moisture at lower relative humidity.
            let humidity = (sensor.base_humidity - 12.0 * cycle + humidity_noise).clamp(0.0, 100.0);

            let sensor = &self.sensors[i];
            batch.push(self.message(sensor, round1(temperature), round1(humidity), timestamp));
        }

        self.tick += 1;
        batch
    }

    /// The whole feed: the endpoint announcement, if any, then `count` batches.
    pub fn generate(&mut self, count: usize) -> Vec<Value> {
        let mut messages: Vec<Value> = self.endpoint_sensors_message().into_iter().collect();
        for _ in 0..count {
            messages.extend(self.next_batch());
        }
        messages
    }

    fn message(&self, sensor: &SimSensor, temperature: f64, humidity: f64, timestamp: i64) -> Value {
        let mut message = match sensor.shape {
            MessageShape::Flat => json!({
                "sensor_id": sensor.id,
                "temperature": temperature,
                "humidity": humidity,
                "timestamp": timestamp,
            }),
            MessageShape::Short => json!({
                "id": sensor.id,
                "temp": temperature,
                "hum": humidity,
                "timestamp": iso8601(timestamp),
            }),
            MessageShape::SensorUpdate => json!({
                "type": "sensor_update",
                "payload": {
                    "id": sensor.id,
                    "temperatura": temperature,
                    "humedad": humidity,
                    "timestamp": iso8601(timestamp),
                },
                "ts": timestamp,
            }),
            MessageShape::Topic => json!({
                "topic": "temperature",
                "payload": {
                    "sensor_id": sensor.id,
                    "temperature": temperature,
                    "humidity": humidity,
                },
                "ts": timestamp,
            }),
        };

        if let Some(endpoint) = &self.endpoint {
            let target = match sensor.shape {
                MessageShape::SensorUpdate | MessageShape::Topic => message.get_mut("payload"),
                MessageShape::Flat | MessageShape::Short => Some(&mut message),
            };
            if let Some(Value::Object(fields)) = target {
                fields.insert("endpoint_id".to_string(), Value::String(endpoint.clone()));
            }
        }
        message
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn iso8601(timestamp: i64) -> String {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrosight_chart::ingest::normalize;

    const START: i64 = 1_700_000_000_000;

    #[test]
    fn test_seeded_feed_is_reproducible() {
        let a = DemoFeed::new(3, Some(42), START, 60_000).generate(20);
        let b = DemoFeed::new(3, Some(42), START, 60_000).generate(20);
        assert_eq!(a, b);
        assert_eq!(a.len(), 60);
    }

    #[test]
    fn test_every_shape_normalizes() {
        let mut feed = DemoFeed::new(4, Some(1), START, 60_000);
        for message in feed.next_batch() {
            let readings = normalize(
                &agrosight_chart::ingest::flatten_topic_envelope(message),
                0,
            );
            assert_eq!(readings.len(), 2);
            assert_eq!(readings[0].sample.timestamp, START);
            assert!(readings[0].key.entity_id.starts_with("gh-"));
        }
    }

    #[test]
    fn test_endpoint_routing() {
        let mut feed = DemoFeed::new(2, Some(3), START, 1_000).with_endpoint("ep-1");
        let messages = feed.generate(1);

        assert_eq!(messages[0]["type"], "endpoint_sensors");
        assert_eq!(messages[0]["sensors"], json!(["gh-1", "gh-2"]));
        assert_eq!(messages[1]["endpoint_id"], "ep-1");
        assert_eq!(messages[2]["id"], "gh-2");
        assert_eq!(messages[2]["endpoint_id"], "ep-1");
    }

    #[test]
    fn test_timestamps_advance_by_interval() {
        let mut feed = DemoFeed::new(1, Some(9), START, 30_000);
        feed.next_batch();
        let second = feed.next_batch();
        assert_eq!(second[0]["timestamp"], START + 30_000);
        assert_eq!(feed.current_timestamp(), START + 60_000);
    }
}
