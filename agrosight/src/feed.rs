//! JSON-lines message feed.
//!
//! Each non-empty line is one JSON message as a gateway would deliver it.
//! A line of the form `{"type": "endpoint_sensors", "sensors": [...]}` is a
//! control message carrying the selected endpoint's sensor list; every other
//! line is passed to the ingestion adapter untouched.

use std::path::Path;
use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Control message type announcing an endpoint's sensors.
pub const ENDPOINT_SENSORS_TYPE: &str = "endpoint_sensors";

/// One decoded feed line.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A sensor message.
    Message(Value),
    /// The sensors behind the selected endpoint.
    EndpointSensors(Vec<String>),
}

impl FeedEvent {
    /// Build the control message announcing `sensors`.
    pub fn endpoint_sensors_message(sensors: &[String]) -> Value {
        serde_json::json!({
            "type": ENDPOINT_SENSORS_TYPE,
            "sensors": sensors,
        })
    }
}

/// Decode a single line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<FeedEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)?;
    if value.get("type").and_then(Value::as_str) == Some(ENDPOINT_SENSORS_TYPE) {
        let sensors = value
            .get("sensors")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        return Ok(Some(FeedEvent::EndpointSensors(sensors)));
    }

    Ok(Some(FeedEvent::Message(value)))
}

type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// Reads feed events line by line, skipping lines that are not JSON.
pub struct FeedReader<R> {
    lines: Lines<R>,
    line_number: usize,
    skipped: usize,
}

impl<R: AsyncBufRead + Unpin> FeedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            skipped: 0,
        }
    }

    /// Lines dropped because they were not valid JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Next event, or `None` at end of input.
    pub async fn next_event(&mut self) -> std::io::Result<Option<FeedEvent>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            match parse_line(&line) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(
                        error = %e,
                        line = self.line_number,
                        "Skipping malformed feed line"
                    );
                }
            }
        }
        Ok(None)
    }

    /// Read every remaining event.
    pub async fn read_all(&mut self) -> std::io::Result<Vec<FeedEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await? {
            events.push(event);
        }
        Ok(events)
    }
}

impl FeedReader<BufReader<BoxedReader>> {
    /// Open `path`, or stdin when no path is given.
    pub async fn open(path: Option<&Path>) -> std::io::Result<Self> {
        let reader: BoxedReader = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Reading feed from file");
                Box::pin(tokio::fs::File::open(path).await?)
            }
            None => {
                tracing::info!("Reading feed from stdin");
                Box::pin(tokio::io::stdin())
            }
        };
        Ok(Self::new(BufReader::new(reader)))
    }
}
