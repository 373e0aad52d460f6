//! Time-window selection and sample clipping.
//!
//! A [`WindowDescriptor`] is what the user picked (a relative preset or an
//! absolute range); [`resolve`] turns it into a concrete [`TimeRange`] for a
//! given `now`. The chart resolves once per query and hands the same range to
//! scaling, plotting and hit testing so all three agree.

use std::fmt;

use agrosight_common::{RawTimestamp, Sample};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::formatting::format_day_time;

/// One hour in milliseconds.
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Relative window presets, measured back from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelativeWindow {
    /// Last hour (default).
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    /// Last 6 hours.
    #[serde(rename = "6h")]
    SixHours,
    /// Last 24 hours.
    #[serde(rename = "24h")]
    OneDay,
    /// Last 7 days.
    #[serde(rename = "7d")]
    OneWeek,
}

impl RelativeWindow {
    /// Get the window duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        match self {
            RelativeWindow::OneHour => HOUR_MS,
            RelativeWindow::SixHours => 6 * HOUR_MS,
            RelativeWindow::OneDay => 24 * HOUR_MS,
            RelativeWindow::OneWeek => 7 * 24 * HOUR_MS,
        }
    }

    /// Short identifier, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeWindow::OneHour => "1h",
            RelativeWindow::SixHours => "6h",
            RelativeWindow::OneDay => "24h",
            RelativeWindow::OneWeek => "7d",
        }
    }

    /// Get the display label.
    pub fn label(&self) -> &'static str {
        match self {
            RelativeWindow::OneHour => "Last hour",
            RelativeWindow::SixHours => "Last 6h",
            RelativeWindow::OneDay => "Last 24h",
            RelativeWindow::OneWeek => "Last week",
        }
    }

    /// Get all relative window options.
    pub fn all() -> &'static [RelativeWindow] {
        &[
            RelativeWindow::OneHour,
            RelativeWindow::SixHours,
            RelativeWindow::OneDay,
            RelativeWindow::OneWeek,
        ]
    }

    /// Parse a short identifier such as `"6h"`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|w| w.as_str() == s)
    }
}

impl fmt::Display for RelativeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's time window choice. Exactly one form is active at a time.
///
/// Persisted as a flat object `{type, value, from, to}`, where `type` is
/// `"quick"` for relative windows and `"custom"` for absolute ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredWindow", into = "StoredWindow")]
pub enum WindowDescriptor {
    /// A preset duration back from now.
    Relative(RelativeWindow),
    /// An absolute range. Missing bounds default at resolve time.
    Absolute { from: Option<i64>, to: Option<i64> },
}

impl Default for WindowDescriptor {
    fn default() -> Self {
        WindowDescriptor::Relative(RelativeWindow::default())
    }
}

impl WindowDescriptor {
    /// Resolve against `now`. See [`resolve`].
    pub fn resolve(&self, now: i64) -> TimeRange {
        resolve(self, now)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredWindow {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    from: Option<RawTimestamp>,
    #[serde(default)]
    to: Option<RawTimestamp>,
}

impl From<StoredWindow> for WindowDescriptor {
    fn from(stored: StoredWindow) -> Self {
        match stored.kind.as_str() {
            "custom" => WindowDescriptor::Absolute {
                from: stored.from.and_then(stored_instant),
                to: stored.to.and_then(stored_instant),
            },
            // Unknown types and values fall back to the last hour.
            _ => WindowDescriptor::Relative(
                stored
                    .value
                    .as_deref()
                    .and_then(RelativeWindow::parse)
                    .unwrap_or_default(),
            ),
        }
    }
}

/// A stored bound, dropped when it is not a date the formatter can show.
fn stored_instant(raw: RawTimestamp) -> Option<i64> {
    raw.to_millis()
        .ok()
        .filter(|ms| DateTime::from_timestamp_millis(*ms).is_some())
}

impl From<WindowDescriptor> for StoredWindow {
    fn from(descriptor: WindowDescriptor) -> Self {
        match descriptor {
            WindowDescriptor::Relative(window) => StoredWindow {
                kind: "quick".to_string(),
                value: Some(window.as_str().to_string()),
                from: None,
                to: None,
            },
            WindowDescriptor::Absolute { from, to } => StoredWindow {
                kind: "custom".to_string(),
                value: None,
                from: from.map(iso_timestamp),
                to: to.map(iso_timestamp),
            },
        }
    }
}

fn iso_timestamp(ms: i64) -> RawTimestamp {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => RawTimestamp::Text(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => RawTimestamp::Millis(ms),
    }
}

/// A concrete `[from, to]` range in epoch milliseconds, both ends inclusive.
///
/// `from <= to` is not guaranteed; see [`is_degenerate`](Self::is_degenerate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

impl TimeRange {
    /// Create a new range.
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Whether `timestamp` lies within the range.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }

    /// True when `to <= from`. Charts treat such a range as holding no samples.
    pub fn is_degenerate(&self) -> bool {
        self.to <= self.from
    }

    /// Span of the range in milliseconds (0 when degenerate).
    pub fn duration_ms(&self) -> i64 {
        self.to.saturating_sub(self.from).max(0)
    }

    /// Range indicator text, e.g. `"3/5 09:00 - 3/5 10:00"`.
    pub fn describe(&self) -> String {
        format!("{} - {}", format_day_time(self.from), format_day_time(self.to))
    }
}

/// Turn a window descriptor into a concrete range.
///
/// Relative windows end at `now`. Absolute windows are returned verbatim,
/// with a missing `from` defaulting to `now - 1h` and a missing `to` to `now`.
pub fn resolve(descriptor: &WindowDescriptor, now: i64) -> TimeRange {
    match *descriptor {
        WindowDescriptor::Relative(window) => {
            TimeRange::new(now.saturating_sub(window.duration_ms()), now)
        }
        WindowDescriptor::Absolute { from, to } => {
            TimeRange::new(from.unwrap_or(now.saturating_sub(HOUR_MS)), to.unwrap_or(now))
        }
    }
}

/// Keep the samples with `from <= timestamp <= to`, preserving order.
pub fn clip<'a>(samples: impl IntoIterator<Item = &'a Sample>, range: TimeRange) -> Vec<Sample> {
    samples
        .into_iter()
        .filter(|s| range.contains(s.timestamp))
        .copied()
        .collect()
}
