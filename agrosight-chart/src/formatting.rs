//! Shared formatting utilities for chart labels and tooltips.
//!
//! Times are rendered in UTC.

use agrosight_common::{MetricKind, TemperatureUnit};
use chrono::DateTime;

use crate::window::HOUR_MS;

/// Convert a Celsius reading to the display unit.
pub fn convert_temperature(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    }
}

/// Unit symbol for temperatures.
pub fn temperature_symbol(unit: TemperatureUnit) -> &'static str {
    match unit {
        TemperatureUnit::Celsius => "°C",
        TemperatureUnit::Fahrenheit => "°F",
    }
}

/// Format a Celsius reading in the display unit, e.g. `"21.5°C"`.
pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    format!(
        "{:.1}{}",
        convert_temperature(celsius, unit),
        temperature_symbol(unit)
    )
}

/// Format a relative humidity reading, e.g. `"55.0%"`.
pub fn format_humidity(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format a reading according to its metric kind.
pub fn format_reading(metric: MetricKind, value: f64, unit: TemperatureUnit) -> String {
    match metric {
        MetricKind::Temperature => format_temperature(value, unit),
        MetricKind::Humidity => format_humidity(value),
    }
}

/// Format epoch milliseconds as `HH:MM`.
pub fn format_clock(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Format epoch milliseconds as `D/M HH:MM`.
pub fn format_day_time(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%-d/%-m %H:%M").to_string())
        .unwrap_or_else(|| "--/-- --:--".to_string())
}

/// Format a time-axis label. Spans longer than a day include the date.
pub fn format_axis_time(timestamp_ms: i64, span_ms: i64) -> String {
    if span_ms > 24 * HOUR_MS {
        format_day_time(timestamp_ms)
    } else {
        format_clock(timestamp_ms)
    }
}
