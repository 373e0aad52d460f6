use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Unit used when displaying temperatures. Samples are always stored in Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Chart presentation and buffering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Chart title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Samples kept per series (default: 60).
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Drawing surface width in pixels (default: 900).
    #[serde(default = "default_width")]
    pub width: f64,

    /// Drawing surface height in pixels (default: 300).
    #[serde(default = "default_height")]
    pub height: f64,

    /// Minimum time between throttled redraws in milliseconds (default: 15000).
    /// 0 redraws on every tick.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    /// How often the host checks whether a redraw is due (default: 1000).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Maximum pointer distance for hover hits in pixels (default: 8).
    #[serde(default = "default_hover_threshold")]
    pub hover_threshold_px: f64,

    /// Unit for temperature labels.
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
}

fn default_title() -> String {
    "Temperature".to_string()
}

fn default_max_points() -> usize {
    60
}

fn default_width() -> f64 {
    900.0
}

fn default_height() -> f64 {
    300.0
}

fn default_refresh_interval() -> u64 {
    15_000
}

fn default_tick_interval() -> u64 {
    1_000
}

fn default_hover_threshold() -> f64 {
    8.0
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            max_points: default_max_points(),
            width: default_width(),
            height: default_height(),
            refresh_interval_ms: default_refresh_interval(),
            tick_interval_ms: default_tick_interval(),
            hover_threshold_px: default_hover_threshold(),
            temperature_unit: TemperatureUnit::default(),
        }
    }
}

/// Kind of device a chart is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// A single sensor.
    Sensor,
    /// An endpoint aggregating several sensors.
    Endpoint,
}

impl DeviceType {
    /// Get the string representation used in storage namespaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Sensor => "sensor",
            DeviceType::Endpoint => "endpoint",
        }
    }
}

/// Which device the chart shows. Empty means every device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Selected device identifier.
    #[serde(default)]
    pub device_id: Option<String>,

    /// Selected device type.
    #[serde(default)]
    pub device_type: Option<DeviceType>,

    /// Sensors belonging to the selected endpoint. Leave unset when the list
    /// is delivered later on the feed.
    #[serde(default)]
    pub endpoint_sensors: Option<Vec<String>>,
}

/// Alert thresholds, in Celsius and percent relative humidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    #[serde(default = "default_temp_min")]
    pub temp_min: f64,
    #[serde(default = "default_temp_max")]
    pub temp_max: f64,
    #[serde(default = "default_temp_critical_min")]
    pub temp_critical_min: f64,
    #[serde(default = "default_temp_critical_max")]
    pub temp_critical_max: f64,
    #[serde(default = "default_humidity_min")]
    pub humidity_min: f64,
    #[serde(default = "default_humidity_max")]
    pub humidity_max: f64,
    #[serde(default = "default_true")]
    pub enable_temp_alerts: bool,
    #[serde(default = "default_true")]
    pub enable_humidity_alerts: bool,

    /// Suppress repeats of the same alert for this long (default: 10000).
    #[serde(default = "default_alert_cooldown")]
    pub cooldown_ms: i64,

    /// Drop active alerts older than this (default: 5 minutes).
    #[serde(default = "default_alert_retention")]
    pub retention_ms: i64,
}

fn default_temp_min() -> f64 {
    15.0
}

fn default_temp_max() -> f64 {
    30.0
}

fn default_temp_critical_min() -> f64 {
    5.0
}

fn default_temp_critical_max() -> f64 {
    40.0
}

fn default_humidity_min() -> f64 {
    30.0
}

fn default_humidity_max() -> f64 {
    80.0
}

fn default_true() -> bool {
    true
}

fn default_alert_cooldown() -> i64 {
    10_000
}

fn default_alert_retention() -> i64 {
    5 * 60_000
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temp_min: default_temp_min(),
            temp_max: default_temp_max(),
            temp_critical_min: default_temp_critical_min(),
            temp_critical_max: default_temp_critical_max(),
            humidity_min: default_humidity_min(),
            humidity_max: default_humidity_max(),
            enable_temp_alerts: true,
            enable_humidity_alerts: true,
            cooldown_ms: default_alert_cooldown(),
            retention_ms: default_alert_retention(),
        }
    }
}

/// Where chart preferences (series visibility, time window) are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage file. Defaults to `<data dir>/agrosight/storage.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Storage namespace. Defaults to `<device id>_<device type>`.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Complete AgroSight configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgroSightConfig {
    /// Chart settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Device selection.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Alert thresholds.
    #[serde(default)]
    pub alerts: AlertThresholds,

    /// Preference storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgroSightConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let chart = &self.chart;

        if chart.max_points == 0 {
            return Err(Error::Config("chart.max_points must be at least 1".into()));
        }

        if !(chart.width.is_finite() && chart.width > 40.0) {
            return Err(Error::Config(format!(
                "chart.width must exceed the 40px of horizontal margins, got {}",
                chart.width
            )));
        }

        if !(chart.height.is_finite() && chart.height > 40.0) {
            return Err(Error::Config(format!(
                "chart.height must exceed the 40px of vertical margins, got {}",
                chart.height
            )));
        }

        if !(chart.hover_threshold_px.is_finite() && chart.hover_threshold_px > 0.0) {
            return Err(Error::Config(
                "chart.hover_threshold_px must be a positive number".into(),
            ));
        }

        if chart.tick_interval_ms == 0 {
            return Err(Error::Config("chart.tick_interval_ms cannot be 0".into()));
        }

        let alerts = &self.alerts;
        if !(alerts.temp_critical_min <= alerts.temp_min
            && alerts.temp_min <= alerts.temp_max
            && alerts.temp_max <= alerts.temp_critical_max)
        {
            return Err(Error::Config(
                "alerts: expected temp_critical_min <= temp_min <= temp_max <= temp_critical_max"
                    .into(),
            ));
        }

        if alerts.humidity_min > alerts.humidity_max {
            return Err(Error::Config(
                "alerts: humidity_min cannot exceed humidity_max".into(),
            ));
        }

        if self.device.device_type.is_some() && self.device.device_id.is_none() {
            return Err(Error::Config(
                "device.device_type requires device.device_id".into(),
            ));
        }

        Ok(())
    }
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    json5::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    Ok(json5::from_str(content)?)
}
