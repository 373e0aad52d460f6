//! Threshold alerts for incoming readings.

use std::collections::HashMap;
use std::fmt;

use agrosight_common::{AlertThresholds, MetricKind, SeriesKey, TemperatureUnit};

use crate::formatting::format_reading;

/// How serious a threshold crossing is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of the band a reading fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Low,
    High,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Low => "low",
            AlertKind::High => "high",
        }
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Alert ID (unique per monitor).
    pub id: u64,
    /// Series that triggered.
    pub key: SeriesKey,
    pub severity: Severity,
    pub kind: AlertKind,
    /// Value that triggered.
    pub value: f64,
    /// Threshold that was crossed.
    pub threshold: f64,
    /// When the alert was raised (Unix epoch ms).
    pub timestamp: i64,
}

impl Alert {
    /// Format the alert message.
    pub fn message(&self, unit: TemperatureUnit) -> String {
        let what = match self.key.metric {
            MetricKind::Temperature => "Temperature",
            MetricKind::Humidity => "Humidity",
        };
        let level = match self.severity {
            Severity::Critical => "critically ",
            Severity::Warning => "",
        };

        format!(
            "{} {}: {} {}{} (threshold: {})",
            self.key.entity_id,
            what,
            format_reading(self.key.metric, self.value, unit),
            level,
            self.kind.as_str(),
            format_reading(self.key.metric, self.threshold, unit)
        )
    }
}

/// Classify a value against a `[min, max]` band.
fn classify(value: f64, min: f64, max: f64) -> Option<(AlertKind, f64)> {
    if value < min {
        Some((AlertKind::Low, min))
    } else if value > max {
        Some((AlertKind::High, max))
    } else {
        None
    }
}

/// Evaluates readings against thresholds, with per-series cooldown.
#[derive(Debug)]
pub struct AlertMonitor {
    thresholds: AlertThresholds,
    /// Active alerts, most recent first.
    alerts: Vec<Alert>,
    /// Last raise time per series and side.
    recent_alerts: HashMap<(SeriesKey, AlertKind), i64>,
    next_alert_id: u64,
    /// Maximum alerts to keep.
    pub max_alerts: usize,
}

impl Default for AlertMonitor {
    fn default() -> Self {
        Self::new(AlertThresholds::default())
    }
}

impl AlertMonitor {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            alerts: Vec::new(),
            recent_alerts: HashMap::new(),
            next_alert_id: 1,
            max_alerts: 100,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Active alerts, most recent first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Evaluate one reading observed at `now`.
    ///
    /// Returns the alert if one was raised. Non-finite values never alert.
    pub fn check(&mut self, key: &SeriesKey, value: f64, now: i64) -> Option<Alert> {
        if !value.is_finite() {
            return None;
        }

        let (severity, kind, threshold) = self.evaluate(key.metric, value)?;

        let cooldown_key = (key.clone(), kind);
        if let Some(&last) = self.recent_alerts.get(&cooldown_key) {
            if now.saturating_sub(last) < self.thresholds.cooldown_ms {
                return None;
            }
        }

        let alert = Alert {
            id: self.next_alert_id,
            key: key.clone(),
            severity,
            kind,
            value,
            threshold,
            timestamp: now,
        };
        self.next_alert_id += 1;
        self.recent_alerts.insert(cooldown_key, now);

        self.alerts.retain(|a| !(a.key == alert.key && a.kind == alert.kind));
        self.alerts.insert(0, alert.clone());
        self.alerts.truncate(self.max_alerts);

        tracing::warn!(
            series = %alert.key,
            severity = %alert.severity,
            kind = alert.kind.as_str(),
            value = alert.value,
            threshold = alert.threshold,
            "Threshold alert"
        );

        Some(alert)
    }

    fn evaluate(&self, metric: MetricKind, value: f64) -> Option<(Severity, AlertKind, f64)> {
        let t = &self.thresholds;
        match metric {
            MetricKind::Temperature if t.enable_temp_alerts => {
                if let Some((kind, threshold)) =
                    classify(value, t.temp_critical_min, t.temp_critical_max)
                {
                    return Some((Severity::Critical, kind, threshold));
                }
                classify(value, t.temp_min, t.temp_max)
                    .map(|(kind, threshold)| (Severity::Warning, kind, threshold))
            }
            MetricKind::Humidity if t.enable_humidity_alerts => {
                classify(value, t.humidity_min, t.humidity_max)
                    .map(|(kind, threshold)| (Severity::Warning, kind, threshold))
            }
            _ => None,
        }
    }

    /// Drop active alerts older than the retention period and forget
    /// cooldowns that have expired.
    pub fn prune(&mut self, now: i64) {
        let retention = self.thresholds.retention_ms;
        let cooldown = self.thresholds.cooldown_ms;

        self.alerts.retain(|a| now.saturating_sub(a.timestamp) <= retention);
        self.recent_alerts.retain(|_, last| now.saturating_sub(*last) < cooldown);
    }

    /// Clear all alerts and cooldowns.
    pub fn clear(&mut self) {
        self.alerts.clear();
        self.recent_alerts.clear();
    }
}
