//! The chart facade: buffers, visibility, time window, hover and redraw
//! throttling behind one type.
//!
//! The chart never reads the clock itself. Every query takes `now` in epoch
//! milliseconds and resolves the time window exactly once, so scaling,
//! plotting and hit testing always agree on which samples are eligible.

use std::collections::BTreeMap;

use agrosight_common::{ChartConfig, MetricKind, Sample, SeriesKey};

use crate::buffer::SeriesBuffers;
use crate::hit::{self, Hit};
use crate::ingest::Reading;
use crate::plot::{Axes, PlottedSeries, compute_axes, plot_series};
use crate::render::{Renderer, Scene};
use crate::scale::{AxisRange, Viewport};
use crate::storage::ChartStorage;
use crate::surface::{Color, DrawSurface, color_for_key};
use crate::window::{TimeRange, WindowDescriptor, resolve};

/// Limits how often a dirty chart is redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawThrottle {
    interval_ms: u64,
    last_draw: Option<i64>,
}

impl RedrawThrottle {
    /// An interval of 0 lets every check through.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_draw: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Whether enough time has passed since the last draw.
    pub fn is_due(&self, now: i64) -> bool {
        match self.last_draw {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval_ms as i64,
        }
    }

    /// Note that a draw happened at `now`.
    pub fn record(&mut self, now: i64) {
        self.last_draw = Some(now);
    }
}

/// Statistics for one series over the active window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartStats {
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Average value.
    pub avg: f64,
    /// Current (most recent) value.
    pub current: Option<f64>,
    /// Number of data points.
    pub count: usize,
}

impl ChartStats {
    fn from_samples(samples: &[Sample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let sum: f64 = samples.iter().map(|s| s.value).sum();
        let count = samples.len();
        let avg = sum / count as f64;

        let min = samples
            .iter()
            .map(|s| s.value)
            .fold(f64::INFINITY, f64::min);
        let max = samples
            .iter()
            .map(|s| s.value)
            .fold(f64::NEG_INFINITY, f64::max);

        let current = samples.last().map(|s| s.value);

        Self {
            min,
            max,
            avg,
            current,
            count,
        }
    }
}

/// One row of the series legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub key: SeriesKey,
    pub color: Color,
    pub visible: bool,
    /// Most recent sample, regardless of the window.
    pub latest: Option<Sample>,
}

/// A multi-series sensor chart.
#[derive(Debug)]
pub struct Chart {
    title: String,
    buffers: SeriesBuffers,
    visibility: BTreeMap<SeriesKey, bool>,
    window: WindowDescriptor,
    viewport: Viewport,
    /// Pointer position while hovering.
    hover: Option<(f64, f64)>,
    hover_threshold: f64,
    throttle: RedrawThrottle,
    renderer: Renderer,
    storage: Option<ChartStorage>,
}

impl Default for Chart {
    fn default() -> Self {
        Self::new(&ChartConfig::default())
    }
}

impl Chart {
    /// Create an empty chart.
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            title: config.title.clone(),
            buffers: SeriesBuffers::new(config.max_points),
            visibility: BTreeMap::new(),
            window: WindowDescriptor::default(),
            viewport: Viewport::new(config.width, config.height),
            hover: None,
            hover_threshold: config.hover_threshold_px,
            throttle: RedrawThrottle::new(config.refresh_interval_ms),
            renderer: Renderer::new(config.temperature_unit),
            storage: None,
        }
    }

    /// Attach preference storage and restore visibility and window from it.
    pub fn with_storage(mut self, storage: ChartStorage) -> Self {
        self.visibility = storage.load_visibility();
        if let Some(window) = storage.load_window() {
            self.window = window;
        }
        tracing::debug!(
            namespace = storage.namespace(),
            filters = self.visibility.len(),
            window = ?self.window,
            "Restored chart preferences"
        );
        self.storage = Some(storage);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn buffers(&self) -> &SeriesBuffers {
        &self.buffers
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Append a sample. Non-finite values are refused.
    pub fn push(&mut self, key: SeriesKey, sample: Sample) -> bool {
        if !sample.value.is_finite() {
            tracing::debug!(series = %key, value = sample.value, "Refusing non-finite sample");
            return false;
        }
        self.buffers.push(key, sample);
        true
    }

    /// Append a normalized reading.
    pub fn push_reading(&mut self, reading: Reading) -> bool {
        self.push(reading.key, reading.sample)
    }

    pub fn capacity(&self) -> usize {
        self.buffers.capacity()
    }

    /// Change the per-series capacity, trimming existing buffers immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.buffers.set_capacity(capacity);
    }

    /// Change the drawing surface size.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.buffers.mark_dirty();
    }

    pub fn window(&self) -> WindowDescriptor {
        self.window
    }

    /// Select a time window and persist the choice.
    pub fn set_window(&mut self, window: WindowDescriptor) {
        self.window = window;
        self.buffers.mark_dirty();
        if let Some(storage) = &mut self.storage {
            storage.save_window(&self.window);
        }
    }

    /// Resolve the active window at `now`.
    pub fn time_range(&self, now: i64) -> TimeRange {
        resolve(&self.window, now)
    }

    /// Series are visible unless explicitly hidden.
    pub fn is_visible(&self, key: &SeriesKey) -> bool {
        self.visibility.get(key).copied().unwrap_or(true)
    }

    pub fn set_visible(&mut self, key: SeriesKey, visible: bool) {
        self.visibility.insert(key, visible);
        self.visibility_changed();
    }

    /// Flip a series' visibility, returning the new state.
    pub fn toggle_visibility(&mut self, key: &SeriesKey) -> bool {
        let visible = !self.is_visible(key);
        self.set_visible(key.clone(), visible);
        visible
    }

    /// Make every known series visible.
    pub fn show_all(&mut self) {
        self.set_all(true);
    }

    /// Hide every known series.
    pub fn hide_all(&mut self) {
        self.set_all(false);
    }

    fn set_all(&mut self, visible: bool) {
        let keys: Vec<SeriesKey> = self.buffers.keys().cloned().collect();
        for key in keys {
            self.visibility.insert(key, visible);
        }
        for flag in self.visibility.values_mut() {
            *flag = visible;
        }
        self.visibility_changed();
    }

    fn visibility_changed(&mut self) {
        self.buffers.mark_dirty();
        if let Some(storage) = &mut self.storage {
            storage.save_visibility(&self.visibility);
        }
    }

    fn axes(&self, range: TimeRange) -> Axes {
        compute_axes(&self.buffers, |k| self.is_visible(k), range)
    }

    fn plot(&self, range: TimeRange, axes: &Axes) -> Vec<PlottedSeries> {
        plot_series(
            &self.buffers,
            |k| self.is_visible(k),
            &self.viewport,
            range,
            axes,
        )
    }

    /// Visible series with their in-window points placed on the surface.
    pub fn visible_series(&self, now: i64) -> Vec<PlottedSeries> {
        let range = self.time_range(now);
        let axes = self.axes(range);
        self.plot(range, &axes)
    }

    /// Y-axis range for a metric kind at `now`.
    pub fn axis_labels(&self, metric: MetricKind, now: i64) -> AxisRange {
        self.axes(self.time_range(now)).get(metric)
    }

    /// Nearest plotted point to `(px, py)` within the hover threshold.
    pub fn find_nearest(&self, px: f64, py: f64, now: i64) -> Option<Hit> {
        hit::find_nearest(&self.visible_series(now), px, py, self.hover_threshold)
    }

    /// Track the pointer at `(px, py)`, returning the point under it.
    pub fn hover(&mut self, px: f64, py: f64, now: i64) -> Option<Hit> {
        self.hover = Some((px, py));
        self.find_nearest(px, py, now)
    }

    /// Stop tracking the pointer.
    pub fn clear_hover(&mut self) {
        if self.hover.take().is_some() {
            self.buffers.mark_dirty();
        }
    }

    pub fn is_hovering(&self) -> bool {
        self.hover.is_some()
    }

    /// Statistics over the in-window samples of one series.
    pub fn stats(&self, key: &SeriesKey, now: i64) -> ChartStats {
        let range = self.time_range(now);
        if range.is_degenerate() {
            return ChartStats::default();
        }
        let samples = crate::window::clip(self.buffers.iter(key), range);
        ChartStats::from_samples(&samples)
    }

    /// Every known series with its colour, visibility and latest sample.
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.buffers
            .keys()
            .map(|key| LegendEntry {
                key: key.clone(),
                color: color_for_key(key),
                visible: self.is_visible(key),
                latest: self.buffers.latest(key),
            })
            .collect()
    }

    /// Draw a full frame.
    pub fn render<S: DrawSurface + ?Sized>(&self, surface: &mut S, now: i64) {
        let range = self.time_range(now);
        let axes = self.axes(range);
        let series = self.plot(range, &axes);
        let hovered = self
            .hover
            .and_then(|(px, py)| hit::find_nearest(&series, px, py, self.hover_threshold));

        let scene = Scene {
            viewport: self.viewport,
            range,
            axes,
            series: &series,
            hover: hovered.as_ref(),
        };
        self.renderer.draw(surface, &scene);
    }

    /// Redraw if needed, returning whether a frame was drawn.
    ///
    /// A dirty chart redraws once the refresh interval has elapsed. While
    /// hovering, every call redraws.
    pub fn frame<S: DrawSurface + ?Sized>(&mut self, surface: &mut S, now: i64) -> bool {
        if self.hover.is_none() && !(self.buffers.is_dirty() && self.throttle.is_due(now)) {
            return false;
        }

        self.render(surface, now);
        self.throttle.record(now);
        if self.hover.is_none() {
            self.buffers.take_dirty();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::surface::RecordingSurface;
    use crate::window::{HOUR_MS, RelativeWindow};

    const NOW: i64 = 100 * HOUR_MS;

    fn chart() -> Chart {
        Chart::new(&ChartConfig::default())
    }

    #[test]
    fn test_throttle() {
        let mut throttle = RedrawThrottle::new(15_000);
        assert!(throttle.is_due(0));
        throttle.record(0);
        assert!(!throttle.is_due(14_999));
        assert!(throttle.is_due(15_000));

        let mut eager = RedrawThrottle::new(0);
        eager.record(5);
        assert!(eager.is_due(5));
    }

    #[test]
    fn test_push_refuses_non_finite() {
        let mut chart = chart();
        let key = SeriesKey::temperature("s1");

        assert!(!chart.push(key.clone(), Sample::new(NOW, f64::NAN)));
        assert!(!chart.push(key.clone(), Sample::new(NOW, f64::NEG_INFINITY)));
        assert!(chart.push(key.clone(), Sample::new(NOW, 20.0)));
        assert_eq!(chart.buffers().len(&key), 1);
    }

    #[test]
    fn test_chart_stats() {
        let mut chart = chart();
        let key = SeriesKey::temperature("s1");

        chart.push(key.clone(), Sample::new(NOW - 2 * HOUR_MS, 99.0));
        chart.push(key.clone(), Sample::new(NOW - 3_000, 10.0));
        chart.push(key.clone(), Sample::new(NOW - 2_000, 20.0));
        chart.push(key.clone(), Sample::new(NOW - 1_000, 15.0));

        let stats = chart.stats(&key, NOW);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 20.0);
        assert_eq!(stats.avg, 15.0);
        assert_eq!(stats.current, Some(15.0));

        assert_eq!(chart.stats(&SeriesKey::humidity("s1"), NOW), ChartStats::default());
    }

    #[test]
    fn test_visibility_controls() {
        let mut chart = chart();
        let a = SeriesKey::temperature("a");
        let b = SeriesKey::humidity("b");
        chart.push(a.clone(), Sample::new(NOW, 20.0));
        chart.push(b.clone(), Sample::new(NOW, 50.0));

        assert!(chart.is_visible(&a));
        assert!(!chart.toggle_visibility(&a));
        assert!(!chart.is_visible(&a));

        chart.hide_all();
        assert!(chart.visible_series(NOW).is_empty());

        chart.show_all();
        assert_eq!(chart.visible_series(NOW).len(), 2);
    }

    #[test]
    fn test_preferences_persist() {
        let mut store = MemoryStore::new();
        store
            .set("chart_filters_s1_sensor", r#"{"s1:hum":false}"#)
            .unwrap();
        store
            .set("chart_time_range_s1_sensor", r#"{"type":"quick","value":"6h"}"#)
            .unwrap();

        let mut chart = chart().with_storage(ChartStorage::new(store, "s1_sensor"));
        assert!(!chart.is_visible(&SeriesKey::humidity("s1")));
        assert_eq!(chart.window(), WindowDescriptor::Relative(RelativeWindow::SixHours));

        chart.set_window(WindowDescriptor::Relative(RelativeWindow::OneWeek));
        chart.set_visible(SeriesKey::temperature("s1"), false);

        // Round-trip through a fresh chart sharing nothing but the stored text.
        let storage = chart.storage.take().unwrap();
        let restored = Chart::default().with_storage(storage);
        assert_eq!(restored.window(), WindowDescriptor::Relative(RelativeWindow::OneWeek));
        assert!(!restored.is_visible(&SeriesKey::temperature("s1")));
        assert!(!restored.is_visible(&SeriesKey::humidity("s1")));
    }

    #[test]
    fn test_frame_throttles_until_dirty_and_due() {
        let mut chart = chart();
        let mut surface = RecordingSurface::new();

        // Nothing pushed yet: not dirty.
        assert!(!chart.frame(&mut surface, NOW));

        chart.push(SeriesKey::temperature("s1"), Sample::new(NOW, 20.0));
        assert!(chart.frame(&mut surface, NOW));
        assert!(!chart.frame(&mut surface, NOW + 1_000));

        chart.push(SeriesKey::temperature("s1"), Sample::new(NOW + 1_000, 21.0));
        assert!(!chart.frame(&mut surface, NOW + 5_000));
        assert!(chart.frame(&mut surface, NOW + 15_000));
    }

    #[test]
    fn test_hover_bypasses_throttle() {
        let mut chart = chart();
        let mut surface = RecordingSurface::new();
        chart.push(SeriesKey::temperature("s1"), Sample::new(NOW, 20.0));
        assert!(chart.frame(&mut surface, NOW));

        let point = chart.visible_series(NOW)[0].points[0];
        let hit = chart
            .hover(f64::from(point.x), f64::from(point.y), NOW)
            .unwrap();
        assert_eq!(hit.sample, Sample::new(NOW, 20.0));

        assert!(chart.frame(&mut surface, NOW + 1));
        assert!(chart.frame(&mut surface, NOW + 2));
        assert_eq!(surface.circles().len(), 1);

        chart.clear_hover();
        assert!(!chart.is_hovering());
        // The highlight must be cleared on the next due frame.
        assert!(chart.frame(&mut surface, NOW + 15_002));
        assert!(surface.circles().is_empty());
    }

    #[test]
    fn test_degenerate_window_is_empty() {
        let mut chart = chart();
        chart.push(SeriesKey::temperature("s1"), Sample::new(1_000, 20.0));
        chart.set_window(WindowDescriptor::Absolute {
            from: Some(1_000),
            to: Some(1_000),
        });

        assert!(chart.visible_series(NOW).is_empty());
        assert!(chart.find_nearest(20.0, 150.0, NOW).is_none());
        assert_eq!(
            chart.axis_labels(MetricKind::Temperature, NOW),
            AxisRange::fallback(MetricKind::Temperature)
        );

        let mut surface = RecordingSurface::new();
        chart.render(&mut surface, NOW);
        assert_eq!(surface.texts(), vec![crate::render::WAITING_MESSAGE]);
    }

    #[test]
    fn test_stored_extreme_window_renders() {
        let mut store = MemoryStore::new();
        store
            .set(
                "chart_time_range_s1_sensor",
                r#"{"type":"custom","from":-1e300,"to":1e300}"#,
            )
            .unwrap();

        let mut chart = chart().with_storage(ChartStorage::new(store, "s1_sensor"));
        chart.push(SeriesKey::temperature("s1"), Sample::new(NOW - 60_000, 20.0));
        assert_eq!(chart.visible_series(NOW).len(), 1);

        chart.set_window(WindowDescriptor::Absolute {
            from: Some(i64::MIN),
            to: Some(i64::MAX),
        });
        let series = chart.visible_series(NOW);
        assert_eq!(series.len(), 1);
        assert!(series[0].points.iter().all(|p| (20..=880).contains(&p.x)));

        let mut surface = RecordingSurface::new();
        chart.render(&mut surface, NOW);
        assert!(!surface.texts().contains(&crate::render::WAITING_MESSAGE));
    }

    #[test]
    fn test_legend() {
        let mut chart = chart();
        chart.push(SeriesKey::temperature("s1"), Sample::new(1, 20.0));
        chart.push(SeriesKey::temperature("s1"), Sample::new(2, 21.0));
        chart.set_visible(SeriesKey::humidity("s1"), false);

        let legend = chart.legend();
        assert_eq!(legend.len(), 1);
        assert_eq!(legend[0].latest, Some(Sample::new(2, 21.0)));
        assert!(legend[0].visible);
    }

    #[test]
    fn test_resize_moves_right_edge() {
        let mut chart = chart();
        chart.push(SeriesKey::temperature("s1"), Sample::new(NOW, 20.0));
        chart.resize(400.0, 200.0);

        let series = chart.visible_series(NOW);
        assert_eq!(series[0].points[0].x, 380);
        assert_eq!(chart.viewport().height, 200.0);
        assert!(chart.buffers().is_dirty());
    }
}
