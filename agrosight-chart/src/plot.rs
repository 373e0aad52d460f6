//! Per-metric scaling and point placement for visible series.

use agrosight_common::{MetricKind, Sample, SeriesKey};

use crate::buffer::SeriesBuffers;
use crate::scale::{AxisRange, Viewport};
use crate::window::TimeRange;

/// A sample placed on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlottedPoint {
    /// Horizontal pixel position.
    pub x: i32,
    /// Vertical pixel position.
    pub y: i32,
    /// Position of the sample in its series buffer.
    pub index: usize,
    /// The sample itself.
    pub sample: Sample,
}

/// One visible series with its in-window points, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedSeries {
    pub key: SeriesKey,
    pub points: Vec<PlottedPoint>,
}

/// Y-axis ranges for every metric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axes {
    pub temperature: AxisRange,
    pub humidity: AxisRange,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            temperature: AxisRange::fallback(MetricKind::Temperature),
            humidity: AxisRange::fallback(MetricKind::Humidity),
        }
    }
}

impl Axes {
    /// Axis range for a metric kind.
    pub fn get(&self, metric: MetricKind) -> AxisRange {
        match metric {
            MetricKind::Temperature => self.temperature,
            MetricKind::Humidity => self.humidity,
        }
    }
}

/// Scale each metric kind to the in-window samples of its visible series.
///
/// A degenerate range yields the fallback axes.
pub fn compute_axes(
    buffers: &SeriesBuffers,
    is_visible: impl Fn(&SeriesKey) -> bool,
    range: TimeRange,
) -> Axes {
    if range.is_degenerate() {
        return Axes::default();
    }

    let axis_for = |metric: MetricKind| {
        let values = buffers
            .series()
            .filter(|(key, _)| key.metric == metric && is_visible(*key))
            .flat_map(|(_, samples)| samples.iter())
            .filter(|s| range.contains(s.timestamp))
            .map(|s| s.value);
        AxisRange::from_values(values, AxisRange::fallback(metric))
    };

    Axes {
        temperature: axis_for(MetricKind::Temperature),
        humidity: axis_for(MetricKind::Humidity),
    }
}

/// Place every in-window sample of every visible series.
///
/// Series are returned in key order; series with no in-window samples are
/// left out. A degenerate range yields nothing.
pub fn plot_series(
    buffers: &SeriesBuffers,
    is_visible: impl Fn(&SeriesKey) -> bool,
    viewport: &Viewport,
    range: TimeRange,
    axes: &Axes,
) -> Vec<PlottedSeries> {
    if range.is_degenerate() {
        return Vec::new();
    }

    buffers
        .series()
        .filter(|(key, _)| is_visible(*key))
        .filter_map(|(key, samples)| {
            let axis = axes.get(key.metric);
            let points: Vec<PlottedPoint> = samples
                .iter()
                .enumerate()
                .filter_map(|(index, sample)| {
                    let x = viewport.map_x(sample.timestamp, range)?;
                    let y = viewport.map_y(sample.value, axis);
                    Some(PlottedPoint {
                        x: x.round() as i32,
                        y: y.round() as i32,
                        index,
                        sample: *sample,
                    })
                })
                .collect();

            (!points.is_empty()).then(|| PlottedSeries {
                key: key.clone(),
                points,
            })
        })
        .collect()
}
