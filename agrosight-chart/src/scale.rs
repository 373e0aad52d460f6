//! Mapping samples to drawing-surface coordinates.

use agrosight_common::MetricKind;

use crate::window::TimeRange;

/// Padding added to each side of the plot area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 20.0,
            right: 20.0,
            top: 20.0,
            bottom: 20.0,
        }
    }
}

/// Drawing surface size plus margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl Viewport {
    /// Create a viewport with the default 20px margins.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margins: Margins::default(),
        }
    }

    /// Left edge of the plot area.
    pub fn plot_left(&self) -> f64 {
        self.margins.left
    }

    /// Right edge of the plot area.
    pub fn plot_right(&self) -> f64 {
        self.width - self.margins.right
    }

    /// Top edge of the plot area.
    pub fn plot_top(&self) -> f64 {
        self.margins.top
    }

    /// Bottom edge of the plot area.
    pub fn plot_bottom(&self) -> f64 {
        self.height - self.margins.bottom
    }

    /// Width of the plot area.
    pub fn plot_width(&self) -> f64 {
        self.plot_right() - self.plot_left()
    }

    /// Height of the plot area.
    pub fn plot_height(&self) -> f64 {
        self.plot_bottom() - self.plot_top()
    }

    /// Map a timestamp onto the horizontal plot extent.
    ///
    /// Returns `None` for timestamps outside `range`; such points must be
    /// skipped, not drawn at the edge. A zero-length range maps everything in
    /// it to the left margin.
    pub fn map_x(&self, timestamp: i64, range: TimeRange) -> Option<f64> {
        if !range.contains(timestamp) {
            return None;
        }

        let span = i128::from(range.to) - i128::from(range.from);
        if span == 0 {
            return Some(self.plot_left());
        }

        let fraction = (i128::from(timestamp) - i128::from(range.from)) as f64 / span as f64;
        Some(self.plot_left() + fraction * self.plot_width())
    }

    /// Map a value onto the vertical plot extent. Larger values sit higher.
    pub fn map_y(&self, value: f64, axis: AxisRange) -> f64 {
        let span = axis.span();
        if !(span.is_finite() && span > 0.0) {
            return self.plot_bottom();
        }

        let fraction = (value - axis.min) / span;
        self.plot_bottom() - fraction * self.plot_height()
    }
}

/// Y-axis bounds for one metric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Create a new axis range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range used when a metric has nothing to scale against.
    pub fn fallback(metric: MetricKind) -> Self {
        match metric {
            MetricKind::Temperature => Self::new(0.0, 1.0),
            MetricKind::Humidity => Self::new(0.0, 100.0),
        }
    }

    /// Scale to the given values, padded by 10% of their spread on each side
    /// (5 units when the spread is zero) and widened to whole units.
    ///
    /// Non-finite values are ignored. With no usable values the fallback is
    /// returned unpadded.
    pub fn from_values(values: impl IntoIterator<Item = f64>, fallback: AxisRange) -> Self {
        let bounds = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });

        let Some((min, max)) = bounds else {
            return fallback;
        };

        let spread = max - min;
        let padding = if spread > 0.0 { spread * 0.1 } else { 5.0 };

        Self::new((min - padding).floor(), (max + padding).ceil())
    }

    /// Distance between the bounds.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(900.0, 300.0)
    }

    #[test]
    fn test_map_x_hits_margins_at_range_ends() {
        let vp = viewport();
        for (from, to) in [(0, 1), (1_000, 3_601_000), (-50, 50)] {
            let range = TimeRange::new(from, to);
            assert_eq!(vp.map_x(from, range), Some(20.0));
            assert_eq!(vp.map_x(to, range), Some(880.0));
        }
    }

    #[test]
    fn test_map_x_linear() {
        let vp = viewport();
        let range = TimeRange::new(0, 1_000);
        assert_eq!(vp.map_x(500, range), Some(450.0));
    }

    #[test]
    fn test_map_x_out_of_range_is_none() {
        let vp = viewport();
        let range = TimeRange::new(100, 200);
        assert_eq!(vp.map_x(99, range), None);
        assert_eq!(vp.map_x(201, range), None);
    }

    #[test]
    fn test_map_x_full_i64_range() {
        let vp = viewport();
        let range = TimeRange::new(i64::MIN, i64::MAX);
        assert_eq!(vp.map_x(i64::MIN, range), Some(20.0));
        assert_eq!(vp.map_x(i64::MAX, range), Some(880.0));

        let middle = vp.map_x(0, range).unwrap();
        assert!((middle - 450.0).abs() < 1e-6);
    }

    #[test]
    fn test_map_x_zero_length_range() {
        let vp = viewport();
        let range = TimeRange::new(100, 100);
        assert_eq!(vp.map_x(100, range), Some(20.0));
        assert_eq!(vp.map_x(101, range), None);
    }

    #[test]
    fn test_map_x_inverted_range() {
        let vp = viewport();
        assert_eq!(vp.map_x(150, TimeRange::new(200, 100)), None);
    }

    #[test]
    fn test_map_y_inverted_axis() {
        let vp = viewport();
        let axis = AxisRange::new(0.0, 100.0);
        assert_eq!(vp.map_y(0.0, axis), 280.0);
        assert_eq!(vp.map_y(100.0, axis), 20.0);
        assert_eq!(vp.map_y(50.0, axis), 150.0);
    }

    #[test]
    fn test_map_y_zero_span_does_not_divide() {
        let vp = viewport();
        let y = vp.map_y(3.0, AxisRange::new(3.0, 3.0));
        assert_eq!(y, 280.0);
    }

    #[test]
    fn test_axis_padding() {
        let axis = AxisRange::from_values([10.0, 30.0], AxisRange::fallback(MetricKind::Temperature));
        assert_eq!(axis, AxisRange::new(8.0, 32.0));

        let narrow = AxisRange::from_values([20.0, 21.0], AxisRange::new(0.0, 1.0));
        assert_eq!(narrow, AxisRange::new(19.0, 22.0));
    }

    #[test]
    fn test_flat_series_gets_nonzero_span() {
        let axis = AxisRange::from_values([22.5; 10], AxisRange::new(0.0, 1.0));
        assert_eq!(axis, AxisRange::new(17.0, 28.0));
        assert!(axis.span() > 0.0);

        let vp = viewport();
        let y = vp.map_y(22.5, axis);
        assert!(y.is_finite());
    }

    #[test]
    fn test_axis_fallbacks() {
        let empty = AxisRange::from_values(Vec::new(), AxisRange::fallback(MetricKind::Humidity));
        assert_eq!(empty, AxisRange::new(0.0, 100.0));

        let nan_only =
            AxisRange::from_values([f64::NAN], AxisRange::fallback(MetricKind::Temperature));
        assert_eq!(nan_only, AxisRange::new(0.0, 1.0));
    }
}
