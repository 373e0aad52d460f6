//! Frame rendering onto a [`DrawSurface`].

use agrosight_common::{MetricKind, TemperatureUnit};

use crate::formatting::{format_axis_time, format_temperature};
use crate::hit::Hit;
use crate::plot::{Axes, PlottedSeries};
use crate::scale::Viewport;
use crate::surface::{Color, DrawSurface, Point, Stroke, Text, TextAlign, color_for_key};
use crate::window::TimeRange;

/// Horizontal grid lines across the plot area.
pub const GRID_LINES: usize = 5;
/// Labels along the time axis, first and last on the plot edges.
pub const TIME_LABELS: usize = 6;
/// Text shown when there is nothing to plot.
pub const WAITING_MESSAGE: &str = "Waiting for data...";

const POINT_RADIUS: f64 = 2.0;
const HOVER_RADIUS: f64 = 5.0;
const TOOLTIP_OFFSET: f64 = 10.0;
const TOOLTIP_SIZE: f64 = 12.0;
const HOVER_RING_RADIUS: f64 = 8.0;
const SERIES_WIDTH: f64 = 2.0;
const HUMIDITY_DASH: [f64; 2] = [5.0, 4.0];
const GUIDE_DASH: [f64; 2] = [3.0, 3.0];

/// Colours used for everything that is not a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub grid: Color,
    pub label: Color,
    pub guide: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            grid: Color::from_rgb(0x2b, 0x33, 0x41),
            label: Color::from_rgb(0x9a, 0xa4, 0xb2),
            guide: Color::WHITE,
        }
    }
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub viewport: Viewport,
    pub range: TimeRange,
    pub axes: Axes,
    pub series: &'a [PlottedSeries],
    pub hover: Option<&'a Hit>,
}

/// Draws frames in a fixed style.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub theme: Theme,
    pub unit: TemperatureUnit,
}

impl Renderer {
    pub fn new(unit: TemperatureUnit) -> Self {
        Self {
            theme: Theme::default(),
            unit,
        }
    }

    /// Draw a complete frame, replacing whatever the surface held.
    pub fn draw<S: DrawSurface + ?Sized>(&self, surface: &mut S, scene: &Scene<'_>) {
        let vp = scene.viewport;
        surface.clear(vp.width, vp.height);

        self.draw_grid(surface, &vp);

        if scene.series.is_empty() {
            surface.draw_text(&Text {
                content: WAITING_MESSAGE.to_string(),
                position: Point::new(vp.width / 2.0, vp.height / 2.0),
                color: self.theme.label,
                size: 16.0,
                align: TextAlign::Center,
            });
            return;
        }

        self.draw_time_axis(surface, &vp, scene.range);

        for series in scene.series {
            self.draw_series(surface, series, scene.hover);
        }

        self.draw_value_labels(surface, &vp, &scene.axes);

        if let Some(hit) = scene.hover {
            let guide = Stroke::default()
                .with_color(self.theme.guide)
                .with_dash(GUIDE_DASH);
            surface.draw_line(
                Point::new(hit.x, vp.plot_top()),
                Point::new(hit.x, vp.plot_bottom()),
                &guide,
            );
            self.draw_tooltip(surface, &vp, hit);
        }
    }

    /// Hover text beside the point, flipped left on the right half of the plot.
    fn draw_tooltip<S: DrawSurface + ?Sized>(&self, surface: &mut S, vp: &Viewport, hit: &Hit) {
        let (dx, align) = if hit.x > vp.plot_left() + vp.plot_width() / 2.0 {
            (-TOOLTIP_OFFSET, TextAlign::Right)
        } else {
            (TOOLTIP_OFFSET, TextAlign::Left)
        };
        let y = (hit.y - TOOLTIP_OFFSET).max(vp.plot_top() + TOOLTIP_SIZE);

        surface.draw_text(&Text {
            content: hit.describe(self.unit),
            position: Point::new(hit.x + dx, y),
            color: self.theme.guide,
            size: TOOLTIP_SIZE,
            align,
        });
    }

    fn draw_grid<S: DrawSurface + ?Sized>(&self, surface: &mut S, vp: &Viewport) {
        let stroke = Stroke::default().with_color(self.theme.grid);
        let steps = (GRID_LINES - 1) as f64;

        for i in 0..GRID_LINES {
            let y = vp.plot_top() + vp.plot_height() * (i as f64 / steps);
            surface.draw_line(
                Point::new(vp.plot_left(), y),
                Point::new(vp.plot_right(), y),
                &stroke,
            );
        }
    }

    fn draw_time_axis<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        vp: &Viewport,
        range: TimeRange,
    ) {
        let stroke = Stroke::default()
            .with_color(self.theme.grid)
            .with_width(0.5);
        let span = range.duration_ms();
        let steps = (TIME_LABELS - 1) as f64;

        for i in 0..TIME_LABELS {
            let fraction = i as f64 / steps;
            let x = vp.plot_left() + fraction * vp.plot_width();
            let timestamp = range.from.saturating_add((fraction * span as f64).round() as i64);

            surface.draw_text(&Text {
                content: format_axis_time(timestamp, span),
                position: Point::new(x, vp.height - 5.0),
                color: self.theme.label,
                size: 11.0,
                align: TextAlign::Center,
            });
            surface.draw_line(
                Point::new(x, vp.plot_top()),
                Point::new(x, vp.plot_bottom()),
                &stroke,
            );
        }
    }

    fn draw_series<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        series: &PlottedSeries,
        hover: Option<&Hit>,
    ) {
        let color = color_for_key(&series.key);
        let mut stroke = Stroke::default()
            .with_color(color)
            .with_width(SERIES_WIDTH);
        if series.key.metric == MetricKind::Humidity {
            stroke = stroke.with_dash(HUMIDITY_DASH);
        }

        let path: Vec<Point> = series
            .points
            .iter()
            .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
            .collect();
        surface.draw_polyline(&path, &stroke);

        let ring = Stroke::default()
            .with_color(color)
            .with_width(SERIES_WIDTH);
        for (point, center) in series.points.iter().zip(&path) {
            let hovered =
                hover.is_some_and(|hit| hit.key == series.key && hit.index == point.index);
            if hovered {
                surface.draw_point(*center, HOVER_RADIUS, color);
                surface.draw_circle(*center, HOVER_RING_RADIUS, &ring);
            } else {
                surface.draw_point(*center, POINT_RADIUS, color);
            }
        }
    }

    fn draw_value_labels<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        vp: &Viewport,
        axes: &Axes,
    ) {
        let label = |content: String, x: f64, y: f64, align: TextAlign| Text {
            content,
            position: Point::new(x, y),
            color: self.theme.label,
            size: 12.0,
            align,
        };
        let top = vp.plot_top() + 5.0;
        let bottom = vp.height - 15.0;

        let temp = axes.temperature;
        surface.draw_text(&label(
            format_temperature(temp.max, self.unit),
            5.0,
            top,
            TextAlign::Left,
        ));
        surface.draw_text(&label(
            format_temperature(temp.min, self.unit),
            5.0,
            bottom,
            TextAlign::Left,
        ));

        let hum = axes.humidity;
        let right = vp.width - 5.0;
        surface.draw_text(&label(format!("{:.0}%", hum.max), right, top, TextAlign::Right));
        surface.draw_text(&label(format!("{:.0}%", hum.min), right, bottom, TextAlign::Right));
    }
}
