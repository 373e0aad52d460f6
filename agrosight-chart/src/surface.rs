//! Drawing-surface abstraction and series colours.
//!
//! The renderer only ever talks to a [`DrawSurface`]; hosts supply one that
//! writes to whatever they have (an SVG document, a terminal, a test
//! recorder).

use std::fmt;

use agrosight_common::SeriesKey;

/// A position on the surface, in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::from_rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::from_rgb(0, 0, 0);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        Some(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Lower-case `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Line style.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    /// Dash pattern as alternating on/off lengths. Empty means solid.
    pub dash: Vec<f64>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            dash: Vec::new(),
        }
    }
}

impl Stroke {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_dash(mut self, dash: impl Into<Vec<f64>>) -> Self {
        self.dash = dash.into();
        self
    }

    pub fn is_dashed(&self) -> bool {
        !self.dash.is_empty()
    }
}

/// Horizontal anchoring of a text label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A text label to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub position: Point,
    pub color: Color,
    /// Font size in pixels.
    pub size: f64,
    pub align: TextAlign,
}

impl Default for Text {
    fn default() -> Self {
        Self {
            content: String::new(),
            position: Point::default(),
            color: Color::BLACK,
            size: 12.0,
            align: TextAlign::Left,
        }
    }
}

/// Capability required to draw a chart frame.
pub trait DrawSurface {
    /// Wipe the surface and set its size.
    fn clear(&mut self, width: f64, height: f64);

    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke);

    /// Draw connected segments. Fewer than two points draws nothing.
    fn draw_polyline(&mut self, points: &[Point], stroke: &Stroke) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], stroke);
        }
    }

    /// Draw a filled dot.
    fn draw_point(&mut self, center: Point, radius: f64, color: Color);

    /// Draw a circle outline.
    fn draw_circle(&mut self, center: Point, radius: f64, stroke: &Stroke);

    fn draw_text(&mut self, text: &Text);

    /// Approximate rendered width of `content` at `size` pixels.
    fn measure_text(&self, content: &str, size: f64) -> f64 {
        content.chars().count() as f64 * size * 0.6
    }
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear { width: f64, height: f64 },
    Line { from: Point, to: Point, stroke: Stroke },
    Point { center: Point, radius: f64, color: Color },
    Circle { center: Point, radius: f64, stroke: Stroke },
    Text(Text),
}

/// A surface that records every call, for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text contents drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(text) => Some(text.content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Line segments drawn, in order.
    pub fn lines(&self) -> Vec<(Point, Point, &Stroke)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Line { from, to, stroke } => Some((*from, *to, stroke)),
                _ => None,
            })
            .collect()
    }

    /// Filled dots drawn, in order.
    pub fn points(&self) -> Vec<(Point, f64)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Point { center, radius, .. } => Some((*center, *radius)),
                _ => None,
            })
            .collect()
    }

    /// Circle outlines drawn, in order.
    pub fn circles(&self) -> Vec<(Point, f64)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Circle { center, radius, .. } => Some((*center, *radius)),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear { width, height });
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            stroke: stroke.clone(),
        });
    }

    fn draw_point(&mut self, center: Point, radius: f64, color: Color) {
        self.ops.push(DrawOp::Point {
            center,
            radius,
            color,
        });
    }

    fn draw_circle(&mut self, center: Point, radius: f64, stroke: &Stroke) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            stroke: stroke.clone(),
        });
    }

    fn draw_text(&mut self, text: &Text) {
        self.ops.push(DrawOp::Text(text.clone()));
    }
}

/// Fixed series palette.
pub const PALETTE: [&str; 10] = [
    "#46a0ff", "#4CAF50", "#FF5722", "#9C27B0", "#FFC107", "#00BCD4", "#E91E63", "#8BC34A",
    "#FF9800", "#3F51B5",
];

/// Deterministic 32-bit string hash (`h = h * 31 + c` with wrap-around).
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(c)))
}

/// Palette colour for a series.
pub fn color_for_key(key: &SeriesKey) -> Color {
    let index = string_hash(&key.to_string()).unsigned_abs() as usize % PALETTE.len();
    Color::from_hex(PALETTE[index]).unwrap_or(Color::BLACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let color = Color::from_hex("#4CAF50").unwrap();
        assert_eq!(color, Color::from_rgb(0x4c, 0xaf, 0x50));
        assert_eq!(color.to_hex(), "#4caf50");

        assert!(Color::from_hex("4CAF50").is_none());
        assert!(Color::from_hex("#4CAF5").is_none());
        assert!(Color::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn test_palette_parses() {
        for hex in PALETTE {
            assert!(Color::from_hex(hex).is_some(), "{hex}");
        }
    }

    #[test]
    fn test_string_hash() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        // Long inputs wrap instead of overflowing.
        let _ = string_hash(&"z".repeat(100));
    }

    #[test]
    fn test_color_for_key_is_stable() {
        let key = SeriesKey::temperature("greenhouse-1");
        assert_eq!(color_for_key(&key), color_for_key(&key.clone()));
    }

    #[test]
    fn test_default_polyline() {
        let mut surface = RecordingSurface::new();
        let stroke = Stroke::default();

        surface.draw_polyline(&[Point::new(0.0, 0.0)], &stroke);
        assert!(surface.lines().is_empty());

        surface.draw_polyline(
            &[Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)],
            &stroke,
        );
        let lines = surface.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[1].0, lines[1].1), (Point::new(1.0, 1.0), Point::new(2.0, 0.0)));
    }

    #[test]
    fn test_stroke_builder() {
        let stroke = Stroke::default()
            .with_color(Color::WHITE)
            .with_width(2.0)
            .with_dash([5.0, 4.0]);
        assert!(stroke.is_dashed());
        assert_eq!(stroke.dash, vec![5.0, 4.0]);
        assert!(!Stroke::default().is_dashed());
    }
}
