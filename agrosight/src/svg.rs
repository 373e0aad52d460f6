//! SVG drawing surface.

use std::fmt::Write as _;
use std::path::Path;

use agrosight_chart::{Color, DrawSurface, Point, Stroke, Text, TextAlign};

/// Background fill of rendered frames.
pub const BACKGROUND: Color = Color::from_rgb(0x16, 0x1b, 0x22);

const FONT_FAMILY: &str = "sans-serif";

/// Accumulates draw calls as SVG elements.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    title: Option<String>,
    background: Color,
    body: String,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgSurface {
    pub fn new() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            title: None,
            background: BACKGROUND,
            body: String::new(),
        }
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// The complete SVG document for the last frame.
    pub fn to_document(&self) -> String {
        let mut doc = String::with_capacity(self.body.len() + 256);
        let _ = writeln!(
            doc,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = num(self.width),
            h = num(self.height),
        );
        if let Some(title) = &self.title {
            let _ = writeln!(doc, "<title>{}</title>", escape(title));
        }
        let _ = writeln!(
            doc,
            r#"<rect width="100%" height="100%" fill="{}"/>"#,
            self.background
        );
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        doc
    }

    /// Write the document to `path`, replacing it atomically.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("svg.tmp");
        tokio::fs::write(&tmp, self.to_document()).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

/// Compact number formatting: integers without a fraction, others to 2 places.
fn num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn stroke_attrs(stroke: &Stroke) -> String {
    let mut attrs = format!(
        r#"stroke="{}" stroke-width="{}""#,
        stroke.color,
        num(stroke.width)
    );
    if stroke.is_dashed() {
        let dash: Vec<String> = stroke.dash.iter().map(|d| num(*d)).collect();
        let _ = write!(attrs, r#" stroke-dasharray="{}""#, dash.join(","));
    }
    attrs
}

impl DrawSurface for SvgSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.body.clear();
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {}/>"#,
            num(from.x),
            num(from.y),
            num(to.x),
            num(to.y),
            stroke_attrs(stroke)
        );
    }

    fn draw_polyline(&mut self, points: &[Point], stroke: &Stroke) {
        if points.len() < 2 {
            return;
        }
        let coords: Vec<String> = points
            .iter()
            .map(|p| format!("{},{}", num(p.x), num(p.y)))
            .collect();
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" fill="none" stroke-linejoin="round" {}/>"#,
            coords.join(" "),
            stroke_attrs(stroke)
        );
    }

    fn draw_point(&mut self, center: Point, radius: f64, color: Color) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            num(center.x),
            num(center.y),
            num(radius),
            color
        );
    }

    fn draw_circle(&mut self, center: Point, radius: f64, stroke: &Stroke) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{}" cy="{}" r="{}" fill="none" {}/>"#,
            num(center.x),
            num(center.y),
            num(radius),
            stroke_attrs(stroke)
        );
    }

    fn draw_text(&mut self, text: &Text) {
        let anchor = match text.align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let _ = writeln!(
            self.body,
            r#"<text x="{}" y="{}" fill="{}" font-size="{}" font-family="{}" text-anchor="{}">{}</text>"#,
            num(text.position.x),
            num(text.position.y),
            text.color,
            num(text.size),
            FONT_FAMILY,
            anchor,
            escape(&text.content)
        );
    }
}
