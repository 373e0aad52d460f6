//! AgroSight Chart
//!
//! Client-side time-series buffering and rendering for sensor dashboards:
//!
//! - [`buffer`] - Bounded per-series sample buffers
//! - [`window`] - Time-window selection and clipping
//! - [`scale`] - Timestamp and value to pixel mapping
//! - [`plot`] - Axis scaling and point placement for visible series
//! - [`hit`] - Nearest-point hit testing
//! - [`chart`] - The [`Chart`] facade tying the above together
//! - [`surface`] / [`render`] - Drawing-surface abstraction and frame rendering
//! - [`ingest`] - Normalization and device filtering of inbound messages
//! - [`storage`] - Best-effort persistence of visibility and window choices
//! - [`alerts`] - Threshold alerts on incoming readings
//!
//! Nothing in this crate reads the clock or performs I/O on its own; callers
//! pass `now` (epoch milliseconds) and supply the drawing surface and
//! key-value store.

pub mod alerts;
pub mod buffer;
pub mod chart;
pub mod error;
pub mod formatting;
pub mod hit;
pub mod ingest;
pub mod plot;
pub mod render;
pub mod scale;
pub mod storage;
pub mod surface;
pub mod window;

pub use alerts::{Alert, AlertKind, AlertMonitor, Severity};
pub use buffer::{DEFAULT_CAPACITY, SeriesBuffers};
pub use chart::{Chart, ChartStats, LegendEntry, RedrawThrottle};
pub use error::{ChartError, Result};
pub use hit::{DEFAULT_HOVER_THRESHOLD, Hit, find_nearest};
pub use ingest::{DeviceFilter, Ingest, IngestAdapter, Reading, Rejection};
pub use plot::{Axes, PlottedPoint, PlottedSeries};
pub use render::{Renderer, Scene, Theme};
pub use scale::{AxisRange, Margins, Viewport};
pub use storage::{ChartStorage, KeyValueStore, MemoryStore, default_namespace};
pub use surface::{Color, DrawSurface, Point, RecordingSurface, Stroke, Text, TextAlign};
pub use window::{RelativeWindow, TimeRange, WindowDescriptor, clip, resolve};
