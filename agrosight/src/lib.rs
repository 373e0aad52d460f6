//! AgroSight - Real-time sensor charts for agricultural monitoring.
//!
//! Host side of the chart core: reads a JSON-lines message feed, keeps chart
//! preferences in a JSON file and renders frames to SVG.

pub mod app;
pub mod cli;
pub mod demo;
pub mod feed;
pub mod file_store;
pub mod svg;

// Re-export commonly used types
pub use app::Dashboard;
pub use demo::DemoFeed;
pub use feed::{FeedEvent, FeedReader};
pub use file_store::JsonFileStore;
pub use svg::SvgSurface;
