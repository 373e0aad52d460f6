//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Real-time sensor charts for agricultural monitoring.
#[derive(Parser, Debug, Clone)]
#[command(name = "agrosight")]
#[command(about = "Render temperature and humidity charts from a sensor feed")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Render a single frame from a message log.
    Render {
        /// JSON-lines message log.
        #[arg(short, long)]
        input: PathBuf,

        /// SVG file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Reference time in epoch milliseconds (defaults to the current time).
        #[arg(long)]
        now: Option<i64>,
    },

    /// Follow a feed and re-render whenever a redraw is due.
    Watch {
        /// JSON-lines feed. Reads stdin when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// SVG file to keep up to date.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a synthetic JSON-lines feed to stdout.
    Demo {
        /// Number of simulated sensors.
        #[arg(long, default_value_t = 3)]
        sensors: usize,

        /// Readings per sensor.
        #[arg(long, default_value_t = 60)]
        count: usize,

        /// Seed for reproducible output.
        #[arg(long)]
        seed: Option<u64>,

        /// Milliseconds between readings.
        #[arg(long, default_value_t = 60_000)]
        interval_ms: i64,

        /// Route the sensors through this endpoint and announce its sensor list.
        #[arg(long)]
        endpoint: Option<String>,
    },
}
