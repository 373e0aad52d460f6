//! AgroSight - Real-time sensor charts for agricultural monitoring.
//!
//! Reads a JSON-lines feed of sensor messages and renders the temperature and
//! humidity chart to an SVG file, once (`render`) or continuously (`watch`).
//! `demo` prints a synthetic feed to pipe into the other two.

use std::io::Write;

use clap::Parser;

use agrosight::DemoFeed;
use agrosight::app;
use agrosight::cli::{Cli, Command};
use agrosight_common::{AgroSightConfig, current_timestamp_millis, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AgroSightConfig::load(path)?,
        None => AgroSightConfig::default(),
    };

    // Override log level from CLI
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config.logging)?;

    match cli.command {
        Command::Render { input, output, now } => {
            tracing::info!(input = %input.display(), "Rendering frame");
            app::render(&config, &input, &output, now).await?;
        }
        Command::Watch { input, output } => {
            tracing::info!("Starting AgroSight");
            app::watch(&config, input.as_deref(), &output).await?;
        }
        Command::Demo {
            sensors,
            count,
            seed,
            interval_ms,
            endpoint,
        } => {
            // End the feed at the current time so it lands in the default window.
            let start = current_timestamp_millis() - (count.max(1) as i64 - 1) * interval_ms;
            let mut feed = DemoFeed::new(sensors, seed, start, interval_ms);
            if let Some(endpoint) = endpoint {
                feed = feed.with_endpoint(endpoint);
            }

            let mut out = std::io::BufWriter::new(std::io::stdout().lock());
            for message in feed.generate(count) {
                writeln!(out, "{}", message)?;
            }
            out.flush()?;
        }
    }

    Ok(())
}
