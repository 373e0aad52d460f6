//! Dashboard state and the `render` / `watch` drivers.

use std::path::Path;
use std::time::Duration;

use agrosight_chart::{
    AlertMonitor, Chart, ChartStorage, DeviceFilter, DrawSurface, Ingest, IngestAdapter,
    MemoryStore, Reading, default_namespace,
};
use agrosight_common::{AgroSightConfig, TemperatureUnit, current_timestamp_millis};

use crate::feed::{FeedEvent, FeedReader};
use crate::file_store::{JsonFileStore, default_storage_path};
use crate::svg::SvgSurface;

/// Counters for one dashboard session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub messages: u64,
    pub readings: u64,
    pub deferred: u64,
    pub rejected: u64,
    pub alerts: u64,
    pub frames: u64,
}

/// One chart fed by the ingestion adapter, with alerts on every reading.
#[derive(Debug)]
pub struct Dashboard {
    chart: Chart,
    adapter: IngestAdapter,
    alerts: AlertMonitor,
    unit: TemperatureUnit,
    stats: DashboardStats,
}

impl Dashboard {
    /// Build a dashboard without persistent preferences.
    pub fn new(config: &AgroSightConfig) -> Self {
        Self {
            chart: Chart::new(&config.chart),
            adapter: IngestAdapter::new(DeviceFilter::from_config(&config.device)),
            alerts: AlertMonitor::new(config.alerts.clone()),
            unit: config.chart.temperature_unit,
            stats: DashboardStats::default(),
        }
    }

    /// Persist chart preferences in `storage`, restoring any saved ones.
    pub fn with_storage(mut self, storage: ChartStorage) -> Self {
        self.chart = self.chart.with_storage(storage);
        self
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut Chart {
        &mut self.chart
    }

    pub fn alerts(&self) -> &AlertMonitor {
        &self.alerts
    }

    pub fn stats(&self) -> DashboardStats {
        self.stats
    }

    /// Apply one feed event observed at `now`.
    pub fn handle(&mut self, event: FeedEvent, now: i64) {
        match event {
            FeedEvent::Message(message) => {
                self.stats.messages += 1;
                match self.adapter.accept(message, now) {
                    Ingest::Accepted(readings) => self.ingest(readings, now),
                    Ingest::Deferred => {
                        self.stats.deferred += 1;
                        tracing::debug!(backlog = self.adapter.backlog_len(), "Message deferred");
                    }
                    Ingest::Rejected(reason) => {
                        self.stats.rejected += 1;
                        tracing::debug!(reason = ?reason, "Message rejected");
                    }
                }
            }
            FeedEvent::EndpointSensors(sensors) => {
                tracing::info!(sensors = sensors.len(), "Endpoint sensor list received");
                let readings = self.adapter.set_endpoint_sensors(sensors);
                self.ingest(readings, now);
            }
        }
    }

    fn ingest(&mut self, readings: Vec<Reading>, now: i64) {
        for reading in readings {
            if let Some(alert) = self.alerts.check(&reading.key, reading.sample.value, now) {
                self.stats.alerts += 1;
                tracing::info!(id = alert.id, "{}", alert.message(self.unit));
            }
            if self.chart.push_reading(reading) {
                self.stats.readings += 1;
            }
        }
    }

    /// Periodic housekeeping plus a throttled redraw.
    pub fn tick<S: DrawSurface + ?Sized>(&mut self, surface: &mut S, now: i64) -> bool {
        self.alerts.prune(now);
        let drawn = self.chart.frame(surface, now);
        if drawn {
            self.stats.frames += 1;
        }
        drawn
    }

    /// Draw a frame regardless of the throttle.
    pub fn render<S: DrawSurface + ?Sized>(&mut self, surface: &mut S, now: i64) {
        self.chart.render(surface, now);
        self.stats.frames += 1;
    }
}

/// Preference storage for `config`, falling back to memory if the file
/// cannot be used.
pub fn open_storage(config: &AgroSightConfig) -> ChartStorage {
    let namespace = config.storage.namespace.clone().unwrap_or_else(|| {
        default_namespace(config.device.device_id.as_deref(), config.device.device_type)
    });

    let Some(path) = config.storage.path.clone().or_else(default_storage_path) else {
        tracing::warn!("No data directory available, chart preferences will not persist");
        return ChartStorage::new(MemoryStore::new(), namespace);
    };

    match JsonFileStore::open(&path) {
        Ok(store) => ChartStorage::new(store, namespace),
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to open storage file, chart preferences will not persist"
            );
            ChartStorage::new(MemoryStore::new(), namespace)
        }
    }
}

fn surface_for(dashboard: &Dashboard) -> SvgSurface {
    SvgSurface::new().with_title(dashboard.chart().title())
}

/// Render one frame from a message log.
pub async fn render(
    config: &AgroSightConfig,
    input: &Path,
    output: &Path,
    now: Option<i64>,
) -> anyhow::Result<DashboardStats> {
    let now = now.unwrap_or_else(current_timestamp_millis);
    let mut dashboard = Dashboard::new(config).with_storage(open_storage(config));

    let mut feed = FeedReader::open(Some(input)).await?;
    while let Some(event) = feed.next_event().await? {
        dashboard.handle(event, now);
    }

    let mut surface = surface_for(&dashboard);
    dashboard.render(&mut surface, now);
    surface.write_to(output).await?;

    let stats = dashboard.stats();
    tracing::info!(
        output = %output.display(),
        range = %dashboard.chart().time_range(now).describe(),
        messages = stats.messages,
        readings = stats.readings,
        rejected = stats.rejected,
        skipped = feed.skipped(),
        alerts = stats.alerts,
        "Frame rendered"
    );
    Ok(stats)
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    };

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Follow a feed until it ends or a shutdown signal, re-rendering when a
/// redraw is due.
pub async fn watch(
    config: &AgroSightConfig,
    input: Option<&Path>,
    output: &Path,
) -> anyhow::Result<DashboardStats> {
    let mut dashboard = Dashboard::new(config).with_storage(open_storage(config));
    let mut surface = surface_for(&dashboard);
    let mut feed = FeedReader::open(input).await?;

    let mut ticker = tokio::time::interval(Duration::from_millis(config.chart.tick_interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(
        output = %output.display(),
        tick_ms = config.chart.tick_interval_ms,
        refresh_ms = config.chart.refresh_interval_ms,
        "Watching feed"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = feed.next_event() => {
                match event? {
                    Some(event) => dashboard.handle(event, current_timestamp_millis()),
                    None => {
                        tracing::info!("Feed ended");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if dashboard.tick(&mut surface, current_timestamp_millis()) {
                    if let Err(e) = surface.write_to(output).await {
                        tracing::warn!(error = %e, output = %output.display(), "Failed to write frame");
                    }
                }
            }

            _ = &mut shutdown => break,
        }
    }

    // Final frame so the output reflects everything that was read.
    dashboard.render(&mut surface, current_timestamp_millis());
    surface.write_to(output).await?;

    let stats = dashboard.stats();
    tracing::info!(
        messages = stats.messages,
        readings = stats.readings,
        alerts = stats.alerts,
        frames = stats.frames,
        "Watch stopped"
    );
    Ok(stats)
}
