//! End-to-end tests for the host: feed file in, SVG out, preferences on disk.

use std::path::Path;

use agrosight::app::{self, Dashboard, open_storage};
use agrosight::{DemoFeed, FeedEvent, JsonFileStore, SvgSurface};
use agrosight_chart::{KeyValueStore, RelativeWindow, WindowDescriptor};
use agrosight_common::{AgroSightConfig, SeriesKey, current_timestamp_millis, parse_config};
use serde_json::json;

const NOW: i64 = 1_700_000_000_000;

fn config_in(dir: &Path) -> AgroSightConfig {
    let mut config = AgroSightConfig::default();
    config.storage.path = Some(dir.join("storage.json"));
    config
}

fn write_feed(path: &Path, lines: &[serde_json::Value]) {
    let content: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    std::fs::write(path, content.join("\n")).unwrap();
}

#[tokio::test]
async fn test_render_writes_svg() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feed.jsonl");
    let output = dir.path().join("chart.svg");

    write_feed(
        &input,
        &[
            json!({"sensor_id": "s1", "temperature": 20.0, "humidity": 50, "timestamp": NOW - 600_000}),
            json!({"sensor_id": "s1", "temperature": 24.0, "humidity": 60, "timestamp": NOW - 60_000}),
            json!({"sensor_id": "s2", "temperature": "warm", "timestamp": NOW - 60_000}),
        ],
    );

    let stats = app::render(&config_in(dir.path()), &input, &output, Some(NOW))
        .await
        .unwrap();
    assert_eq!(stats.messages, 3);
    assert_eq!(stats.readings, 4);

    let svg = std::fs::read_to_string(&output).unwrap();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<polyline").count(), 2);
    assert!(svg.contains(r#"stroke-dasharray="5,4""#));
    assert!(svg.contains("<title>Temperature</title>"));
    assert!(!svg.contains("Waiting for data..."));
}

#[tokio::test]
async fn test_render_empty_feed_shows_waiting_message() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feed.jsonl");
    let output = dir.path().join("chart.svg");
    std::fs::write(&input, "\nnot json\n").unwrap();

    app::render(&config_in(dir.path()), &input, &output, Some(NOW))
        .await
        .unwrap();

    let svg = std::fs::read_to_string(&output).unwrap();
    assert!(svg.contains("Waiting for data..."));
}

#[tokio::test]
async fn test_render_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = app::render(
        &config_in(dir.path()),
        &dir.path().join("absent.jsonl"),
        &dir.path().join("chart.svg"),
        Some(NOW),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_watch_follows_feed_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feed.jsonl");
    let output = dir.path().join("live.svg");

    let now = current_timestamp_millis();
    write_feed(
        &input,
        &[
            json!({"sensor_id": "s1", "temperature": 20.0, "humidity": 50, "timestamp": now - 300_000}),
            json!({"id": "s2", "temp": 22.5, "timestamp": now - 120_000}),
            json!({"sensor_id": "s1", "temperature": 21.0, "humidity": 52, "timestamp": now - 60_000}),
            json!({"sensor_id": "s3", "humidity": "wet", "timestamp": now - 60_000}),
        ],
    );

    let mut config = config_in(dir.path());
    config.chart.tick_interval_ms = 5;
    config.chart.refresh_interval_ms = 0;

    let stats = app::watch(&config, Some(&input), &output).await.unwrap();
    assert_eq!(stats.messages, 4);
    assert_eq!(stats.readings, 5);
    assert!(stats.frames >= 1);

    let svg = std::fs::read_to_string(&output).unwrap();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<polyline").count(), 2);
    assert!(!svg.contains("Waiting for data..."));
    assert!(!output.with_extension("svg.tmp").exists());
}

#[test]
fn test_preferences_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let hidden = SeriesKey::humidity("s1");

    {
        let mut dashboard = Dashboard::new(&config).with_storage(open_storage(&config));
        let chart = dashboard.chart_mut();
        chart.set_visible(hidden.clone(), false);
        chart.set_window(WindowDescriptor::Relative(RelativeWindow::OneWeek));
    }

    let store = JsonFileStore::open(dir.path().join("storage.json")).unwrap();
    assert_eq!(
        store.get("chart_filters_global_all").unwrap().as_deref(),
        Some(r#"{"s1:hum":false}"#)
    );

    let dashboard = Dashboard::new(&config).with_storage(open_storage(&config));
    assert!(!dashboard.chart().is_visible(&hidden));
    assert_eq!(
        dashboard.chart().window(),
        WindowDescriptor::Relative(RelativeWindow::OneWeek)
    );
}

#[test]
fn test_storage_namespace_follows_device() {
    let dir = tempfile::tempdir().unwrap();
    let mut config: AgroSightConfig = parse_config(
        r#"{ device: { device_id: "ep-9", device_type: "endpoint" } }"#,
    )
    .unwrap();
    config.storage.path = Some(dir.path().join("storage.json"));
    assert_eq!(open_storage(&config).namespace(), "ep-9_endpoint");

    config.storage.namespace = Some("greenhouse".into());
    assert_eq!(open_storage(&config).namespace(), "greenhouse");
}

#[test]
fn test_demo_feed_through_endpoint_dashboard() {
    let config: AgroSightConfig = parse_config(
        r#"{ device: { device_id: "ep-1", device_type: "endpoint" } }"#,
    )
    .unwrap();
    let mut dashboard = Dashboard::new(&config);

    let start = NOW - 29 * 60_000;
    let mut feed = DemoFeed::new(4, Some(11), start, 60_000).with_endpoint("ep-1");
    let messages = feed.generate(30);

    // Readings sent before the sensor list are held and replayed.
    for message in messages.iter().skip(1).take(4) {
        dashboard.handle(FeedEvent::Message(message.clone()), NOW);
    }
    assert_eq!(dashboard.stats().deferred, 4);

    let announcement = agrosight::feed::parse_line(&messages[0].to_string())
        .unwrap()
        .unwrap();
    dashboard.handle(announcement, NOW);
    for message in messages.iter().skip(5) {
        dashboard.handle(FeedEvent::Message(message.clone()), NOW);
    }

    assert_eq!(dashboard.stats().readings, 4 * 30 * 2);
    let series = dashboard.chart().visible_series(NOW);
    assert_eq!(series.len(), 8);
    assert!(series.iter().all(|s| s.points.len() == 30));

    let mut surface = SvgSurface::new();
    dashboard.render(&mut surface, NOW);
    assert_eq!(surface.to_document().matches("<polyline").count(), 8);
}
