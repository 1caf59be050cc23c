//! Helper functions for integration tests

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use sensor_monitoring::{
    MonitorHandle, Reading, config::parse_config, registry::SensorRegistry,
    reporters::ReporterDispatch,
};
use tokio::task::JoinHandle;
use wiremock::{MockServer, Request};

pub const GREENHOUSE_ID: &str = "A4:C1:38:00:00:01";

/// One sensor with a humidity rule of [10, 30] confirmed after three readings
pub const GREENHOUSE: &str = r#"
[[sensors]]
id = "A4:C1:38:00:00:01"
label = "Greenhouse"
parameters = ["humidity", "battery"]
history_capacity = 16

[[sensors.alarms]]
parameter = "humidity"
min = 10
max = 30
confirmation = 3
"#;

pub const CELLAR_ID: &str = "A4:C1:38:00:00:03";

/// A second sensor without alarm rules
pub const CELLAR: &str = r#"
[[sensors]]
id = "A4:C1:38:00:00:03"
label = "Cellar"
parameters = ["temperature"]
history_capacity = 8
"#;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn humidity(secs: i64, value: f64) -> Reading {
    Reading::new(GREENHOUSE_ID, at(secs)).with_field("humidity", value)
}

pub fn webhook_reporter(url: &str, ok_interval: &str, error_interval: &str) -> String {
    format!(
        r#"
[[reporters]]
type = "webhook"
url = "{url}"
ok_interval = "{ok_interval}"
error_interval = "{error_interval}"
"#
    )
}

pub fn spawn_monitor(source: &str) -> MonitorHandle {
    spawn_monitor_with_task(source).0
}

pub fn spawn_monitor_with_task(source: &str) -> (MonitorHandle, JoinHandle<()>) {
    let config = parse_config(source).unwrap();
    let registry = SensorRegistry::from_config(&config.sensors).unwrap();
    let dispatch = ReporterDispatch::from_config(&config.reporters, &config.general).unwrap();
    MonitorHandle::spawn_with_task(Arc::new(registry), dispatch)
}

/// Wait until `expected` requests arrived (or two seconds passed), then give
/// stragglers a moment to show up before returning everything received.
pub async fn wait_for_requests(server: &MockServer, expected: usize) -> Vec<Request> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);

    loop {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= expected || tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.received_requests().await.unwrap_or_default()
}

pub fn json_bodies(requests: &[Request]) -> Vec<serde_json::Value> {
    requests
        .iter()
        .map(|request| request.body_json().unwrap())
        .collect()
}
