//! Status endpoint served over a real socket

use sensor_monitoring::api::spawn_status_server;

use crate::helpers::*;

#[tokio::test]
async fn test_status_endpoint_serves_snapshot() {
    let monitor = spawn_monitor(GREENHOUSE);
    for (i, value) in [31.0, 32.0].into_iter().enumerate() {
        monitor.ingest(humidity(i as i64 * 60, value)).await.unwrap();
    }

    let addr = spawn_status_server("127.0.0.1:0".parse().unwrap(), monitor.clone())
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/status"))
        .header("Origin", "http://dashboard.local")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );

    let json: serde_json::Value = response.json().await.unwrap();
    let sensor = &json["sensors"][0];

    assert_eq!(sensor["id"], "A4C138000001");
    assert_eq!(sensor["status"], "alerting");
    assert_eq!(sensor["alarms"][0]["consecutive_violations"], 2);
    assert_eq!(sensor["parameters"][0]["name"], "humidity");
    assert_eq!(sensor["parameters"][0]["history"][1]["value"], 32.0);
    assert_eq!(
        sensor["parameters"][0]["history"][1]["timestamp"],
        1_700_000_060
    );

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let monitor = spawn_monitor(GREENHOUSE);
    let addr = spawn_status_server("127.0.0.1:0".parse().unwrap(), monitor.clone())
        .await
        .unwrap();

    let json: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(json["status"], "ok");

    monitor.shutdown().await.unwrap();
}
