//! Channel transport tests against mock endpoints

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::TimeDelta;
use reqwest::Client;
use sensor_monitoring::{
    monitors::{alarm::AlarmEvaluator, history::HistoryStore},
    registry::SensorRegistry,
    reporters::{
        Channel, Notification, NotifyLevel, Reporter, ReporterDispatch, SendError,
        chat::{ChatChannel, ChatFlavor},
        discord::DiscordChannel,
        webhook::WebhookChannel,
    },
    snapshot::StatusView,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn notification(level: NotifyLevel, secs: i64) -> Notification {
    Notification {
        sensor_id: "A4C138000001".to_string(),
        message: "Greenhouse: humidity too high (max 30) at 33".to_string(),
        level,
        timestamp: at(secs),
    }
}

fn webhook(name: &str, url: String, ok_interval: TimeDelta) -> Reporter {
    Reporter::new(
        name,
        Channel::Webhook(WebhookChannel { url }),
        ok_interval,
        TimeDelta::minutes(5),
        8,
    )
}

/// Dispatch one notification at its own timestamp and wait for every launched send
async fn notify_and_join(
    dispatch: &mut ReporterDispatch,
    notification: &Notification,
) -> Vec<Result<(), SendError>> {
    let registry = SensorRegistry::default();
    let history = HistoryStore::new(&registry);
    let alarms = AlarmEvaluator::new(Arc::new(registry.clone()));
    let view = StatusView::new(&registry, &history, &alarms);

    let handles = dispatch.notify(notification, &view, notification.timestamp);
    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

#[tokio::test]
async fn test_failing_channel_does_not_affect_other_channels() {
    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&healthy)
        .await;

    let mut dispatch = ReporterDispatch::new(
        vec![
            webhook("broken", format!("{}/hook", broken.uri()), TimeDelta::hours(1)),
            webhook("healthy", format!("{}/hook", healthy.uri()), TimeDelta::hours(1)),
        ],
        Client::new(),
    );

    let results = notify_and_join(&mut dispatch, &notification(NotifyLevel::Alarm, 0)).await;

    assert_eq!(results.len(), 2);
    assert_matches!(&results[0], Err(SendError::Status { status, body }) => {
        assert_eq!(status.as_u16(), 500);
        assert_eq!(body, "boom");
    });
    assert_matches!(results[1], Ok(()));

    // the failed send still consumed its slot, there is no retry
    let results = notify_and_join(&mut dispatch, &notification(NotifyLevel::Alarm, 10)).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_ok_messages_are_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut dispatch = ReporterDispatch::new(
        vec![webhook("hook", format!("{}/hook", server.uri()), TimeDelta::hours(1))],
        Client::new(),
    );

    assert_eq!(notify_and_join(&mut dispatch, &notification(NotifyLevel::Ok, 0)).await.len(), 1);
    assert_eq!(notify_and_join(&mut dispatch, &notification(NotifyLevel::Ok, 10)).await.len(), 0);
    assert_eq!(notify_and_join(&mut dispatch, &notification(NotifyLevel::Ok, 3600)).await.len(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_request_error() {
    let mut dispatch = ReporterDispatch::new(
        vec![webhook("hook", "http://127.0.0.1:9/hook".to_string(), TimeDelta::hours(1))],
        Client::new(),
    );

    let results = notify_and_join(&mut dispatch, &notification(NotifyLevel::Ok, 0)).await;
    assert_matches!(results[0], Err(SendError::Request(_)));
}

#[tokio::test]
async fn test_matrix_message_carries_header_on_alarm() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "msgtype": "m.text" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let channel = Channel::Chat(ChatChannel {
        flavor: ChatFlavor::Matrix,
        url: format!("{}/send", server.uri()),
        error_header: "@room".to_string(),
        error_footer: "-- greenhouse bot".to_string(),
    });
    let mut dispatch = ReporterDispatch::new(
        vec![Reporter::new("matrix", channel, TimeDelta::days(1), TimeDelta::hours(1), 8)],
        Client::new(),
    );

    let results = notify_and_join(&mut dispatch, &notification(NotifyLevel::Alarm, 0)).await;
    assert_matches!(results[0], Ok(()));

    let bodies = json_bodies(&server.received_requests().await.unwrap());
    let body = bodies[0]["body"].as_str().unwrap();
    assert!(body.starts_with("@room\n"));
    assert!(body.ends_with("at 33\n-- greenhouse bot"));
}

#[tokio::test]
async fn test_discord_alarm_mentions_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "content": "Heads up <@42>" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let channel = Channel::Discord(DiscordChannel {
        url: format!("{}/webhook", server.uri()),
        error_header: "Heads up".to_string(),
        user_id: Some("42".to_string()),
    });
    let mut dispatch = ReporterDispatch::new(
        vec![Reporter::new("discord", channel, TimeDelta::days(1), TimeDelta::hours(1), 8)],
        Client::new(),
    );

    let results = notify_and_join(&mut dispatch, &notification(NotifyLevel::Alarm, 0)).await;
    assert_matches!(results[0], Ok(()));
}
