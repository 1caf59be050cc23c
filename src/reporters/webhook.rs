use serde_json::{Value, json};

use super::Notification;

/// Generic JSON webhook
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    pub url: String,
}

impl WebhookChannel {
    pub fn format(&self, notification: &Notification, sensor_label: &str) -> Value {
        json!({
            "message": notification.message,
            "sensor": sensor_label,
            "sensor_id": notification.sensor_id,
            "level": notification.level,
            "timestamp": notification.timestamp.to_rfc3339()
        })
    }
}
