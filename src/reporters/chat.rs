use chrono::Local;
use serde_json::{Value, json};

use super::{Notification, NotifyLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFlavor {
    Matrix,
    Slack,
}

/// Plain-text chat message with an optional header and footer around alarms
#[derive(Debug, Clone)]
pub struct ChatChannel {
    pub flavor: ChatFlavor,
    pub url: String,
    pub error_header: String,
    pub error_footer: String,
}

impl ChatChannel {
    pub fn body(&self, notification: &Notification) -> String {
        let (header, footer) = match notification.level {
            NotifyLevel::Alarm => (self.error_header.as_str(), self.error_footer.as_str()),
            NotifyLevel::Ok | NotifyLevel::Recovered => ("", ""),
        };

        let header = if header.is_empty() {
            String::new()
        } else {
            format!("{header}\n")
        };
        let footer = if footer.is_empty() {
            String::new()
        } else {
            format!("\n{footer}")
        };

        let time = notification
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M");

        format!("{header}{time}\n{}{footer}", notification.message)
    }

    pub fn format(&self, notification: &Notification) -> Value {
        let body = self.body(notification);

        match self.flavor {
            ChatFlavor::Matrix => json!({ "msgtype": "m.text", "body": body }),
            ChatFlavor::Slack => json!({ "text": body }),
        }
    }
}
