use serde::Serialize;

use super::{Notification, NotifyLevel};

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

const RED: u32 = 15158332;
const GREEN: u32 = 3066993;
const LIGHT_BLUE: u32 = 5793266;

#[derive(Debug, Clone)]
pub struct DiscordChannel {
    pub url: String,
    pub error_header: String,
    pub user_id: Option<String>,
}

impl DiscordChannel {
    pub fn build_embed(&self, notification: &Notification, sensor_label: &str) -> Embed {
        let (title, color) = match notification.level {
            NotifyLevel::Alarm => ("🔥 Sensor Alarm", RED),
            NotifyLevel::Recovered => ("✅ Sensor Recovered", GREEN),
            NotifyLevel::Ok => ("🌡️ Sensor Update", LIGHT_BLUE),
        };

        Embed {
            title: Some(title.to_string()),
            description: Some(notification.message.clone()),
            color: Some(color),
            fields: vec![EmbedField {
                name: "📟 Sensor".to_string(),
                value: sensor_label.to_string(),
                inline: true,
            }],
            footer: Some(EmbedFooter {
                text: format!("Sensor: {}", notification.sensor_id),
            }),
            timestamp: Some(notification.timestamp.to_rfc3339()),
        }
    }

    pub fn format(&self, notification: &Notification, sensor_label: &str) -> Message {
        let mut builder = MessageBuilder::new().add_embed(self.build_embed(notification, sensor_label));

        if notification.level == NotifyLevel::Alarm {
            let mention = self
                .user_id
                .as_ref()
                .map(|user_id| format!("<@{user_id}>"));

            let content = [Some(self.error_header.clone()).filter(|h| !h.is_empty()), mention]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");

            if !content.is_empty() {
                builder = builder.content(content);
            }
        }

        builder.build()
    }
}
