//! Rate-limited fan-out of notifications to external channels
//!
//! Every configured channel is wrapped in a [`Reporter`] holding its own
//! [`RateLimiter`] and a semaphore bounding outstanding sends.
//!
//! ## Dispatch
//!
//! ```text
//! notify(notification, now)
//!   for each reporter:
//!     key = level                 (aggregating channels, e.g. console)
//!         | (level, sensor_id)    (per-sensor channels)
//!     now - last_sent[key] < interval(level) → suppress
//!     last_sent[key] = now
//!     format payload, spawn send   (never awaited by the caller)
//! ```
//!
//! `now` is the dispatcher's clock, never the reading timestamp, so a sensor
//! with a skewed clock cannot hold a rate-limit slot.
//!
//! Sends are best-effort: failures are logged, never retried, and the rate-limit
//! slot stays consumed.

pub mod chat;
pub mod console;
pub mod discord;
pub mod rate_limit;
pub mod webhook;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConfigError, GeneralConfig, ReporterConfig};
use crate::monitors::alarm::AlarmLevel;
use crate::snapshot::StatusView;
use crate::util::{get_local_ip, parse_interval};

use self::chat::{ChatChannel, ChatFlavor};
use self::console::{ConsoleChannel, ConsoleOutput};
use self::discord::{DiscordChannel, Message};
use self::rate_limit::{RateLimitKey, RateLimiter};
use self::webhook::WebhookChannel;

/// Severity under which a notification is rate limited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    /// Periodic status ping, sent for every reading
    Ok,
    /// Confirmed alarm
    Alarm,
    /// Alarm cleared
    Recovered,
}

impl NotifyLevel {
    /// Only confirmed alarms and recoveries leave the process.
    pub fn from_alarm(level: AlarmLevel) -> Option<Self> {
        match level {
            AlarmLevel::Alert => None,
            AlarmLevel::Alarm => Some(NotifyLevel::Alarm),
            AlarmLevel::Recovered => Some(NotifyLevel::Recovered),
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyLevel::Ok => write!(f, "ok"),
            NotifyLevel::Alarm => write!(f, "alarm"),
            NotifyLevel::Recovered => write!(f, "recovered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub sensor_id: String,
    pub message: String,
    pub level: NotifyLevel,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("console output failed: {0}")]
    Console(#[from] std::io::Error),
}

/// Closed set of supported channel types
#[derive(Debug, Clone)]
pub enum Channel {
    Console(ConsoleChannel),
    Chat(ChatChannel),
    Discord(DiscordChannel),
    Webhook(WebhookChannel),
}

enum Payload {
    Console(ConsoleOutput),
    Json(serde_json::Value),
    Discord(Message),
}

impl Channel {
    /// Aggregating channels summarize all sensors at once and are rate limited per level only.
    pub fn aggregates(&self) -> bool {
        matches!(self, Channel::Console(_))
    }

    fn url(&self) -> Option<&str> {
        match self {
            Channel::Console(_) => None,
            Channel::Chat(chat) => Some(&chat.url),
            Channel::Discord(discord) => Some(&discord.url),
            Channel::Webhook(webhook) => Some(&webhook.url),
        }
    }

    fn format(&self, notification: &Notification, view: &StatusView<'_>) -> Payload {
        let label = view
            .registry
            .get(&notification.sensor_id)
            .map_or(notification.sensor_id.as_str(), |sensor| sensor.label.as_str());

        match self {
            Channel::Console(console) => {
                Payload::Console(console.format(notification, &view.summary(), get_local_ip()))
            }
            Channel::Chat(chat) => Payload::Json(chat.format(notification)),
            Channel::Discord(discord) => Payload::Discord(discord.format(notification, label)),
            Channel::Webhook(webhook) => Payload::Json(webhook.format(notification, label)),
        }
    }
}

/// One configured channel with its rate-limit bookkeeping
#[derive(Debug)]
pub struct Reporter {
    name: String,
    channel: Channel,
    limiter: RateLimiter,
    in_flight: Arc<Semaphore>,
}

impl Reporter {
    pub fn new(
        name: impl ToString,
        channel: Channel,
        ok_interval: TimeDelta,
        error_interval: TimeDelta,
        max_in_flight: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            channel,
            limiter: RateLimiter::new(ok_interval, error_interval),
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    fn from_config(config: &ReporterConfig, max_in_flight: usize) -> Result<Self, ConfigError> {
        let name = config.name();
        let (ok_interval, error_interval) = config.intervals();

        if let Some(url) = config.url() {
            Url::parse(url).map_err(|_| ConfigError::InvalidUrl {
                reporter: name.to_string(),
                url: url.to_string(),
            })?;
        }

        let channel = match config {
            ReporterConfig::Console(_) => Channel::Console(ConsoleChannel),
            ReporterConfig::Matrix(chat) => Channel::Chat(ChatChannel {
                flavor: ChatFlavor::Matrix,
                url: chat.url.clone(),
                error_header: chat.error_header.clone(),
                error_footer: chat.error_footer.clone(),
            }),
            ReporterConfig::Slack(chat) => Channel::Chat(ChatChannel {
                flavor: ChatFlavor::Slack,
                url: chat.url.clone(),
                error_header: chat.error_header.clone(),
                error_footer: chat.error_footer.clone(),
            }),
            ReporterConfig::Discord(discord) => Channel::Discord(DiscordChannel {
                url: discord.url.clone(),
                error_header: discord.error_header.clone(),
                user_id: discord.user_id.clone(),
            }),
            ReporterConfig::Webhook(webhook) => Channel::Webhook(WebhookChannel {
                url: webhook.url.clone(),
            }),
        };

        Ok(Self::new(
            name,
            channel,
            resolve_interval(name, ok_interval)?,
            resolve_interval(name, error_interval)?,
            max_in_flight,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn rate_limit_key(&self, notification: &Notification) -> RateLimitKey {
        if self.channel.aggregates() {
            RateLimitKey::aggregated(notification.level)
        } else {
            RateLimitKey::per_sensor(notification.level, &notification.sensor_id)
        }
    }
}

fn resolve_interval(reporter: &str, raw: &str) -> Result<TimeDelta, ConfigError> {
    parse_interval(raw)
        .and_then(|interval| TimeDelta::from_std(interval).ok())
        .ok_or_else(|| ConfigError::InvalidInterval {
            reporter: reporter.to_string(),
            value: raw.to_string(),
        })
}

/// Fan-out to all configured reporters
#[derive(Debug)]
pub struct ReporterDispatch {
    reporters: Vec<Reporter>,
    client: Client,
}

impl ReporterDispatch {
    pub fn new(reporters: Vec<Reporter>, client: Client) -> Self {
        Self { reporters, client }
    }

    pub fn from_config(
        configs: &[ReporterConfig],
        general: &GeneralConfig,
    ) -> Result<Self, ConfigError> {
        let reporters = configs
            .iter()
            .map(|config| Reporter::from_config(config, general.max_in_flight_sends))
            .collect::<Result<Vec<_>, _>>()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(general.send_timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::new(reporters, client))
    }

    pub fn reporters(&self) -> &[Reporter] {
        &self.reporters
    }

    /// Offer a notification to every reporter, rate limited against `now`.
    ///
    /// Returns the handles of the sends that were launched. The ingestion path
    /// drops them; the sends finish (or fail) on their own.
    pub fn notify(
        &mut self,
        notification: &Notification,
        view: &StatusView<'_>,
        now: DateTime<Utc>,
    ) -> Vec<JoinHandle<Result<(), SendError>>> {
        let mut launched = Vec::new();

        for reporter in &mut self.reporters {
            let key = reporter.rate_limit_key(notification);
            if !reporter.limiter.try_acquire(key, now) {
                trace!(
                    "{}: {} message for {} suppressed by rate limit",
                    reporter.name, notification.level, notification.sensor_id
                );
                continue;
            }

            let Ok(permit) = reporter.in_flight.clone().try_acquire_owned() else {
                warn!(
                    "{}: too many outstanding sends, dropping {} message for {}",
                    reporter.name, notification.level, notification.sensor_id
                );
                continue;
            };

            let payload = reporter.channel.format(notification, view);
            let url = reporter.channel.url().map(str::to_string);
            let client = self.client.clone();
            let name = reporter.name.clone();
            let level = notification.level;

            debug!("sending {level} message to {name}");

            launched.push(tokio::spawn(async move {
                let result = deliver(&client, url.as_deref(), payload).await;
                drop(permit);

                match &result {
                    Ok(()) => info!("{name}: {level} message delivered"),
                    Err(e) => error!("{name}: failed to deliver {level} message: {e}"),
                }

                result
            }));
        }

        launched
    }
}

async fn deliver(client: &Client, url: Option<&str>, payload: Payload) -> Result<(), SendError> {
    match (payload, url) {
        (Payload::Console(output), _) => Ok(output.print()?),
        (Payload::Json(body), Some(url)) => post_json(client, url, &body).await,
        (Payload::Discord(message), Some(url)) => post_json(client, url, &message).await,
        (_, None) => Ok(()),
    }
}

async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &T,
) -> Result<(), SendError> {
    let response = client.post(url).json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SendError::Status { status, body });
    }

    Ok(())
}
