use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

/// Top-level configuration file layout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub sensors: Vec<SensorConfig>,

    #[serde(default)]
    pub reporters: Vec<ReporterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Log every reading and alarm transition
    #[serde(default)]
    pub verbose: bool,

    /// Bind address of the status endpoint (disabled when absent)
    pub status_addr: Option<SocketAddr>,

    /// Upper bound of outstanding sends per reporter channel
    #[serde(default = "default_max_in_flight_sends")]
    pub max_in_flight_sends: usize,

    /// Timeout applied to every outbound request
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            status_addr: None,
            max_in_flight_sends: default_max_in_flight_sends(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_max_in_flight_sends() -> usize {
    8
}

fn default_send_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Hardware address or any other stable identifier
    pub id: String,
    pub label: String,
    pub parameters: Vec<String>,

    pub history_capacity: usize,
    /// Minimum spacing between retained primary samples, in seconds
    #[serde(default)]
    pub history_min_interval: u64,

    pub supplementary_capacity: Option<usize>,
    /// Minimum spacing between retained supplementary samples, in seconds
    pub supplementary_min_interval: Option<u64>,

    #[serde(default)]
    pub alarms: Vec<AlarmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmConfig {
    pub parameter: String,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_confirmation")]
    pub confirmation: usize,
}

fn default_confirmation() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReporterConfig {
    Console(ConsoleReporterConfig),
    Matrix(ChatReporterConfig),
    Slack(ChatReporterConfig),
    Discord(DiscordReporterConfig),
    Webhook(WebhookReporterConfig),
}

impl ReporterConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ReporterConfig::Console(_) => "console",
            ReporterConfig::Matrix(_) => "matrix",
            ReporterConfig::Slack(_) => "slack",
            ReporterConfig::Discord(_) => "discord",
            ReporterConfig::Webhook(_) => "webhook",
        }
    }

    /// Raw `(ok_interval, error_interval)` pair
    pub fn intervals(&self) -> (&str, &str) {
        match self {
            ReporterConfig::Console(c) => (&c.ok_interval, &c.error_interval),
            ReporterConfig::Matrix(c) | ReporterConfig::Slack(c) => {
                (&c.ok_interval, &c.error_interval)
            }
            ReporterConfig::Discord(c) => (&c.ok_interval, &c.error_interval),
            ReporterConfig::Webhook(c) => (&c.ok_interval, &c.error_interval),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ReporterConfig::Console(_) => None,
            ReporterConfig::Matrix(c) | ReporterConfig::Slack(c) => Some(&c.url),
            ReporterConfig::Discord(c) => Some(&c.url),
            ReporterConfig::Webhook(c) => Some(&c.url),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleReporterConfig {
    pub ok_interval: String,
    pub error_interval: String,
}

/// Matrix and Slack share the same header/footer templating
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReporterConfig {
    pub url: String,
    pub ok_interval: String,
    pub error_interval: String,
    #[serde(default)]
    pub error_header: String,
    #[serde(default)]
    pub error_footer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordReporterConfig {
    pub url: String,
    pub ok_interval: String,
    pub error_interval: String,
    #[serde(default)]
    pub error_header: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookReporterConfig {
    pub url: String,
    pub ok_interval: String,
    pub error_interval: String,
}

/// Fatal configuration problems, detected before ingestion starts
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sensor `{0}` is configured more than once")]
    DuplicateSensor(String),

    #[error("sensor `{0}` does not track any parameter")]
    EmptyParameters(String),

    #[error("sensor `{sensor}` has a history capacity of zero")]
    ZeroCapacity { sensor: String },

    #[error(
        "sensor `{0}` must set both `supplementary_capacity` and `supplementary_min_interval`"
    )]
    IncompleteSupplementary(String),

    #[error("alarm on `{sensor}` references untracked parameter `{parameter}`")]
    UnknownParameter { sensor: String, parameter: String },

    #[error("alarm on `{sensor}`/`{parameter}` has invalid bounds (min {min}, max {max})")]
    InvalidBounds {
        sensor: String,
        parameter: String,
        min: f64,
        max: f64,
    },

    #[error("alarm on `{sensor}`/`{parameter}` needs a confirmation count of at least 1")]
    ZeroConfirmation { sensor: String, parameter: String },

    #[error("reporter `{reporter}` has invalid interval `{value}` (expected e.g. 30m, 2h, 1d)")]
    InvalidInterval { reporter: String, value: String },

    #[error("reporter `{reporter}` has invalid url `{url}`")]
    InvalidUrl { reporter: String, url: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Parse a configuration document from its TOML source
pub fn parse_config(source: &str) -> anyhow::Result<Config> {
    toml::from_str::<Config>(source)
        .context("invalid configuration file provided")
        .inspect(|config| trace!("loaded config: {config:?}"))
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&file_content)
}
