//! Box-drawn summary table printed to the terminal
//!
//! ```text
//!     ┌─────────────────────────────────────────────────────────────────────────┐
//!     │ Sensors                                                2024-05-01 12:00 │
//!     │ IP: 192.168.1.20                                                        │
//!     ├─────────────────────────┬───────────────┬───────────────┬───────────────┤
//!     │ Sensor                  │ Value         │ Battery       │ Status        │
//!     ├─────────────────────────┼───────────────┼───────────────┼───────────────┤
//!     │ Freezer                 │ -18.2         │ 87            │ OK            │
//!     └─────────────────────────┴───────────────┴───────────────┴───────────────┘
//! ```

use std::io::Write;
use std::net::IpAddr;

use chrono::Local;

use crate::monitors::alarm::AlarmStatus;
use crate::snapshot::SensorSummary;

use super::{Notification, NotifyLevel};

const LABEL_WIDTH: usize = 25;
const COLUMN_WIDTH: usize = 15;
const INNER_WIDTH: usize = LABEL_WIDTH + 3 * COLUMN_WIDTH + 3;

const GREEN: &str = "\x1b[1;32m";
const RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

/// Rendered console output
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleOutput {
    pub table: String,
    /// Alarm text, written to stderr
    pub alert: Option<String>,
}

impl ConsoleOutput {
    pub fn print(&self) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout)?;
        write!(stdout, "{}", self.table)?;
        stdout.flush()?;

        if let Some(alert) = &self.alert {
            writeln!(std::io::stderr().lock(), "{alert}")?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn format(
        &self,
        notification: &Notification,
        rows: &[SensorSummary],
        host: IpAddr,
    ) -> ConsoleOutput {
        // shift the table a little on every render so it does not burn into idle displays
        let margin = " ".repeat(4 + notification.timestamp.timestamp().rem_euclid(4) as usize);
        let time = notification
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        let mut table = String::new();
        let mut line = |content: String| {
            table.push_str(&margin);
            table.push_str(&content);
            table.push('\n');
        };

        line(format!("┌{}┐", "─".repeat(INNER_WIDTH)));
        line(format!("│ Sensors{time:>w$} │", w = INNER_WIDTH - 9));
        line(format!("│ {:<w$}│", format!("IP: {host}"), w = INNER_WIDTH - 1));
        line(separator('├', '┬', '┤'));
        line(format!(
            "│ {:<lw$}│ {:<cw$}│ {:<cw$}│ {:<cw$}│",
            "Sensor",
            "Value",
            "Battery",
            "Status",
            lw = LABEL_WIDTH - 1,
            cw = COLUMN_WIDTH - 1
        ));
        line(separator('├', '┼', '┤'));

        for row in rows {
            let status = match row.status {
                AlarmStatus::Unknown | AlarmStatus::Ok => {
                    format!("{GREEN}{:<w$}{RESET}", "OK", w = COLUMN_WIDTH - 1)
                }
                violating => format!("{RED}{:<w$}{RESET}", violating.to_string(), w = COLUMN_WIDTH - 1),
            };

            line(format!(
                "│ {:<lw$}│ {:<cw$}│ {:<cw$}│ {status}│",
                row.label,
                display_value(row.value),
                display_value(row.battery),
                lw = LABEL_WIDTH - 1,
                cw = COLUMN_WIDTH - 1
            ));
        }

        line(separator('└', '┴', '┘'));

        ConsoleOutput {
            table,
            alert: (notification.level == NotifyLevel::Alarm).then(|| notification.message.clone()),
        }
    }
}

fn separator(left: char, middle: char, right: char) -> String {
    format!(
        "{left}{}{middle}{}{middle}{}{middle}{}{right}",
        "─".repeat(LABEL_WIDTH),
        "─".repeat(COLUMN_WIDTH),
        "─".repeat(COLUMN_WIDTH),
        "─".repeat(COLUMN_WIDTH),
    )
}

fn display_value(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| v.to_string())
}
