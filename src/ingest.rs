//! Newline-delimited JSON ingestion
//!
//! One record per line:
//!
//! ```text
//! {"sensor_id": "A4:C1:38:00:00:01", "fields": {"temperature": 21.4}, "timestamp": 1700000000}
//! ```
//!
//! `timestamp` is unix seconds and optional (defaults to the time of decoding).

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, instrument, trace, warn};

use crate::actors::messages::Reading;
use crate::actors::monitor::MonitorHandle;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp {0} is out of range")]
    Timestamp(f64),
}

#[derive(Debug, Deserialize)]
struct RawReading {
    sensor_id: String,
    #[serde(default)]
    fields: HashMap<String, f64>,
    timestamp: Option<f64>,
}

/// Decode one line into a reading
pub fn decode_reading(line: &str) -> Result<Reading, DecodeError> {
    let raw: RawReading = serde_json::from_str(line)?;

    let timestamp = match raw.timestamp {
        Some(secs) => from_unix_secs(secs)?,
        None => Utc::now(),
    };

    Ok(Reading {
        sensor_id: raw.sensor_id,
        fields: raw.fields,
        timestamp,
    })
}

/// Last second of year 9999; anything past it is treated as a corrupt record
const MAX_TIMESTAMP_SECS: f64 = 253_402_300_799.0;

fn from_unix_secs(secs: f64) -> Result<DateTime<Utc>, DecodeError> {
    if !secs.is_finite() || secs.abs() > MAX_TIMESTAMP_SECS {
        return Err(DecodeError::Timestamp(secs));
    }

    let millis = (secs * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(DecodeError::Timestamp(secs))
}

/// Feed every line of `reader` into the monitor until EOF.
///
/// Blank lines are skipped, undecodable lines are logged and dropped.
/// Returns the number of readings handed to the monitor.
#[instrument(skip_all)]
pub async fn run_line_reader<R>(reader: R, monitor: &MonitorHandle) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match decode_reading(line) {
            Ok(reading) => {
                trace!("decoded reading from {}", reading.sensor_id);
                monitor.ingest(reading).await?;
                forwarded += 1;
            }
            Err(e) => warn!("dropping line: {e}"),
        }
    }

    debug!("input closed after {forwarded} readings");
    Ok(forwarded)
}
