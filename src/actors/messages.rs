//! Message types for actor communication
//!
//! Readings travel on their own mpsc channel; control and query commands on a
//! second one. Queries carry a oneshot sender for the answer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::monitors::alarm::AlarmState;
use crate::snapshot::StatusSnapshot;

/// One decoded sensor advertisement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensor identifier as reported by the adapter (normalized on ingestion)
    pub sensor_id: String,

    /// Parameter name → measured value
    pub fields: HashMap<String, f64>,

    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(sensor_id: impl ToString, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            fields: HashMap::new(),
            timestamp,
        }
    }

    pub fn with_field(mut self, name: impl ToString, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }
}

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Consistent point-in-time view of all sensors
    Snapshot {
        respond_to: oneshot::Sender<StatusSnapshot>,
    },

    /// Alarm states of one sensor, in rule order
    GetAlarmStates {
        sensor_id: String,
        respond_to: oneshot::Sender<Option<Vec<AlarmState>>>,
    },

    /// Stop processing; pending readings are dropped
    Shutdown,
}
