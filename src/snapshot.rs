//! Read-only views of the monitor state
//!
//! [`StatusView`] borrows the live state from the ingestion path and is only
//! valid between two readings. [`StatusSnapshot`] is the owned, serializable
//! copy handed to the status endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitors::alarm::{AlarmEvaluator, AlarmStatus};
use crate::monitors::history::{HistoryStore, Sample};
use crate::registry::{Sensor, SensorRegistry};

/// Borrowed view over the state owned by the monitor
#[derive(Clone, Copy)]
pub struct StatusView<'a> {
    pub registry: &'a SensorRegistry,
    pub history: &'a HistoryStore,
    pub alarms: &'a AlarmEvaluator,
}

impl<'a> StatusView<'a> {
    pub fn new(
        registry: &'a SensorRegistry,
        history: &'a HistoryStore,
        alarms: &'a AlarmEvaluator,
    ) -> Self {
        Self {
            registry,
            history,
            alarms,
        }
    }

    /// One row per sensor that has retained at least one sample
    pub fn summary(&self) -> Vec<SensorSummary> {
        self.registry
            .iter()
            .filter(|sensor| {
                self.history
                    .snapshot(&sensor.id)
                    .is_some_and(|record| !record.primary.is_empty())
            })
            .map(|sensor| SensorSummary {
                label: sensor.label.clone(),
                parameter: sensor.primary_parameter().to_string(),
                value: self.history.latest(&sensor.id, sensor.primary_parameter()),
                battery: sensor
                    .tracks("battery")
                    .then(|| self.history.latest(&sensor.id, "battery"))
                    .flatten(),
                status: self.alarms.worst_status(&sensor.id),
            })
            .collect()
    }

    pub fn snapshot(&self, generated_at: DateTime<Utc>) -> StatusSnapshot {
        StatusSnapshot {
            generated_at,
            sensors: self
                .registry
                .iter()
                .map(|sensor| self.sensor_status(sensor))
                .collect(),
        }
    }

    fn sensor_status(&self, sensor: &Sensor) -> SensorStatus {
        let record = self.history.snapshot(&sensor.id);

        let parameters = sensor
            .parameters
            .iter()
            .map(|name| ParameterStatus {
                name: name.clone(),
                latest: self.history.latest(&sensor.id, name),
                history: record
                    .map(|record| record.primary.samples(name))
                    .unwrap_or_default(),
                supplementary: record
                    .and_then(|record| record.supplementary.as_ref())
                    .map(|tier| tier.samples(name)),
            })
            .collect();

        let states = self.alarms.states(&sensor.id).unwrap_or_default();
        let alarms = sensor
            .alarm_rules
            .iter()
            .zip(states)
            .map(|(rule, state)| AlarmSnapshot {
                parameter: rule.parameter.clone(),
                min: rule.min,
                max: rule.max,
                confirmation_count: rule.confirmation_count,
                status: state.status(),
                consecutive_violations: state.consecutive_violations(),
            })
            .collect();

        SensorStatus {
            id: sensor.id.clone(),
            label: sensor.label.clone(),
            status: self.alarms.worst_status(&sensor.id),
            parameters,
            alarms,
        }
    }
}

/// Condensed per-sensor line used by summary style reporters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSummary {
    pub label: String,
    pub parameter: String,
    pub value: Option<f64>,
    pub battery: Option<f64>,
    pub status: AlarmStatus,
}

/// Point-in-time copy of the whole monitor state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub generated_at: DateTime<Utc>,
    pub sensors: Vec<SensorStatus>,
}

impl StatusSnapshot {
    pub fn sensor(&self, id: &str) -> Option<&SensorStatus> {
        self.sensors.iter().find(|sensor| sensor.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatus {
    pub id: String,
    pub label: String,
    /// Most severe status across all alarm rules
    pub status: AlarmStatus,
    pub parameters: Vec<ParameterStatus>,
    pub alarms: Vec<AlarmSnapshot>,
}

impl SensorStatus {
    pub fn parameter(&self, name: &str) -> Option<&ParameterStatus> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterStatus {
    pub name: String,
    pub latest: Option<f64>,
    pub history: Vec<Sample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplementary: Option<Vec<Sample>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSnapshot {
    pub parameter: String,
    pub min: f64,
    pub max: f64,
    pub confirmation_count: usize,
    pub status: AlarmStatus,
    pub consecutive_violations: usize,
}
