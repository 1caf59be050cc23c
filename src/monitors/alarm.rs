//! Alarm evaluation with hysteresis
//!
//! Every `(sensor, rule)` pair owns an [`AlarmState`] that is driven by each
//! incoming reading:
//!
//! ```text
//! value outside [min, max]:
//!   violations == 1, not yet alerting      → Alerting (emit alert)
//!   violations >= confirmation, not alarming → Alarming (emit alarm)
//!   otherwise                               → count silently
//!
//! value inside [min, max]:
//!   violations >= confirmation             → Ok (emit recovered)
//!   otherwise                              → Ok
//! ```
//!
//! A single in-range reading is enough to recover, which keeps transient
//! spikes from paging anyone while still clearing alarms promptly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::registry::{AlarmRule, SensorRegistry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStatus {
    /// No reading evaluated yet
    #[default]
    Unknown,
    Ok,
    /// Out of range, still counting towards confirmation
    Alerting,
    /// Out of range for at least `confirmation_count` readings
    Alarming,
}

impl AlarmStatus {
    pub fn is_violating(self) -> bool {
        matches!(self, AlarmStatus::Alerting | AlarmStatus::Alarming)
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmStatus::Unknown => write!(f, "NA"),
            AlarmStatus::Ok => write!(f, "OK"),
            AlarmStatus::Alerting => write!(f, "Alert"),
            AlarmStatus::Alarming => write!(f, "Alarm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmLevel {
    /// First out-of-range reading, informational only
    Alert,
    /// Violation confirmed
    Alarm,
    /// Back in range after a confirmed violation
    Recovered,
}

/// Emitted whenever an alarm state transition is noteworthy
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmEvent {
    pub sensor_id: String,
    pub rule_index: usize,
    pub parameter: String,
    pub level: AlarmLevel,
    pub value: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Mutable hysteresis state of one alarm rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlarmState {
    consecutive_violations: usize,
    status: AlarmStatus,
}

impl AlarmState {
    pub fn consecutive_violations(&self) -> usize {
        self.consecutive_violations
    }

    pub fn status(&self) -> AlarmStatus {
        self.status
    }

    /// Feed one observed value through the state machine and return the levels
    /// that should be emitted, in order.
    pub fn observe(&mut self, rule: &AlarmRule, value: f64) -> Vec<AlarmLevel> {
        let mut levels = Vec::new();

        if rule.is_violated_by(value) {
            self.consecutive_violations = self.consecutive_violations.saturating_add(1);

            if self.consecutive_violations == 1 && !self.status.is_violating() {
                self.status = AlarmStatus::Alerting;
                levels.push(AlarmLevel::Alert);
            }

            if self.consecutive_violations >= rule.confirmation_count
                && self.status != AlarmStatus::Alarming
            {
                self.status = AlarmStatus::Alarming;
                levels.push(AlarmLevel::Alarm);
            }
        } else {
            if self.consecutive_violations >= rule.confirmation_count {
                levels.push(AlarmLevel::Recovered);
            }

            self.consecutive_violations = 0;
            self.status = AlarmStatus::Ok;
        }

        levels
    }
}

/// Owner of every alarm state, keyed by sensor id and rule position
#[derive(Debug, Clone)]
pub struct AlarmEvaluator {
    registry: Arc<SensorRegistry>,
    states: HashMap<String, Vec<AlarmState>>,
}

impl AlarmEvaluator {
    pub fn new(registry: Arc<SensorRegistry>) -> Self {
        let states = registry
            .iter()
            .map(|sensor| {
                (
                    sensor.id.clone(),
                    vec![AlarmState::default(); sensor.alarm_rules.len()],
                )
            })
            .collect();

        Self { registry, states }
    }

    /// Evaluate every rule of the sensor against one reading.
    ///
    /// Rules whose parameter is missing (or not a number) are left untouched.
    pub fn evaluate(
        &mut self,
        sensor_id: &str,
        fields: &HashMap<String, f64>,
        timestamp: DateTime<Utc>,
    ) -> Vec<AlarmEvent> {
        let (Some(sensor), Some(states)) =
            (self.registry.get(sensor_id), self.states.get_mut(sensor_id))
        else {
            trace!("no alarm rules for {sensor_id}, ignoring");
            return Vec::new();
        };

        let mut events = Vec::new();

        for (rule_index, (rule, state)) in sensor.alarm_rules.iter().zip(states.iter_mut()).enumerate() {
            let Some(value) = fields.get(&rule.parameter).copied().filter(|v| !v.is_nan()) else {
                continue;
            };

            let levels = state.observe(rule, value);

            trace!(
                "{}: {} {value} vs [{}, {}], violations {}/{} → {:?}",
                sensor.label,
                rule.parameter,
                rule.min,
                rule.max,
                state.consecutive_violations,
                rule.confirmation_count,
                state.status
            );

            for level in levels {
                let message = match level {
                    AlarmLevel::Alert | AlarmLevel::Alarm => violation_message(&sensor.label, rule, value),
                    AlarmLevel::Recovered => format!(
                        "{}: {} back to normal range at {value}",
                        sensor.label, rule.parameter
                    ),
                };

                debug!("{level:?}: {message}");

                events.push(AlarmEvent {
                    sensor_id: sensor.id.clone(),
                    rule_index,
                    parameter: rule.parameter.clone(),
                    level,
                    value,
                    message,
                    timestamp,
                });
            }
        }

        events
    }

    pub fn states(&self, sensor_id: &str) -> Option<&[AlarmState]> {
        self.states.get(sensor_id).map(Vec::as_slice)
    }

    pub fn status(&self, sensor_id: &str, rule_index: usize) -> Option<AlarmStatus> {
        self.states(sensor_id)?.get(rule_index).map(AlarmState::status)
    }

    /// Most severe status across all rules of a sensor
    pub fn worst_status(&self, sensor_id: &str) -> AlarmStatus {
        self.states(sensor_id)
            .into_iter()
            .flatten()
            .map(AlarmState::status)
            .max_by_key(|status| match status {
                AlarmStatus::Unknown => 0,
                AlarmStatus::Ok => 1,
                AlarmStatus::Alerting => 2,
                AlarmStatus::Alarming => 3,
            })
            .unwrap_or_default()
    }
}

fn violation_message(label: &str, rule: &AlarmRule, value: f64) -> String {
    if value < rule.min {
        format!("{label}: {} too low (min {}) at {value}", rule.parameter, rule.min)
    } else {
        format!("{label}: {} too high (max {}) at {value}", rule.parameter, rule.max)
    }
}
