//! Static sensor definitions
//!
//! The registry is built once from the configuration and never mutated afterwards.
//! All per-sensor runtime state (history, alarm counters) is keyed by [`Sensor::id`].

use std::collections::HashMap;

use serde::Serialize;

use crate::config::{ConfigError, SensorConfig};
use crate::util::normalize_sensor_id;

/// Threshold rule attached to one tracked parameter of a sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmRule {
    pub parameter: String,
    pub min: f64,
    pub max: f64,
    /// Consecutive out-of-range readings required before the alarm is confirmed
    pub confirmation_count: usize,
}

impl AlarmRule {
    /// Bounds are inclusive: only values strictly outside `[min, max]` violate the rule.
    pub fn is_violated_by(&self, value: f64) -> bool {
        value < self.min || value > self.max
    }
}

/// Retention settings for one history tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Retention {
    pub capacity: usize,
    pub min_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensor {
    pub id: String,
    pub label: String,
    pub parameters: Vec<String>,
    pub history: Retention,
    pub supplementary: Option<Retention>,
    pub alarm_rules: Vec<AlarmRule>,
}

impl Sensor {
    pub fn tracks(&self, parameter: &str) -> bool {
        self.parameters.iter().any(|p| p == parameter)
    }

    /// The parameter used for periodic status messages and summaries
    pub fn primary_parameter(&self) -> &str {
        &self.parameters[0]
    }

    fn from_config(config: &SensorConfig) -> Result<Self, ConfigError> {
        let id = normalize_sensor_id(&config.id);

        let sensor = Sensor {
            label: config.label.clone(),
            parameters: config.parameters.clone(),
            history: Retention {
                capacity: config.history_capacity,
                min_interval_secs: config.history_min_interval,
            },
            supplementary: match (
                config.supplementary_capacity,
                config.supplementary_min_interval,
            ) {
                (Some(capacity), Some(min_interval_secs)) => Some(Retention {
                    capacity,
                    min_interval_secs,
                }),
                (None, None) => None,
                _ => return Err(ConfigError::IncompleteSupplementary(id)),
            },
            alarm_rules: config
                .alarms
                .iter()
                .map(|alarm| AlarmRule {
                    parameter: alarm.parameter.clone(),
                    min: alarm.min,
                    max: alarm.max,
                    confirmation_count: alarm.confirmation,
                })
                .collect(),
            id,
        };

        sensor.validate()?;
        Ok(sensor)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parameters.is_empty() {
            return Err(ConfigError::EmptyParameters(self.id.clone()));
        }

        let zero_capacity = self.history.capacity == 0
            || self.supplementary.is_some_and(|retention| retention.capacity == 0);
        if zero_capacity {
            return Err(ConfigError::ZeroCapacity {
                sensor: self.id.clone(),
            });
        }

        for rule in &self.alarm_rules {
            if !self.tracks(&rule.parameter) {
                return Err(ConfigError::UnknownParameter {
                    sensor: self.id.clone(),
                    parameter: rule.parameter.clone(),
                });
            }

            if !rule.min.is_finite() || !rule.max.is_finite() || rule.min > rule.max {
                return Err(ConfigError::InvalidBounds {
                    sensor: self.id.clone(),
                    parameter: rule.parameter.clone(),
                    min: rule.min,
                    max: rule.max,
                });
            }

            if rule.confirmation_count == 0 {
                return Err(ConfigError::ZeroConfirmation {
                    sensor: self.id.clone(),
                    parameter: rule.parameter.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Immutable, ordered set of known sensors
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: Vec<Sensor>,
    index: HashMap<String, usize>,
}

impl SensorRegistry {
    /// Build a registry from already constructed sensors, applying the same
    /// validation as [`SensorRegistry::from_config`].
    pub fn new(sensors: Vec<Sensor>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(sensors.len());
        let mut sensors = sensors;

        for (position, sensor) in sensors.iter_mut().enumerate() {
            sensor.id = normalize_sensor_id(&sensor.id);
            sensor.validate()?;

            if index.insert(sensor.id.clone(), position).is_some() {
                return Err(ConfigError::DuplicateSensor(sensor.id.clone()));
            }
        }

        Ok(Self { sensors, index })
    }

    pub fn from_config(configs: &[SensorConfig]) -> Result<Self, ConfigError> {
        let sensors = configs
            .iter()
            .map(Sensor::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(sensors)
    }

    pub fn get(&self, id: &str) -> Option<&Sensor> {
        self.index.get(id).map(|&position| &self.sensors[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
