//! Bounded per-sensor time series
//!
//! Every sensor owns one [`HistoryRecord`] holding a primary retention tier and
//! an optional supplementary tier. Each tier keeps a ring buffer of timestamps and
//! one index-aligned ring buffer of values per tracked parameter.
//!
//! ## Sampling throttle
//!
//! ```text
//! tier empty                                   → retain
//! timestamp - last_timestamp >= min_interval   → retain
//! otherwise                                    → skip (tier unchanged)
//! ```
//!
//! The throttle is evaluated per tier, so a reading may land in the primary tier
//! but not in the coarser supplementary one.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use crate::registry::{Retention, Sensor, SensorRegistry};

/// Fixed-capacity FIFO buffer, the oldest element is evicted first
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new element, returning the evicted one if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A single retained `(timestamp, value)` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: Option<f64>,
}

/// One retention tier of a sensor
#[derive(Debug, Clone)]
pub struct Resolution {
    retention: Retention,
    timestamps: RingBuffer<i64>,
    values: Vec<(String, RingBuffer<Option<f64>>)>,
}

impl Resolution {
    fn new(retention: Retention, parameters: &[String]) -> Self {
        Self {
            retention,
            timestamps: RingBuffer::new(retention.capacity),
            values: parameters
                .iter()
                .map(|parameter| (parameter.clone(), RingBuffer::new(retention.capacity)))
                .collect(),
        }
    }

    fn accepts(&self, timestamp: i64) -> bool {
        match self.timestamps.last() {
            None => true,
            Some(&last) => timestamp.saturating_sub(last) >= self.retention.min_interval_secs as i64,
        }
    }

    fn push(&mut self, fields: &HashMap<String, f64>, timestamp: i64) -> bool {
        if !self.accepts(timestamp) {
            return false;
        }

        self.timestamps.push(timestamp);
        for (parameter, buffer) in &mut self.values {
            buffer.push(fields.get(parameter).copied().filter(|v| !v.is_nan()));
        }

        true
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn timestamps(&self) -> &RingBuffer<i64> {
        &self.timestamps
    }

    pub fn values(&self, parameter: &str) -> Option<&RingBuffer<Option<f64>>> {
        self.values
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, buffer)| buffer)
    }

    /// Ordered `(timestamp, value)` pairs for one parameter, oldest first
    pub fn samples(&self, parameter: &str) -> Vec<Sample> {
        let Some(values) = self.values(parameter) else {
            return Vec::new();
        };

        self.timestamps
            .iter()
            .zip(values.iter())
            .map(|(&timestamp, &value)| Sample { timestamp, value })
            .collect()
    }

    pub fn latest(&self, parameter: &str) -> Option<f64> {
        self.values(parameter)?.last().copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// History of one sensor across both retention tiers
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub primary: Resolution,
    pub supplementary: Option<Resolution>,
}

impl HistoryRecord {
    fn new(sensor: &Sensor) -> Self {
        Self {
            primary: Resolution::new(sensor.history, &sensor.parameters),
            supplementary: sensor
                .supplementary
                .map(|retention| Resolution::new(retention, &sensor.parameters)),
        }
    }
}

/// Which tiers retained a reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Retained {
    pub primary: bool,
    pub supplementary: bool,
}

/// Owner of all per-sensor history records
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    records: HashMap<String, HistoryRecord>,
}

impl HistoryStore {
    pub fn new(registry: &SensorRegistry) -> Self {
        Self {
            records: registry
                .iter()
                .map(|sensor| (sensor.id.clone(), HistoryRecord::new(sensor)))
                .collect(),
        }
    }

    /// Append a reading to every tier whose throttle allows it.
    ///
    /// Unknown sensor ids are ignored.
    pub fn append(
        &mut self,
        sensor_id: &str,
        fields: &HashMap<String, f64>,
        timestamp: DateTime<Utc>,
    ) -> Retained {
        let Some(record) = self.records.get_mut(sensor_id) else {
            trace!("no history record for {sensor_id}, ignoring");
            return Retained::default();
        };

        let timestamp = round_to_secs(timestamp);

        let retained = Retained {
            primary: record.primary.push(fields, timestamp),
            supplementary: record
                .supplementary
                .as_mut()
                .is_some_and(|tier| tier.push(fields, timestamp)),
        };

        trace!("{sensor_id}: retained reading at {timestamp} -> {retained:?}");
        retained
    }

    /// Most recent primary value of a parameter
    pub fn latest(&self, sensor_id: &str, parameter: &str) -> Option<f64> {
        self.records.get(sensor_id)?.primary.latest(parameter)
    }

    pub fn snapshot(&self, sensor_id: &str) -> Option<&HistoryRecord> {
        self.records.get(sensor_id)
    }
}

/// Nearest whole second; integer math so the extremes of the chrono range cannot overflow
fn round_to_secs(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis().saturating_add(500).div_euclid(1000)
}
