use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use super::NotifyLevel;

/// Granularity at which duplicate notifications are suppressed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub level: NotifyLevel,
    /// `None` for channels that aggregate all sensors into one digest
    pub sensor_id: Option<String>,
}

impl RateLimitKey {
    pub fn aggregated(level: NotifyLevel) -> Self {
        Self {
            level,
            sensor_id: None,
        }
    }

    pub fn per_sensor(level: NotifyLevel, sensor_id: &str) -> Self {
        Self {
            level,
            sensor_id: Some(sensor_id.to_string()),
        }
    }
}

/// Last-sent bookkeeping of one channel
#[derive(Debug, Clone)]
pub struct RateLimiter {
    ok_interval: TimeDelta,
    error_interval: TimeDelta,
    last_sent: HashMap<RateLimitKey, DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(ok_interval: TimeDelta, error_interval: TimeDelta) -> Self {
        Self {
            ok_interval,
            error_interval,
            last_sent: HashMap::new(),
        }
    }

    /// Alarms use the error interval, periodic and recovery messages the ok interval.
    pub fn interval_for(&self, level: NotifyLevel) -> TimeDelta {
        match level {
            NotifyLevel::Alarm => self.error_interval,
            NotifyLevel::Ok | NotifyLevel::Recovered => self.ok_interval,
        }
    }

    /// Returns `true` and records `now` if a message under `key` may be sent.
    ///
    /// The slot is consumed immediately, whether or not the delivery later succeeds.
    pub fn try_acquire(&mut self, key: RateLimitKey, now: DateTime<Utc>) -> bool {
        let interval = self.interval_for(key.level);

        match self.last_sent.get(&key) {
            Some(&last) if now - last < interval => return false,
            _ => {}
        }

        self.last_sent.insert(key, now);
        true
    }

    pub fn last_sent(&self, key: &RateLimitKey) -> Option<DateTime<Utc>> {
        self.last_sent.get(key).copied()
    }
}
