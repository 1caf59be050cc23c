//! MonitorActor - the single writer of history, alarm and rate-limit state
//!
//! ## Message Flow
//!
//! ```text
//! Reading → normalize id → HistoryStore.append → AlarmEvaluator.evaluate
//!                                  │
//!                                  ├── notify(ok)                 every reading
//!                                  └── notify(alarm | recovered)  on transitions
//!     ↑
//!     └─── Commands (Snapshot, GetAlarmStates, Shutdown)
//! ```
//!
//! Readings are drained before commands, so a snapshot requested after an
//! `ingest` call returned always reflects that reading.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

use crate::monitors::alarm::{AlarmEvaluator, AlarmState};
use crate::monitors::history::HistoryStore;
use crate::registry::SensorRegistry;
use crate::reporters::{Notification, NotifyLevel, ReporterDispatch};
use crate::snapshot::{StatusSnapshot, StatusView};
use crate::util::normalize_sensor_id;

use super::messages::{MonitorCommand, Reading};

const READING_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 32;

pub struct MonitorActor {
    registry: Arc<SensorRegistry>,
    history: HistoryStore,
    alarms: AlarmEvaluator,
    dispatch: ReporterDispatch,

    reading_rx: mpsc::Receiver<Reading>,
    command_rx: mpsc::Receiver<MonitorCommand>,
}

impl MonitorActor {
    pub fn new(
        registry: Arc<SensorRegistry>,
        dispatch: ReporterDispatch,
        reading_rx: mpsc::Receiver<Reading>,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        Self {
            history: HistoryStore::new(&registry),
            alarms: AlarmEvaluator::new(registry.clone()),
            registry,
            dispatch,
            reading_rx,
            command_rx,
        }
    }

    /// Run until a Shutdown command arrives or every handle is gone
    #[instrument(skip(self), fields(sensors = self.registry.len()))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        loop {
            tokio::select! {
                biased;

                Some(reading) = self.reading_rx.recv() => {
                    self.process(reading);
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        MonitorCommand::Snapshot { respond_to } => {
                            trace!("received Snapshot command");
                            let _ = respond_to.send(self.snapshot());
                        }

                        MonitorCommand::GetAlarmStates { sensor_id, respond_to } => {
                            let states = self
                                .alarms
                                .states(&normalize_sensor_id(&sensor_id))
                                .map(<[AlarmState]>::to_vec);
                            let _ = respond_to.send(states);
                        }

                        MonitorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("all channels closed, shutting down");
                    break;
                }
            }
        }

        debug!("monitor actor stopped");
    }

    fn process(&mut self, reading: Reading) {
        let sensor_id = normalize_sensor_id(&reading.sensor_id);

        let Some(sensor) = self.registry.get(&sensor_id) else {
            trace!("ignoring reading from unknown sensor {}", reading.sensor_id);
            return;
        };

        let retained = self
            .history
            .append(&sensor_id, &reading.fields, reading.timestamp);
        let events = self
            .alarms
            .evaluate(&sensor_id, &reading.fields, reading.timestamp);

        let primary = sensor.primary_parameter();
        let value = reading
            .fields
            .get(primary)
            .filter(|v| !v.is_nan())
            .map_or_else(|| "NA".to_string(), f64::to_string);

        debug!(
            "{}: {primary}={value} (retained primary: {}, supplementary: {})",
            sensor.label, retained.primary, retained.supplementary
        );

        let mut notifications = vec![Notification {
            sensor_id: sensor_id.clone(),
            message: format!("{}: {primary}={value}", sensor.label),
            level: NotifyLevel::Ok,
            timestamp: reading.timestamp,
        }];

        notifications.extend(events.into_iter().filter_map(|event| {
            NotifyLevel::from_alarm(event.level).map(|level| Notification {
                sensor_id: event.sensor_id,
                message: event.message,
                level,
                timestamp: event.timestamp,
            })
        }));

        let now = Utc::now();
        for notification in &notifications {
            let view = StatusView::new(&self.registry, &self.history, &self.alarms);
            // sends run detached, the ingestion path never awaits them
            drop(self.dispatch.notify(notification, &view, now));
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusView::new(&self.registry, &self.history, &self.alarms).snapshot(Utc::now())
    }
}

/// Handle for feeding and querying a MonitorActor
///
/// Cheap to clone; the actor stops once every handle is dropped.
#[derive(Clone)]
pub struct MonitorHandle {
    reading_tx: mpsc::Sender<Reading>,
    command_tx: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn a new monitor actor owning the given registry and dispatch
    pub fn spawn(registry: Arc<SensorRegistry>, dispatch: ReporterDispatch) -> Self {
        Self::spawn_with_task(registry, dispatch).0
    }

    /// Like [`MonitorHandle::spawn`], also returning the actor task so callers
    /// can wait for it to finish after `shutdown`
    pub fn spawn_with_task(
        registry: Arc<SensorRegistry>,
        dispatch: ReporterDispatch,
    ) -> (Self, JoinHandle<()>) {
        let (reading_tx, reading_rx) = mpsc::channel(READING_BUFFER);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = MonitorActor::new(registry, dispatch, reading_rx, command_rx);
        let task = tokio::spawn(actor.run());

        (
            Self {
                reading_tx,
                command_tx,
            },
            task,
        )
    }

    /// Queue a reading; waits only while the reading buffer is full
    pub async fn ingest(&self, reading: Reading) -> Result<()> {
        self.reading_tx
            .send(reading)
            .await
            .context("monitor actor is not running")?;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<StatusSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(MonitorCommand::Snapshot { respond_to: tx })
            .await
            .context("failed to send Snapshot command")?;

        rx.await.context("failed to receive snapshot")
    }

    pub async fn alarm_states(&self, sensor_id: &str) -> Result<Option<Vec<AlarmState>>> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(MonitorCommand::GetAlarmStates {
                sensor_id: sensor_id.to_string(),
                respond_to: tx,
            })
            .await
            .context("failed to send GetAlarmStates command")?;

        rx.await.context("failed to receive alarm states")
    }

    /// Queue a shutdown; readings already queued are processed first
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
