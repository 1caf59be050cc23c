//! Actor-based ingestion pipeline
//!
//! The monitor runs as one async task that exclusively owns all mutable state
//! (history, alarm states, rate-limit bookkeeping). Everything else talks to it
//! through a [`monitor::MonitorHandle`].
//!
//! ## Architecture Overview
//!
//! ```text
//!   ingest adapter (stdin NDJSON)        status endpoint (api feature)
//!              │ Reading                          │ Snapshot
//!              ▼                                  ▼
//!        ┌──────────────────────────────────────────────┐
//!        │                 MonitorActor                 │
//!        │  HistoryStore · AlarmEvaluator · Dispatch    │
//!        └──────────────────────┬───────────────────────┘
//!                               │ spawned sends
//!              ┌────────────────┼────────────────┐
//!              ▼                ▼                ▼
//!           console         matrix/slack     discord/webhook
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Readings**: mpsc channel, processed strictly in arrival order
//! 2. **Commands**: second mpsc channel for control and queries
//! 3. **Request/Response**: oneshot channels carry query answers back

pub mod messages;
pub mod monitor;
