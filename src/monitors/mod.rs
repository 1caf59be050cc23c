//! Per-reading state owned by the ingestion path
//!
//! - [`history`]: bounded time series per sensor
//! - [`alarm`]: hysteresis state machine per alarm rule

pub mod alarm;
pub mod history;
