//! Sensor status endpoint

use axum::{Json, extract::State};

use crate::actors::monitor::MonitorHandle;
use crate::api::ApiResult;
use crate::snapshot::StatusSnapshot;

/// GET /status
///
/// The snapshot is taken by the monitor actor itself, so it never mixes
/// half-processed readings.
pub async fn get_status(State(monitor): State<MonitorHandle>) -> ApiResult<Json<StatusSnapshot>> {
    let snapshot = monitor.snapshot().await?;
    Ok(Json(snapshot))
}
