//! Read-only HTTP status endpoint
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /status` - Point-in-time snapshot of every sensor

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResult};

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::actors::monitor::MonitorHandle;

/// Router serving the status endpoints from the given monitor
pub fn router(monitor: MonitorHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/status", get(routes::status::get_status))
        .with_state(monitor)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind the status server and serve it in a background task.
///
/// Returns the bound address (useful when binding port 0).
pub async fn spawn_status_server(
    bind_addr: SocketAddr,
    monitor: MonitorHandle,
) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("status server listening on {addr}");

    let app = router(monitor);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("status server error: {e}");
        }
    });

    Ok(addr)
}
