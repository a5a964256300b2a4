//! Liveness endpoint.

use axum::http::StatusCode;

/// Handle GET /heartbeat.
pub(crate) async fn heartbeat() -> StatusCode {
    tracing::debug!("Heartbeat");
    StatusCode::OK
}
