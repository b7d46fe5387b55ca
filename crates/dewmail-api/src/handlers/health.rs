//! Health check handlers for service monitoring.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{debug, instrument};

use crate::server::AppState;

/// Liveness check endpoint.
///
/// Returns a minimal response showing the process is alive; it does not
/// touch the sink, the datastore, or the SPF API.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("performing health check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": chrono::DateTime::<chrono::Utc>::from(state.clock.now_system()),
        "service": "dewmail",
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, Json(response))
}
