//! HTTP server configuration and request routing.
//!
//! Provides Axum server setup with middleware stack and graceful
//! shutdown for the demo surface. Requests flow through middleware in
//! order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server stops accepting new connections when the shared
//! cancellation token fires and then waits for in-flight requests.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use dewmail_core::{Clock, RealClock};
use dewmail_relay::JsonClient;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{config::Config, handlers};

/// Shared state for the demo surface handlers.
#[derive(Clone)]
pub struct AppState {
    /// External sink receiving redacted payloads.
    pub sink_url: String,
    /// File the viewer page reads the last message from.
    pub demo_log_path: PathBuf,
    /// Outbound HTTP client used for the sink forward.
    pub client: JsonClient,
    /// Clock used for health timestamps.
    pub clock: Arc<dyn Clock>,
    /// HTTP request timeout applied by the middleware stack.
    pub request_timeout: Duration,
}

impl AppState {
    /// Builds the demo surface state from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the outbound HTTP client cannot be
    /// constructed from the configured timeouts.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = JsonClient::new(config.to_client_config())?;
        Ok(Self {
            sink_url: config.sink_url.clone(),
            demo_log_path: config.demo_log_path.clone(),
            client,
            clock: Arc::new(RealClock::new()),
            request_timeout: Duration::from_secs(config.request_timeout),
        })
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// Sets up:
/// - `GET /` - demo viewer page
/// - `POST /api` - demo ingest relay
/// - `GET /health` - liveness probe
/// - Request tracing, request IDs, and timeout handling
pub fn create_router(state: AppState) -> Router {
    let timeout = state.request_timeout;

    Router::new()
        .route("/", get(handlers::viewer_page))
        .route("/api", post(handlers::ingest_payload))
        .route("/health", get(handlers::health_check))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server, serving until the shutdown token fires.
///
/// # Errors
///
/// Returns `std::io::Error` if the port is already in use or the
/// network interface is unavailable.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}
