//! Dewmail email-to-webhook relay service.
//!
//! Main entry point for the Dewmail server. Initializes the SMTP front
//! end and the HTTP demo surface and coordinates graceful startup and
//! shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use dewmail_api::{AppState, Config, RelayDispatch};
use dewmail_core::{Clock, RealClock};
use dewmail_relay::{JsonClient, RelayDispatcher, SpfVerifier};
use dewmail_smtp::SmtpServer;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting Dewmail relay service");

    let config = Config::load()?;
    info!(
        http_addr = %format!("{}:{}", config.host, config.port),
        smtp_addr = %format!("{}:{}", config.smtp_host, config.smtp_port),
        spf_check = config.spf_check,
        spf_api_key = %config.spf_api_key_masked(),
        domain_checking = config.domain_checking,
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let clock: Arc<dyn Clock> = Arc::new(RealClock::new());

    // SMTP front end wired through the relay dispatcher
    let client = JsonClient::new(config.to_client_config())?;
    let spf = config.to_spf_config().map(|spf_config| SpfVerifier::new(client.clone(), spf_config));
    let dispatcher =
        RelayDispatcher::new(client, config.to_relay_config(), spf, config.require_spf_pass);

    let smtp_addr = config.parse_smtp_addr()?;
    let smtp_listener = tokio::net::TcpListener::bind(smtp_addr)
        .await
        .with_context(|| format!("failed to bind SMTP listener on {smtp_addr}"))?;
    let smtp_server = SmtpServer::new(
        config.to_smtp_config(),
        Arc::new(RelayDispatch(dispatcher)),
        clock.clone(),
        shutdown.clone(),
    );
    let smtp_handle = tokio::spawn(async move {
        if let Err(e) = smtp_server.serve(smtp_listener).await {
            error!(error = %e, "SMTP server failed");
        }
    });

    // HTTP demo surface
    let mut state = AppState::from_config(&config)?;
    state.clock = clock;
    let http_addr = config.parse_server_addr()?;
    let http_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = dewmail_api::start_server(state, http_addr, shutdown).await {
                error!(error = %e, "HTTP server failed");
            }
        }
    });

    info!("Dewmail is ready to receive mail");

    shutdown_signal().await;
    info!("Shutdown signal received, starting graceful shutdown");
    shutdown.cancel();

    let grace = Duration::from_secs(config.shutdown_grace_seconds.saturating_add(5));
    tokio::select! {
        _ = tokio::time::sleep(grace) => {
            info!("Shutdown grace period expired");
        },
        _ = async { let _ = tokio::join!(smtp_handle, http_handle); } => {
            info!("Servers stopped");
        },
    }

    info!("Dewmail shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,dewmail=debug,tower_http=debug"))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C signal");
        },
        () = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
