//! Test infrastructure and utilities for deterministic testing.
//!
//! Provides a ready-made environment wiring the demo surface and the
//! SMTP relay to wiremock-backed sinks and targets, plus fixture
//! builders for ingest payloads and raw mail. Integration tests drive
//! real sockets against mocked external services.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use dewmail_api::{AppState, Config, RelayDispatch};
use dewmail_core::{Clock, TestClock};
use dewmail_relay::{JsonClient, RelayDispatcher};
use dewmail_smtp::SmtpServer;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

pub mod fixtures;

pub use fixtures::{MailBuilder, PayloadBuilder};

/// Test environment for integration tests.
///
/// Owns two mock servers and a scratch directory:
/// - `sink` stands in for the external service the demo surface
///   forwards redacted payloads to
/// - `target` stands in for a recipient-derived webhook target, and
///   doubles as the datastore when a test mounts those routes
/// - the temp directory holds the demo log file the viewer page reads
pub struct TestEnv {
    /// Mock for the demo surface's forwarding sink.
    pub sink: MockServer,
    /// Mock for relay targets derived from recipient addresses.
    pub target: MockServer,
    /// Deterministic clock injected into spawned servers.
    pub clock: TestClock,
    demo_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestEnv {
    /// Creates a fresh environment with both mock servers running.
    ///
    /// # Errors
    ///
    /// Fails when the scratch directory cannot be created.
    pub async fn new() -> Result<Self> {
        let sink = MockServer::start().await;
        let target = MockServer::start().await;
        let demo_dir = TempDir::new().context("create demo scratch directory")?;

        Ok(Self {
            sink,
            target,
            clock: TestClock::new(),
            demo_dir,
            shutdown: CancellationToken::new(),
        })
    }

    /// Path of the demo log file inside the scratch directory.
    ///
    /// The file does not exist until a test writes it.
    pub fn demo_log_path(&self) -> PathBuf {
        self.demo_dir.path().join("last.log")
    }

    /// Writes the demo log file the viewer page reads.
    ///
    /// # Errors
    ///
    /// Fails on filesystem errors in the scratch directory.
    pub async fn write_demo_log(&self, content: &str) -> Result<()> {
        tokio::fs::write(self.demo_log_path(), content).await.context("write demo log")
    }

    /// Service configuration pointing every outbound URL at the mocks.
    ///
    /// Ports are zero so spawned servers bind ephemerally; SPF and
    /// domain checking are off unless a test flips them.
    pub fn config(&self) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout: 5,
            sink_url: self.sink.uri(),
            demo_log_path: self.demo_log_path(),
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: 0,
            smtp_hostname: "test.dewmail.local".to_string(),
            domain_checking: false,
            valid_domains: Vec::new(),
            max_message_bytes: 10 * 1024 * 1024,
            shutdown_grace_seconds: 2,
            api_route: "/".to_string(),
            to_https: false,
            datastore_url: None,
            datastore_count_url: None,
            relay_timeout_seconds: 5,
            verify_tls: false,
            spf_check: false,
            spf_api_url: String::new(),
            spf_api_key: String::new(),
            require_spf_pass: false,
            rust_log: "warn".to_string(),
        }
    }

    /// Builds a recipient address that routes to the target mock.
    ///
    /// `mailbox` may contain `+` segments; they become path segments on
    /// the derived URL, so `hooks+orders` routes to `/hooks/orders`.
    pub fn target_recipient(&self, mailbox: &str) -> String {
        format!("{mailbox}@{}", self.target.address())
    }

    /// Spawns the demo HTTP surface on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Fails when the outbound client cannot be built or the listener
    /// cannot bind.
    pub async fn spawn_app(&self) -> Result<SocketAddr> {
        self.spawn_app_with_config(&self.config()).await
    }

    /// Spawns the demo HTTP surface with a caller-adjusted configuration.
    ///
    /// # Errors
    ///
    /// Fails when the outbound client cannot be built or the listener
    /// cannot bind.
    pub async fn spawn_app_with_config(&self, config: &Config) -> Result<SocketAddr> {
        let mut state = AppState::from_config(config)?;
        state.clock = Arc::new(self.clock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind demo surface listener")?;
        let addr = listener.local_addr().context("read demo surface address")?;

        let app = dewmail_api::create_router(state);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                tracing::error!("test app server failed: {}", e);
            }
        });

        Ok(addr)
    }

    /// Spawns the SMTP server wired through the relay to the mocks.
    ///
    /// Mail sent to [`target_recipient`](Self::target_recipient)
    /// addresses lands on the target mock as JSON.
    ///
    /// # Errors
    ///
    /// Fails when the outbound client cannot be built or the listener
    /// cannot bind.
    pub async fn spawn_smtp(&self, config: &Config) -> Result<SocketAddr> {
        let client = JsonClient::new(config.to_client_config())?;
        let dispatcher =
            RelayDispatcher::new(client, config.to_relay_config(), None, config.require_spf_pass);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind SMTP listener")?;
        let addr = listener.local_addr().context("read SMTP address")?;

        let server = SmtpServer::new(
            config.to_smtp_config(),
            Arc::new(RelayDispatch(dispatcher)),
            Arc::new(self.clock.clone()) as Arc<dyn Clock>,
            self.shutdown.clone(),
        );
        tokio::spawn(server.serve(listener));

        Ok(addr)
    }

    /// Stops every server this environment spawned.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
