//! SMTP listener with supervised per-connection tasks.
//!
//! Accepts connections until the cancellation token fires, then stops
//! accepting and gives in-flight sessions a grace period to finish.

use std::{future::Future, sync::Arc, time::Duration};

use dewmail_core::Clock;
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{mime::ParsedMail, session::Session};

/// Seam between the SMTP front end and the relay behind it.
///
/// The session calls this once per completed DATA block; an error fails
/// the transaction and the client sees 554.
pub trait Dispatch: Send + Sync + 'static {
    /// Handles one parsed inbound mail.
    fn dispatch(&self, mail: ParsedMail) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// SMTP server configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Hostname announced in the greeting banner.
    pub hostname: String,
    /// Whether RCPT addresses are checked against the allowlist.
    pub domain_checking: bool,
    /// Domain suffixes mail is accepted for when checking is on.
    pub valid_domains: Vec<String>,
    /// Largest DATA block accepted before the transaction is refused.
    pub max_message_bytes: usize,
    /// How long in-flight sessions may run after shutdown is requested.
    pub shutdown_grace: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            domain_checking: false,
            valid_domains: Vec::new(),
            max_message_bytes: 10 * 1024 * 1024,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// SMTP front end: one supervised tokio task per connection.
pub struct SmtpServer<D> {
    config: Arc<SmtpConfig>,
    dispatcher: Arc<D>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl<D: Dispatch> SmtpServer<D> {
    /// Creates a server wired to a dispatcher and shutdown token.
    pub fn new(
        config: SmtpConfig,
        dispatcher: Arc<D>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { config: Arc::new(config), dispatcher, clock, shutdown }
    }

    /// Serves connections from the listener until shutdown.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the listener's local address cannot be
    /// read; individual accept and session errors are logged, not
    /// propagated.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "SMTP server listening");

        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("SMTP shutdown requested, no longer accepting connections");
                    break;
                },
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let session = Session::new(
                                self.config.clone(),
                                self.dispatcher.clone(),
                                self.clock.clone(),
                            );
                            let span = info_span!("smtp_session", %peer);
                            sessions.spawn(
                                async move {
                                    if let Err(e) = session.run(stream).await {
                                        warn!("session ended with error: {}", e);
                                    }
                                }
                                .instrument(span),
                            );
                        },
                        Err(e) => {
                            error!("failed to accept connection: {}", e);
                        },
                    }
                },
            }

            // Reap finished sessions so the set does not grow unbounded
            while sessions.try_join_next().is_some() {}
        }

        self.drain_sessions(sessions).await;
        info!("SMTP server stopped");
        Ok(())
    }

    /// Waits for in-flight sessions, aborting stragglers after the grace
    /// period.
    async fn drain_sessions(&self, mut sessions: JoinSet<()>) {
        let in_flight = sessions.len();
        if in_flight == 0 {
            return;
        }

        info!(
            in_flight,
            grace_seconds = self.config.shutdown_grace.as_secs(),
            "waiting for in-flight SMTP sessions"
        );

        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(remaining = sessions.len(), "shutdown grace expired, aborting sessions");
            sessions.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use dewmail_core::TestClock;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;

    #[derive(Clone, Default)]
    struct CountingDispatch {
        mails: Arc<Mutex<Vec<ParsedMail>>>,
    }

    impl Dispatch for CountingDispatch {
        fn dispatch(&self, mail: ParsedMail) -> impl Future<Output = anyhow::Result<()>> + Send {
            let mails = self.mails.clone();
            async move {
                mails.lock().unwrap().push(mail);
                Ok(())
            }
        }
    }

    async fn start_server(dispatcher: Arc<CountingDispatch>) -> (std::net::SocketAddr, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = CancellationToken::new();
        let server = SmtpServer::new(
            SmtpConfig::default(),
            dispatcher,
            Arc::new(TestClock::new()) as Arc<dyn Clock>,
            shutdown.clone(),
        );
        tokio::spawn(server.serve(listener));

        (addr, shutdown)
    }

    async fn send_mail(addr: std::net::SocketAddr, from: &str, to: &str, body: &str) {
        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        let script = [
            "HELO test.client".to_string(),
            format!("MAIL FROM:<{from}>"),
            format!("RCPT TO:<{to}>"),
            "DATA".to_string(),
        ];

        reader.read_line(&mut line).await.unwrap(); // greeting
        for command in script {
            write_half.write_all(format!("{command}\r\n").as_bytes()).await.unwrap();
            line.clear();
            reader.read_line(&mut line).await.unwrap();
        }

        let payload = format!("Subject: test\r\n\r\n{body}\r\n.\r\nQUIT\r\n");
        write_half.write_all(payload.as_bytes()).await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.starts_with("250"), "unexpected reply: {line}");
    }

    #[tokio::test]
    async fn concurrent_connections_are_isolated() {
        let dispatcher = Arc::new(CountingDispatch::default());
        let (addr, shutdown) = start_server(dispatcher.clone()).await;

        let a = send_mail(addr, "a@one.example", "demo@example.com", "first");
        let b = send_mail(addr, "b@two.example", "demo@example.com", "second");
        tokio::join!(a, b);

        let mails = dispatcher.mails.lock().unwrap();
        assert_eq!(mails.len(), 2);

        let mut senders: Vec<_> = mails.iter().map(|m| m.message.from.clone()).collect();
        senders.sort();
        assert_eq!(senders, vec!["a@one.example", "b@two.example"]);

        shutdown.cancel();
    }

    #[tokio::test]
    async fn shutdown_stops_accepting() {
        let dispatcher = Arc::new(CountingDispatch::default());
        let (addr, shutdown) = start_server(dispatcher).await;

        shutdown.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Either refused outright or closed without a banner
        if let Ok(stream) = tokio::net::TcpStream::connect(addr).await {
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            let n = reader.read_line(&mut line).await.unwrap_or(0);
            assert_eq!(n, 0, "server still answering after shutdown: {line}");
        }
    }
}
