//! Relay dispatch: forwarding parsed mail to its web endpoint.
//!
//! Every message is posted to the URL derived from its recipient address
//! (mail to `foo+add@example.com` posts to `http://example.com/foo/add`).
//! Forwarding is best-effort: the outcome is logged, never propagated.
//! When a datastore is configured the same JSON is pushed there and a
//! mails-sent counter is read, incremented, and patched back.

use dewmail_core::{CoreError, Message, RecipientRoute, RouteConfig, SPF_PASS};
use tracing::{debug, info, instrument, warn};

use crate::{
    client::JsonClient,
    error::{RelayError, Result},
    spf::SpfVerifier,
};

/// Dispatch targets beyond the per-domain endpoint.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Scheme and path prefix for derived target URLs.
    pub route: RouteConfig,
    /// Datastore receiving a copy of every forwarded message, when set.
    pub datastore_url: Option<String>,
    /// Mails-sent counter resource in the datastore, when set.
    pub datastore_count_url: Option<String>,
}

/// A message bound for its address-derived endpoint.
///
/// The target URL and serialized body are fixed at construction so the
/// dispatch itself cannot fail on routing.
#[derive(Debug, Clone)]
pub struct RelayAction {
    url: String,
    body: serde_json::Value,
}

impl RelayAction {
    /// Builds the action for a parsed message.
    ///
    /// # Errors
    ///
    /// Returns an error when the recipient address cannot be routed or
    /// the message does not serialize.
    pub fn new(message: &Message, config: &RelayConfig) -> Result<Self> {
        let route = RecipientRoute::parse(&message.to)?;
        let url = route.target_url(&config.route);
        let body = serde_json::to_value(message)
            .map_err(|e| RelayError::configuration(format!("failed to encode message: {e}")))?;

        Ok(Self { url, body })
    }

    /// Returns the derived target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs the dispatch: forward, datastore push, counter increment.
    ///
    /// The forward and both datastore writes are fire-and-forget; only
    /// the counter read can fail the dispatch, matching the contract that
    /// a lost counter is an operational error while a lost copy is not.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::CounterUnavailable` when the counter cannot
    /// be fetched or parsed.
    #[instrument(name = "relay_dispatch", skip(self, client, config), fields(url = %self.url))]
    pub async fn run(&self, client: &JsonClient, config: &RelayConfig) -> Result<()> {
        match client.post(&self.url, &self.body).await {
            Ok(response) => {
                info!(status = response.status_code, "message forwarded");
            },
            Err(e) => {
                warn!(error = %e, "message forward failed");
            },
        }

        if let Some(datastore_url) = &config.datastore_url {
            if let Err(e) = client.post(datastore_url, &self.body).await {
                warn!(error = %e, "datastore push failed");
            }

            if let Some(count_url) = &config.datastore_count_url {
                self.increment_counter(client, count_url).await?;
            }
        }

        Ok(())
    }

    /// Reads the mails-sent counter, increments it, and patches it back.
    async fn increment_counter(&self, client: &JsonClient, count_url: &str) -> Result<()> {
        let response =
            client.get(count_url).await.map_err(|e| RelayError::counter(e.to_string()))?;

        let counter: MailCounter = serde_json::from_str(&response.body)
            .map_err(|e| RelayError::counter(format!("failed to parse counter: {e}")))?;

        let updated = serde_json::json!({ "count": counter.count + 1 });
        if let Err(e) = client.patch(count_url, &updated).await {
            warn!(error = %e, "counter update failed");
        } else {
            debug!(count = counter.count + 1, "counter updated");
        }

        Ok(())
    }
}

#[derive(Debug, serde::Deserialize)]
struct MailCounter {
    count: u64,
}

/// Complete dispatch pipeline for one parsed message.
///
/// Runs optional SPF verification, enforces the pass requirement when
/// configured, then builds and runs the relay action.
#[derive(Debug, Clone)]
pub struct RelayDispatcher {
    client: JsonClient,
    config: RelayConfig,
    spf: Option<SpfVerifier>,
    require_spf_pass: bool,
}

impl RelayDispatcher {
    /// Creates a dispatcher over a shared client.
    pub fn new(
        client: JsonClient,
        config: RelayConfig,
        spf: Option<SpfVerifier>,
        require_spf_pass: bool,
    ) -> Self {
        Self { client, config, spf, require_spf_pass }
    }

    /// Verifies and dispatches one message.
    ///
    /// `received` is the raw `Received` header handed to the SPF verifier;
    /// it is unused when verification is disabled.
    ///
    /// # Errors
    ///
    /// Fails when SPF is required but not passed, when the recipient
    /// cannot be routed, or when the datastore counter is unavailable.
    #[instrument(name = "dispatch", skip(self, message, received), fields(from = %message.from, to = %message.to))]
    pub async fn dispatch(&self, mut message: Message, received: &str) -> Result<()> {
        if let Some(spf) = &self.spf {
            let outcome = spf.verify(&message.from, received).await;
            message.spf = outcome.result;
            message.sender_ip = outcome.sender_ip;
        }

        if self.require_spf_pass && message.spf != SPF_PASS {
            return Err(CoreError::SpfRejected {
                sender: message.from.clone(),
                result: message.spf.clone(),
            }
            .into());
        }

        let action = RelayAction::new(&message, &self.config)?;
        action.run(&self.client, &self.config).await
    }
}
