//! Optional SPF verification through an external API.
//!
//! The verifier posts the sender address and raw `Received` header to a
//! configured SPF service and records the result on the message. The
//! lookup never fails the caller directly: an unreachable or unparseable
//! verifier yields `TempError`, and policy enforcement happens later.

use dewmail_core::message::SPF_TEMP_ERROR;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::JsonClient;

/// SPF verifier configuration.
#[derive(Debug, Clone)]
pub struct SpfConfig {
    /// URL of the SPF verification API.
    pub api_url: String,
    /// API key sent with every lookup.
    pub api_key: String,
}

/// Result of one SPF lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpfOutcome {
    /// Verifier result (`Pass`, `Fail`, `SoftFail`, `TempError`, ...).
    pub result: String,
    /// Sender IP reported by the verifier, empty when unknown.
    pub sender_ip: String,
}

impl SpfOutcome {
    fn temp_error() -> Self {
        Self { result: SPF_TEMP_ERROR.to_string(), sender_ip: String::new() }
    }
}

#[derive(Debug, Deserialize)]
struct SpfApiResponse {
    result: String,
    #[serde(rename = "sender-IP", default)]
    sender_ip: String,
}

/// Client for the external SPF verification API.
#[derive(Debug, Clone)]
pub struct SpfVerifier {
    client: JsonClient,
    config: SpfConfig,
}

impl SpfVerifier {
    /// Creates a verifier over a shared client.
    pub fn new(client: JsonClient, config: SpfConfig) -> Self {
        Self { client, config }
    }

    /// Looks up the SPF result for a sender.
    ///
    /// Returns `TempError` when the API cannot be reached or its response
    /// cannot be parsed; the lookup itself never propagates an error.
    pub async fn verify(&self, email: &str, received: &str) -> SpfOutcome {
        let request = serde_json::json!({
            "apiKey": self.config.api_key,
            "email": email,
            "received": received,
        });

        let response = match self.client.post(&self.config.api_url, &request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "SPF API unreachable");
                return SpfOutcome::temp_error();
            },
        };

        match serde_json::from_str::<SpfApiResponse>(&response.body) {
            Ok(parsed) => {
                debug!(result = %parsed.result, sender_ip = %parsed.sender_ip, "SPF verified");
                SpfOutcome { result: parsed.result, sender_ip: parsed.sender_ip }
            },
            Err(e) => {
                warn!(error = %e, "SPF API response unparseable");
                SpfOutcome::temp_error()
            },
        }
    }
}
