//! Demo ingest relay handler.
//!
//! Accepts an email-derived JSON payload, redacts the sender, and
//! forwards the result to the configured sink. The response shape is
//! fixed: `{"status":"good","response":0}` or the same with `"error"`.
//! The forward is fire-and-forget; its outcome never reaches the caller.

use axum::{body::Bytes, extract::State, Json};
use dewmail_core::redact_sender;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::server::AppState;

/// The demo relay's fixed two-field response.
///
/// `response` is a placeholder literal `0` in both paths, kept for wire
/// compatibility with existing consumers.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RelayStatus {
    /// `"good"` when the payload was accepted, `"error"` otherwise.
    pub status: &'static str,
    /// Always `0`.
    pub response: u8,
}

impl RelayStatus {
    /// Payload accepted and queued for forwarding.
    pub const fn good() -> Self {
        Self { status: "good", response: 0 }
    }

    /// Payload rejected; nothing was forwarded.
    pub const fn error() -> Self {
        Self { status: "error", response: 0 }
    }
}

/// Ingests one email-derived payload.
///
/// Unparseable JSON and a missing or null `from` field share the single
/// rejection path; every rejection skips the outbound call entirely.
/// HTTP status is 200 for both shapes: the body's `status` field is the
/// contract.
#[instrument(name = "demo_ingest", skip(state, body), fields(payload_size = body.len()))]
pub async fn ingest_payload(State(state): State<AppState>, body: Bytes) -> Json<RelayStatus> {
    let Some(mut payload) = accept_payload(&body) else {
        debug!("payload rejected");
        return Json(RelayStatus::error());
    };

    redact_from(&mut payload);
    info!("payload accepted, forwarding to sink");

    // Fire-and-forget: the sink's answer is logged, never reported
    let client = state.client.clone();
    let sink_url = state.sink_url.clone();
    tokio::spawn(async move {
        match client.post(&sink_url, &payload).await {
            Ok(response) => debug!(status = response.status_code, "sink accepted payload"),
            Err(e) => warn!(error = %e, "sink forward failed"),
        }
    });

    Json(RelayStatus::good())
}

/// Parses the body and requires a non-null `from` field.
fn accept_payload(body: &[u8]) -> Option<Value> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    let from = payload.get("from")?;
    if from.is_null() {
        return None;
    }
    Some(payload)
}

/// Redacts a string `from` value in place. Non-string values count as
/// present but carry nothing redactable and pass through unchanged.
fn redact_from(payload: &mut Value) {
    if let Some(from) = payload.get_mut("from") {
        if let Value::String(address) = from {
            *from = Value::String(redact_sender(address));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejects_missing_and_null_from() {
        assert!(accept_payload(br#"{"subject": "hi"}"#).is_none());
        assert!(accept_payload(br#"{"from": null}"#).is_none());
    }

    #[test]
    fn rejects_unparseable_json() {
        assert!(accept_payload(b"not json at all").is_none());
        assert!(accept_payload(b"").is_none());
    }

    #[test]
    fn accepts_non_string_from() {
        // Present-but-not-a-string counts as present
        assert!(accept_payload(br#"{"from": 42}"#).is_some());
        assert!(accept_payload(br#"{"from": false}"#).is_some());
    }

    #[test]
    fn redacts_string_from_in_place() {
        let mut payload = json!({"from": "alice@example.com", "subject": "hi"});
        redact_from(&mut payload);

        assert_eq!(payload["from"], "a*****@example.com");
        assert_eq!(payload["subject"], "hi");
    }

    #[test]
    fn from_without_at_passes_through() {
        let mut payload = json!({"from": "not-an-address"});
        redact_from(&mut payload);

        assert_eq!(payload["from"], "not-an-address");
    }

    #[test]
    fn non_string_from_left_untouched() {
        let mut payload = json!({"from": 42});
        redact_from(&mut payload);

        assert_eq!(payload["from"], 42);
    }

    #[test]
    fn response_shapes_serialize_exactly() {
        let good = serde_json::to_value(RelayStatus::good()).unwrap();
        assert_eq!(good, json!({"status": "good", "response": 0}));

        let error = serde_json::to_value(RelayStatus::error()).unwrap();
        assert_eq!(error, json!({"status": "error", "response": 0}));
    }
}
