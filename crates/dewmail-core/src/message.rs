//! The relay's message model.
//!
//! A [`Message`] is the JSON document posted to the address-derived web
//! endpoint once an inbound mail has been parsed. Field names are part of
//! the wire contract and must not change.

use serde::{Deserialize, Serialize};

use crate::time::{format_rfc3339, Clock};

/// SPF result recorded when verification is disabled.
pub const SPF_NONE: &str = "None";

/// SPF result recorded when the verifier could not be reached or parsed.
pub const SPF_TEMP_ERROR: &str = "TempError";

/// SPF result required when strict verification is enabled.
pub const SPF_PASS: &str = "Pass";

/// A parsed inbound mail, ready for dispatch as JSON.
///
/// All fields serialize under their wire names; note the `sender-IP` rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Envelope sender address.
    pub from: String,
    /// Recipient address that routing is derived from.
    pub to: String,
    /// Subject header, empty when absent.
    pub subject: String,
    /// Flattened plain-text body.
    pub body: String,
    /// Receipt time, RFC 3339 UTC.
    pub time: String,
    /// SPF verification result (`None`, `Pass`, `Fail`, `TempError`, ...).
    pub spf: String,
    /// Sender IP as reported by the SPF verifier, empty when unknown.
    #[serde(rename = "sender-IP")]
    pub sender_ip: String,
}

impl Message {
    /// Creates a message for the given envelope sender, timestamped from
    /// the clock. Remaining fields are filled in during parsing.
    pub fn received_from(from: impl Into<String>, clock: &dyn Clock) -> Self {
        Self { from: from.into(), time: format_rfc3339(clock.now_system()), ..Self::default() }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            subject: String::new(),
            body: String::new(),
            time: String::new(),
            spf: SPF_NONE.to_string(),
            sender_ip: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;
    use crate::time::TestClock;

    #[test]
    fn serializes_under_wire_field_names() {
        let message = Message {
            from: "alice@example.com".into(),
            to: "foo+add@demo.dewmail.io".into(),
            subject: "hi".into(),
            body: "hello there".into(),
            time: "2014-05-13T16:53:20Z".into(),
            spf: "Pass".into(),
            sender_ip: "192.0.2.7".into(),
        };

        let json = serde_json::to_value(&message).unwrap();
        let object = json.as_object().unwrap();

        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["from", "to", "subject", "body", "time", "spf", "sender-IP"]);
        assert_eq!(json["sender-IP"], "192.0.2.7");
    }

    #[test]
    fn received_from_stamps_clock_time() {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(1_400_000_000));
        let message = Message::received_from("alice@example.com", &clock);

        assert_eq!(message.from, "alice@example.com");
        assert_eq!(message.time, "2014-05-13T16:53:20Z");
        assert_eq!(message.spf, SPF_NONE);
        assert!(message.to.is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let message = Message {
            from: "a@b.com".into(),
            sender_ip: "198.51.100.4".into(),
            ..Message::default()
        };

        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }
}
