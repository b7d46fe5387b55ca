//! Core domain types for the Dewmail relay.
//!
//! Provides the message model, sender redaction, recipient routing, and
//! clock abstraction shared by the SMTP front end, the relay dispatcher,
//! and the demo web surface. All other crates depend on these foundational
//! types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod message;
pub mod redact;
pub mod route;
pub mod time;

pub use error::{CoreError, Result};
pub use message::{Message, SPF_NONE, SPF_PASS, SPF_TEMP_ERROR};
pub use redact::redact_sender;
pub use route::{domain_accepted, RecipientRoute, RouteConfig};
pub use time::{format_rfc3339, Clock, RealClock, TestClock};
