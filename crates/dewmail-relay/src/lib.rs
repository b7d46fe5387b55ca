//! Outbound dispatch for the Dewmail relay.
//!
//! Once a message has been parsed from inbound mail, this crate forwards
//! it: a shared JSON HTTP client, the relay action that posts the message
//! to its address-derived endpoint (plus optional datastore bookkeeping),
//! and the optional SPF verification step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod client;
pub mod error;
pub mod spf;

pub use action::{RelayAction, RelayConfig, RelayDispatcher};
pub use client::{ClientConfig, JsonClient, JsonResponse};
pub use error::{RelayError, Result};
pub use spf::{SpfConfig, SpfOutcome, SpfVerifier};
