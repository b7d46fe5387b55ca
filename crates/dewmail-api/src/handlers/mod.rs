//! HTTP request handlers for the Dewmail demo surface.
//!
//! Handlers are grouped by functionality:
//! - `ingest` - demo payload ingestion and sink forwarding
//! - `viewer` - the public demo page showing the last relayed message
//! - `health` - liveness probe

pub mod health;
pub mod ingest;
pub mod viewer;

pub use health::health_check;
pub use ingest::{ingest_payload, RelayStatus};
pub use viewer::viewer_page;
