//! Dewmail HTTP demo surface.
//!
//! The public-facing half of the relay: the ingest endpoint that
//! redacts and forwards demo payloads, the viewer page showing the last
//! relayed message, and the service configuration loaded from file and
//! environment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use dispatch::RelayDispatch;
pub use server::{create_router, start_server, AppState};
