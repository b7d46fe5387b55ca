//! SMTP front end for the Dewmail relay.
//!
//! A minimal server-side SMTP implementation: the TCP listener, the
//! per-connection session state machine, and the mail parsing that turns
//! raw message text into the relay's [`Message`](dewmail_core::Message)
//! model. Accepted mail is handed to a [`Dispatch`] implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mime;
pub mod server;
pub mod session;

pub use mime::{parse_mail, ParsedMail};
pub use server::{Dispatch, SmtpConfig, SmtpServer};
pub use session::Session;
