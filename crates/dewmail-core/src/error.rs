//! Error types and result handling for relay operations.
//!
//! Defines the failure modes of inbound mail handling with their SMTP
//! reply codes, so the session layer can answer clients without matching
//! on error internals.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for message acceptance and routing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Recipient address could not be split into mailbox and domain.
    #[error("invalid recipient address: {address}")]
    InvalidRecipient {
        /// The address as received on the wire
        address: String,
    },

    /// Recipient domain is not on the configured allowlist.
    #[error("not accepting mail for domain: {domain}")]
    DomainNotAccepted {
        /// The rejected domain
        domain: String,
    },

    /// Multipart message carried no `text/plain` part.
    #[error("no text/plain formatting of message")]
    MissingTextPart,

    /// Sender failed the configured SPF requirement.
    #[error("SPF result {result} for sender {sender}")]
    SpfRejected {
        /// Envelope sender that failed verification
        sender: String,
        /// The SPF result reported by the verifier
        result: String,
    },

    /// Message could not be parsed as mail at all.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

impl CoreError {
    /// Returns the SMTP reply code this failure maps to.
    ///
    /// Recipient-time failures use 550 (mailbox unavailable); failures
    /// after DATA use 554 (transaction failed).
    pub const fn reply_code(&self) -> u16 {
        match self {
            Self::InvalidRecipient { .. } | Self::DomainNotAccepted { .. } => 550,
            Self::MissingTextPart | Self::SpfRejected { .. } | Self::MalformedMessage(_) => 554,
        }
    }
}
