//! Recipient routing.
//!
//! The recipient address decides where a message is posted: mail to
//! `foo+add@example.com` routes to `http://example.com/foo/add`. The
//! mailbox maps to a URL path with every `+` becoming a `/`, and the
//! domain becomes the target host.

use crate::error::{CoreError, Result};

/// Scheme and path prefix applied when deriving a target URL.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Use `https` for the derived URL instead of `http`.
    pub to_https: bool,
    /// Path prefix for derived URLs, with leading and trailing slashes.
    pub api_route: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self { to_https: false, api_route: "/".to_string() }
    }
}

/// A recipient address split into its routing parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRoute {
    mailbox: String,
    domain: String,
}

impl RecipientRoute {
    /// Splits a recipient address into mailbox and domain.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRecipient` when the address has no `@`
    /// or an empty mailbox or domain.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim().to_ascii_lowercase();
        let (mailbox, domain) = address
            .split_once('@')
            .ok_or_else(|| CoreError::InvalidRecipient { address: address.clone() })?;

        if mailbox.is_empty() || domain.is_empty() {
            return Err(CoreError::InvalidRecipient { address: address.clone() });
        }

        Ok(Self { mailbox: mailbox.to_string(), domain: domain.to_string() })
    }

    /// Returns the recipient domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the URL path derived from the mailbox under the configured
    /// route prefix. Every `+` in the mailbox becomes a path separator.
    pub fn path(&self, config: &RouteConfig) -> String {
        format!("{}{}", config.api_route, self.mailbox.replace('+', "/"))
    }

    /// Builds the full target URL this recipient routes to.
    pub fn target_url(&self, config: &RouteConfig) -> String {
        let scheme = if config.to_https { "https" } else { "http" };
        format!("{scheme}://{}{}", self.domain, self.path(config))
    }
}

/// Checks a recipient domain against the allowlist by suffix match.
///
/// An empty allowlist accepts nothing; callers skip the check entirely
/// when domain checking is disabled.
///
/// # Errors
///
/// Returns `CoreError::DomainNotAccepted` when no allowed suffix matches.
pub fn domain_accepted(allowed: &[String], domain: &str) -> Result<()> {
    if allowed.iter().any(|suffix| domain.ends_with(suffix.as_str())) {
        Ok(())
    } else {
        Err(CoreError::DomainNotAccepted { domain: domain.to_string() })
    }
}
