//! Configuration management for the Dewmail relay service.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use dewmail_core::RouteConfig;
use dewmail_relay::{ClientConfig, RelayConfig, SpfConfig};
use dewmail_smtp::SmtpConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// The service runs out-of-the-box except for `sink_url`, which ships as
/// an empty placeholder the deployer must substitute before the demo
/// surface forwards anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // HTTP server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Demo surface
    /// External sink receiving redacted demo payloads.
    ///
    /// Environment variable: `SINK_URL`
    #[serde(default = "default_sink_url", alias = "SINK_URL")]
    pub sink_url: String,
    /// File the viewer page reads the last received message from.
    ///
    /// Environment variable: `DEMO_LOG_PATH`
    #[serde(default = "default_demo_log_path", alias = "DEMO_LOG_PATH")]
    pub demo_log_path: PathBuf,

    // SMTP server
    /// SMTP bind address.
    ///
    /// Environment variable: `SMTP_HOST`
    #[serde(default = "default_smtp_host", alias = "SMTP_HOST")]
    pub smtp_host: String,
    /// SMTP bind port. 2525 by default so unprivileged runs work;
    /// deployments override to 25.
    ///
    /// Environment variable: `SMTP_PORT`
    #[serde(default = "default_smtp_port", alias = "SMTP_PORT")]
    pub smtp_port: u16,
    /// Hostname announced in the SMTP greeting.
    ///
    /// Environment variable: `SMTP_HOSTNAME`
    #[serde(default = "default_smtp_hostname", alias = "SMTP_HOSTNAME")]
    pub smtp_hostname: String,
    /// Whether recipient domains are checked against `valid_domains`.
    ///
    /// Environment variable: `DOMAIN_CHECKING`
    #[serde(default, alias = "DOMAIN_CHECKING")]
    pub domain_checking: bool,
    /// Domain suffixes mail is accepted for when checking is on.
    #[serde(default)]
    pub valid_domains: Vec<String>,
    /// Largest message accepted over SMTP, in bytes.
    ///
    /// Environment variable: `MAX_MESSAGE_BYTES`
    #[serde(default = "default_max_message_bytes", alias = "MAX_MESSAGE_BYTES")]
    pub max_message_bytes: usize,
    /// Grace period for in-flight sessions at shutdown, in seconds.
    ///
    /// Environment variable: `SHUTDOWN_GRACE_SECONDS`
    #[serde(default = "default_shutdown_grace", alias = "SHUTDOWN_GRACE_SECONDS")]
    pub shutdown_grace_seconds: u64,

    // Relay dispatch
    /// Path prefix for derived target URLs, with leading and trailing
    /// slashes.
    ///
    /// Environment variable: `API_ROUTE`
    #[serde(default = "default_api_route", alias = "API_ROUTE")]
    pub api_route: String,
    /// Derive `https` target URLs instead of `http`.
    ///
    /// Environment variable: `TO_HTTPS`
    #[serde(default, alias = "TO_HTTPS")]
    pub to_https: bool,
    /// Datastore receiving a copy of every forwarded message.
    ///
    /// Environment variable: `DATASTORE_URL`
    #[serde(default, alias = "DATASTORE_URL")]
    pub datastore_url: Option<String>,
    /// Mails-sent counter resource in the datastore.
    ///
    /// Environment variable: `DATASTORE_COUNT_URL`
    #[serde(default, alias = "DATASTORE_COUNT_URL")]
    pub datastore_count_url: Option<String>,

    // Outbound client
    /// HTTP timeout for outbound relay calls in seconds.
    ///
    /// Environment variable: `RELAY_TIMEOUT_SECONDS`
    #[serde(default = "default_relay_timeout", alias = "RELAY_TIMEOUT_SECONDS")]
    pub relay_timeout_seconds: u64,
    /// Whether outbound TLS certificates are verified.
    ///
    /// Environment variable: `VERIFY_TLS`
    #[serde(default = "default_verify_tls", alias = "VERIFY_TLS")]
    pub verify_tls: bool,

    // SPF
    /// Whether senders are verified through the SPF API.
    ///
    /// Environment variable: `SPF_CHECK`
    #[serde(default, alias = "SPF_CHECK")]
    pub spf_check: bool,
    /// SPF verification API URL.
    ///
    /// Environment variable: `SPF_API_URL`
    #[serde(default, alias = "SPF_API_URL")]
    pub spf_api_url: String,
    /// API key for the SPF verification API.
    ///
    /// Environment variable: `SPF_API_KEY`
    #[serde(default, alias = "SPF_API_KEY")]
    pub spf_api_key: String,
    /// Reject messages whose SPF result is not `Pass`.
    ///
    /// Environment variable: `REQUIRE_SPF_PASS`
    #[serde(default, alias = "REQUIRE_SPF_PASS")]
    pub require_spf_pass: bool,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides.
    ///
    /// # Errors
    ///
    /// Fails when a source cannot be parsed or validation rejects the
    /// merged result.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to the outbound client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.relay_timeout_seconds),
            user_agent: "Dewmail/1.0".to_string(),
            max_redirects: 3,
            verify_tls: self.verify_tls,
        }
    }

    /// Convert to the relay dispatch configuration.
    pub fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            route: RouteConfig { to_https: self.to_https, api_route: self.api_route.clone() },
            datastore_url: self.datastore_url.clone(),
            datastore_count_url: self.datastore_count_url.clone(),
        }
    }

    /// Convert to the SMTP server configuration.
    pub fn to_smtp_config(&self) -> SmtpConfig {
        SmtpConfig {
            hostname: self.smtp_hostname.clone(),
            domain_checking: self.domain_checking,
            valid_domains: self.valid_domains.clone(),
            max_message_bytes: self.max_message_bytes,
            shutdown_grace: Duration::from_secs(self.shutdown_grace_seconds),
        }
    }

    /// Convert to the SPF verifier configuration, when enabled.
    pub fn to_spf_config(&self) -> Option<SpfConfig> {
        self.spf_check.then(|| SpfConfig {
            api_url: self.spf_api_url.clone(),
            api_key: self.spf_api_key.clone(),
        })
    }

    /// Parse the HTTP server socket address.
    ///
    /// # Errors
    ///
    /// Fails when host and port do not form a valid socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Parse the SMTP listener socket address.
    ///
    /// # Errors
    ///
    /// Fails when host and port do not form a valid socket address.
    pub fn parse_smtp_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.smtp_host, self.smtp_port);
        SocketAddr::from_str(&addr_str).context("Invalid SMTP address")
    }

    /// Get the SPF API key with all but the first character masked for
    /// logging.
    pub fn spf_api_key_masked(&self) -> String {
        let mut chars = self.spf_api_key.chars();
        match chars.next() {
            Some(first) => format!("{first}***"),
            None => String::new(),
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.smtp_port == 0 {
            anyhow::bail!("smtp_port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.relay_timeout_seconds == 0 {
            anyhow::bail!("relay_timeout_seconds must be greater than 0");
        }

        if !self.api_route.starts_with('/') || !self.api_route.ends_with('/') {
            anyhow::bail!("api_route must have leading and trailing slashes");
        }

        if self.max_message_bytes == 0 {
            anyhow::bail!("max_message_bytes must be greater than 0");
        }

        if self.domain_checking && self.valid_domains.is_empty() {
            anyhow::bail!("domain_checking requires at least one entry in valid_domains");
        }

        if self.spf_check && self.spf_api_url.is_empty() {
            anyhow::bail!("spf_check requires spf_api_url");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            sink_url: default_sink_url(),
            demo_log_path: default_demo_log_path(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_hostname: default_smtp_hostname(),
            domain_checking: false,
            valid_domains: Vec::new(),
            max_message_bytes: default_max_message_bytes(),
            shutdown_grace_seconds: default_shutdown_grace(),
            api_route: default_api_route(),
            to_https: false,
            datastore_url: None,
            datastore_count_url: None,
            relay_timeout_seconds: default_relay_timeout(),
            verify_tls: default_verify_tls(),
            spf_check: false,
            spf_api_url: String::new(),
            spf_api_key: String::new(),
            require_spf_pass: false,
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8111
}

fn default_request_timeout() -> u64 {
    30
}

fn default_sink_url() -> String {
    // Placeholder; the deployer substitutes their own sink
    String::new()
}

fn default_demo_log_path() -> PathBuf {
    PathBuf::from("temp/last.log")
}

fn default_smtp_host() -> String {
    "0.0.0.0".to_string()
}

fn default_smtp_port() -> u16 {
    2525
}

fn default_smtp_hostname() -> String {
    "localhost".to_string()
}

fn default_max_message_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_api_route() -> String {
    "/".to_string()
}

fn default_relay_timeout() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
