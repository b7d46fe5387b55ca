#![no_main]

//! Fuzz target for recipient address routing.
//!
//! Routing runs on attacker-controlled RCPT arguments, so parsing and
//! URL derivation must hold up against arbitrary strings.

use dewmail_core::{redact_sender, RecipientRoute, RouteConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(address) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(route) = RecipientRoute::parse(address) {
        let config = RouteConfig::default();
        let url = route.target_url(&config);
        assert!(url.starts_with("http://"));

        let https = RouteConfig { to_https: true, api_route: "/api/".to_string() };
        let _ = route.target_url(&https);
    }

    // Redaction shares the address-shaped input space
    let _ = redact_sender(address);
});
