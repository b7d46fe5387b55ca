//! Property-based tests for redaction and routing invariants.

use dewmail_core::{redact_sender, RecipientRoute, RouteConfig};
use proptest::prelude::*;

proptest! {
    /// Redaction never leaks more than the first character of the local
    /// part: the output is always `first char + ***** + @domain`.
    #[test]
    fn redaction_is_fixed_width(
        local in "[a-z][a-z0-9.+-]{0,30}",
        domain in "[a-z][a-z0-9.-]{0,20}",
    ) {
        let address = format!("{local}@{domain}");
        let redacted = redact_sender(&address);

        let first = local.chars().next().unwrap();
        prop_assert_eq!(redacted, format!("{first}*****@{domain}"));
    }

    /// Redacted output length depends only on the domain, never on the
    /// original local part.
    #[test]
    fn redaction_hides_local_part_length(
        a in "[a-z]{1,5}",
        b in "[a-z]{20,40}",
        domain in "[a-z]{1,10}\\.[a-z]{2,4}",
    ) {
        let short = redact_sender(&format!("{a}@{domain}"));
        let long = redact_sender(&format!("{b}@{domain}"));
        prop_assert_eq!(short.len(), long.len());
    }

    /// Values with no `@` pass through untouched.
    #[test]
    fn no_at_sign_passes_through(value in "[a-z0-9 .+-]{0,40}") {
        prop_assert_eq!(redact_sender(&value), value);
    }

    /// Redaction is idempotent: masking a masked address yields the same
    /// masked address.
    #[test]
    fn redaction_is_idempotent(
        local in "[a-z][a-z0-9.+-]{0,30}",
        domain in "[a-z][a-z0-9.-]{0,20}",
    ) {
        let once = redact_sender(&format!("{local}@{domain}"));
        let twice = redact_sender(&once);
        prop_assert_eq!(once, twice);
    }

    /// Every parseable recipient produces a URL of the shape
    /// `scheme://domain/path` with `+` mapped to `/`.
    #[test]
    fn routing_maps_plus_to_path(
        segments in prop::collection::vec("[a-z][a-z0-9]{0,8}", 1..4),
        domain in "[a-z][a-z0-9]{0,10}\\.[a-z]{2,4}",
    ) {
        let mailbox = segments.join("+");
        let address = format!("{mailbox}@{domain}");

        let route = RecipientRoute::parse(&address).unwrap();
        let url = route.target_url(&RouteConfig::default());

        prop_assert_eq!(url, format!("http://{}/{}", domain, segments.join("/")));
    }

    /// Parsing never panics on arbitrary input.
    #[test]
    fn recipient_parse_never_panics(address in "\\PC{0,60}") {
        let _ = RecipientRoute::parse(&address);
    }
}
