//! Sender address redaction.
//!
//! Before a message leaves for a third-party sink, the sender's local part
//! is masked down to its first character plus five literal asterisks:
//! `alice@example.com` becomes `a*****@example.com`. The mask is fixed
//! width regardless of the real local-part length, so the redacted form
//! leaks neither the characters nor the length of the original mailbox.

/// Redacts the local part of an email address.
///
/// Keeps the first character, replaces everything up to the last `@` with
/// exactly five asterisks, and leaves the domain intact. Values without an
/// `@` (or with nothing before it) are returned unchanged; callers treat
/// such values as opaque and forward them as-is.
///
/// Only the first line of the value is scanned, so an `@` after an
/// embedded newline never triggers masking.
///
/// # Example
///
/// ```
/// use dewmail_core::redact_sender;
///
/// assert_eq!(redact_sender("alice@example.com"), "a*****@example.com");
/// assert_eq!(redact_sender("not-an-address"), "not-an-address");
/// ```
pub fn redact_sender(from: &str) -> String {
    let line_end = from.find('\n').unwrap_or(from.len());
    let Some(at) = from[..line_end].rfind('@') else {
        return from.to_string();
    };
    if at == 0 {
        return from.to_string();
    }

    let first_len = from.chars().next().map_or(0, char::len_utf8);
    format!("{}*****{}", &from[..first_len], &from[at..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_local_part_to_fixed_width() {
        assert_eq!(redact_sender("alice@example.com"), "a*****@example.com");
        assert_eq!(redact_sender("bob.smith+tag@mail.example.org"), "b*****@mail.example.org");
    }

    #[test]
    fn single_character_local_part_still_masked() {
        // Fixed-width replacement, not proportional
        assert_eq!(redact_sender("a@x.com"), "a*****@x.com");
        assert_eq!(redact_sender("ab@x.com"), "a*****@x.com");
    }

    #[test]
    fn values_without_at_pass_through() {
        assert_eq!(redact_sender("not-an-email"), "not-an-email");
        assert_eq!(redact_sender(""), "");
    }

    #[test]
    fn leading_at_passes_through() {
        // Nothing before the separator to keep, so no match
        assert_eq!(redact_sender("@x.com"), "@x.com");
    }

    #[test]
    fn masks_up_to_the_last_at() {
        assert_eq!(redact_sender("a@b@c.com"), "a*****@c.com");
    }

    #[test]
    fn at_after_newline_does_not_match() {
        assert_eq!(redact_sender("junk\nalice@example.com"), "junk\nalice@example.com");
    }

    #[test]
    fn multibyte_first_character_kept_whole() {
        assert_eq!(redact_sender("émile@example.fr"), "é*****@example.fr");
    }

    #[test]
    fn redacted_form_snapshot() {
        insta::assert_snapshot!(
            redact_sender("stephen.parker@withaspark.com"),
            @"s*****@withaspark.com"
        );
    }
}
