//! RFC 822 / multipart parsing for inbound mail.
//!
//! Extracts the headers and plain-text body the relay cares about from
//! raw message text. The header section ends at the first blank line,
//! continuation lines are unfolded, and the first value wins when a
//! header repeats. Multipart bodies are reduced to their first
//! `text/plain` part; everything else is rejected.

use dewmail_core::{Clock, CoreError, Message, Result};

/// A parsed inbound mail, ready for dispatch.
#[derive(Debug, Clone)]
pub struct ParsedMail {
    /// The message as it will be posted downstream.
    pub message: Message,
    /// Raw `Received` header, handed to SPF verification.
    pub received: String,
}

/// Parses raw message text into a [`ParsedMail`].
///
/// `from` is the envelope sender and `envelope_to` the accepted RCPT
/// address; a `To` header overrides the envelope recipient when present.
/// The receipt time is stamped from the clock.
///
/// # Errors
///
/// Returns `CoreError::MissingTextPart` for a multipart message with no
/// `text/plain` part.
pub fn parse_mail(
    from: &str,
    envelope_to: &str,
    raw: &str,
    clock: &dyn Clock,
) -> Result<ParsedMail> {
    let (headers, body) = split_message(raw);

    let mut message = Message::received_from(from, clock);
    message.to = headers.first("To").unwrap_or(envelope_to).to_string();
    message.subject = headers.first("Subject").unwrap_or_default().to_string();

    let content_type = headers.first("Content-Type").unwrap_or_default();
    let text = extract_text(content_type, body)?;
    message.body = flatten(&text);

    let received = headers.first("Received").unwrap_or_default().to_string();

    Ok(ParsedMail { message, received })
}

/// Unfolded message headers with first-value-wins lookup.
#[derive(Debug, Default)]
struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Returns the first value recorded for a header, case-insensitive.
    fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Splits raw text into its header section and body.
///
/// The header section ends at the first blank line. Continuation lines
/// (leading space or tab) are unfolded onto the preceding value.
fn split_message(raw: &str) -> (Headers, &str) {
    let mut headers = Headers::default();
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if trimmed.is_empty() {
            offset += line.len();
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.entries.last_mut() {
                value.push(' ');
                value.push_str(trimmed.trim_start());
            }
        } else if let Some((name, value)) = trimmed.split_once(':') {
            headers.entries.push((name.trim().to_string(), value.trim().to_string()));
        }

        offset += line.len();
    }

    (headers, &raw[offset.min(raw.len())..])
}

/// Reduces a body to plain text per its Content-Type.
fn extract_text(content_type: &str, body: &str) -> Result<String> {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();

    if !media_type.to_ascii_lowercase().starts_with("multipart") {
        return Ok(body.to_string());
    }

    let Some(boundary) = boundary_param(content_type) else {
        return Err(CoreError::MalformedMessage("multipart message without boundary".into()));
    };

    first_text_plain_part(body, &boundary).ok_or(CoreError::MissingTextPart)
}

/// Extracts the `boundary` parameter from a Content-Type value.
fn boundary_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("boundary") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Walks multipart parts and returns the body of the first `text/plain`
/// one. The preamble before the first delimiter and the `--` epilogue are
/// skipped.
fn first_text_plain_part(body: &str, boundary: &str) -> Option<String> {
    let delimiter = format!("--{boundary}");

    for part in body.split(delimiter.as_str()).skip(1) {
        if part.starts_with("--") {
            break;
        }

        let part = part.trim_start_matches(['\r', '\n']);
        let (part_headers, part_body) = split_message(part);

        let part_type = part_headers.first("Content-Type").unwrap_or_default();
        if part_type.contains("text/plain") {
            return Some(part_body.to_string());
        }
    }

    None
}

/// Trims the text and collapses line breaks into single spaces, the
/// one-line form the wire format carries.
fn flatten(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use dewmail_core::TestClock;

    use super::*;

    const CRLF: &str = "\r\n";

    fn parse(raw: &str) -> ParsedMail {
        parse_mail("alice@example.com", "demo+add@example.com", raw, &TestClock::new()).unwrap()
    }

    #[test]
    fn plain_message_parsed_whole() {
        let raw = [
            "Received: from mail.example.com (203.0.113.5)",
            "To: demo+add@example.com",
            "Subject: test subject",
            "Content-Type: text/plain; charset=utf-8",
            "",
            "Hello from the relay.",
            "Second line.",
        ]
        .join(CRLF);

        let mail = parse(&raw);

        assert_eq!(mail.message.from, "alice@example.com");
        assert_eq!(mail.message.to, "demo+add@example.com");
        assert_eq!(mail.message.subject, "test subject");
        assert_eq!(mail.message.body, "Hello from the relay. Second line.");
        assert_eq!(mail.received, "from mail.example.com (203.0.113.5)");
    }

    #[test]
    fn to_header_overrides_envelope_recipient() {
        let raw = ["To: other@example.org", "", "body"].join(CRLF);
        assert_eq!(parse(&raw).message.to, "other@example.org");
    }

    #[test]
    fn missing_to_header_falls_back_to_envelope() {
        let raw = ["Subject: no to header", "", "body"].join(CRLF);
        assert_eq!(parse(&raw).message.to, "demo+add@example.com");
    }

    #[test]
    fn continuation_lines_unfolded() {
        let raw = ["Subject: a very", "\tlong subject line", "", "body"].join(CRLF);
        assert_eq!(parse(&raw).message.subject, "a very long subject line");
    }

    #[test]
    fn first_header_value_wins() {
        let raw = ["Subject: first", "Subject: second", "", "body"].join(CRLF);
        assert_eq!(parse(&raw).message.subject, "first");
    }

    #[test]
    fn multipart_takes_first_text_plain_part() {
        let raw = [
            "To: demo@example.com",
            "Content-Type: multipart/alternative; boundary=\"sep\"",
            "",
            "preamble to ignore",
            "--sep",
            "Content-Type: text/html; charset=utf-8",
            "",
            "<p>rich version</p>",
            "--sep",
            "Content-Type: text/plain; charset=utf-8",
            "",
            "plain version",
            "--sep--",
        ]
        .join(CRLF);

        assert_eq!(parse(&raw).message.body, "plain version");
    }

    #[test]
    fn multipart_without_text_plain_is_error() {
        let raw = [
            "Content-Type: multipart/alternative; boundary=sep",
            "",
            "--sep",
            "Content-Type: text/html",
            "",
            "<p>only html</p>",
            "--sep--",
        ]
        .join(CRLF);

        let result = parse_mail("a@b.com", "c@d.com", &raw, &TestClock::new());
        assert!(matches!(result, Err(CoreError::MissingTextPart)));
    }

    #[test]
    fn multipart_without_boundary_is_malformed() {
        let raw = ["Content-Type: multipart/mixed", "", "body"].join(CRLF);
        let result = parse_mail("a@b.com", "c@d.com", &raw, &TestClock::new());
        assert!(matches!(result, Err(CoreError::MalformedMessage(_))));
    }

    #[test]
    fn body_is_trimmed_and_flattened() {
        let raw = ["", "", "  line one", "line two", "", ""].join(CRLF);
        assert_eq!(parse(&raw).message.body, "line one line two");
    }

    #[test]
    fn empty_input_yields_empty_message() {
        let mail = parse("");
        assert!(mail.message.body.is_empty());
        assert!(mail.message.subject.is_empty());
        assert!(mail.received.is_empty());
    }

    #[test]
    fn message_serializes_with_wire_names() {
        let raw = ["To: demo@example.com", "Subject: hi", "", "body text"].join(CRLF);
        let mail = parse(&raw);

        let json = serde_json::to_value(&mail.message).unwrap();
        assert_eq!(json["to"], "demo@example.com");
        assert_eq!(json["spf"], "None");
        assert_eq!(json["sender-IP"], "");
    }
}
