//! Test data builders for ingest payloads and raw mail.
//!
//! Builders default to a well-formed fixture so tests only spell out
//! the field under test.

use serde_json::{json, Map, Value};

/// Builder for demo ingest payloads.
///
/// Produces the JSON shape the demo surface receives: a `from` field
/// plus whatever else the sending side attached.
pub struct PayloadBuilder {
    from: Option<Value>,
    fields: Map<String, Value>,
}

impl PayloadBuilder {
    /// Creates a payload builder with a plausible sender and body.
    pub fn new() -> Self {
        let mut fields = Map::new();
        fields.insert("subject".to_string(), json!("Test message"));
        fields.insert("body".to_string(), json!("Hello from the test suite"));
        Self { from: Some(json!("alice@example.com")), fields }
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(Value::String(from.into()));
        self
    }

    /// Sets `from` to an arbitrary JSON value, string or not.
    #[must_use]
    pub fn from_value(mut self, from: Value) -> Self {
        self.from = Some(from);
        self
    }

    /// Drops the `from` field entirely.
    #[must_use]
    pub fn without_from(mut self) -> Self {
        self.from = None;
        self
    }

    /// Sets an arbitrary field on the payload.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Builds the payload as a JSON value.
    pub fn build(self) -> Value {
        let mut payload = self.fields;
        if let Some(from) = self.from {
            payload.insert("from".to_string(), from);
        }
        Value::Object(payload)
    }
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for raw RFC 822 message text as sent during SMTP DATA.
///
/// Lines are CRLF-joined; the result has headers, a blank line, and the
/// body, without the trailing `.` terminator (the session helper adds
/// that when writing to the socket).
pub struct MailBuilder {
    headers: Vec<(String, String)>,
    body: String,
}

impl MailBuilder {
    /// Creates a mail builder with a subject and a one-line body.
    pub fn new() -> Self {
        Self {
            headers: vec![("Subject".to_string(), "Test message".to_string())],
            body: "Hello from the test suite".to_string(),
        }
    }

    /// Replaces the `Subject` header.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Subject"));
        self.headers.push(("Subject".to_string(), subject.into()));
        self
    }

    /// Adds a header line.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the message body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Wraps the current body in a two-part multipart/alternative
    /// message whose text/plain part carries the body.
    #[must_use]
    pub fn multipart(mut self, boundary: &str) -> Self {
        self.headers.push((
            "Content-Type".to_string(),
            format!("multipart/alternative; boundary=\"{boundary}\""),
        ));
        self.body = format!(
            "--{boundary}\r\nContent-Type: text/plain\r\n\r\n{}\r\n\
             --{boundary}\r\nContent-Type: text/html\r\n\r\n<p>ignored</p>\r\n\
             --{boundary}--",
            self.body
        );
        self
    }

    /// Builds the raw message text.
    pub fn build(self) -> String {
        let mut raw = String::new();
        for (name, value) in &self.headers {
            raw.push_str(name);
            raw.push_str(": ");
            raw.push_str(value);
            raw.push_str("\r\n");
        }
        raw.push_str("\r\n");
        raw.push_str(&self.body);
        raw
    }
}

impl Default for MailBuilder {
    fn default() -> Self {
        Self::new()
    }
}
