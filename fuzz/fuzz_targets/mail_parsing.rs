#![no_main]

//! Fuzz target for raw mail parsing.
//!
//! Feeds arbitrary bytes through the DATA-block parser to ensure header
//! splitting, unfolding, and multipart extraction never panic on
//! malformed or hostile input.

use dewmail_core::TestClock;
use dewmail_smtp::parse_mail;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let clock = TestClock::new();

    // Errors are fine; panics are the bug
    let _ = parse_mail("fuzz@example.com", "demo@example.com", raw, &clock);

    // Also exercise the path where the raw text supplies the To header
    let with_header = format!("To: target+x@example.net\r\n{raw}");
    let _ = parse_mail("fuzz@example.com", "demo@example.com", &with_header, &clock);
});
