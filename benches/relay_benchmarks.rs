//! Performance benchmarks for the relay's hot parsing paths.
//!
//! Covers sender redaction, recipient routing, and raw mail parsing.
//! Everything here runs per inbound message, so regressions show up
//! directly as per-mail latency.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dewmail_core::{redact_sender, RecipientRoute, RouteConfig, TestClock};
use dewmail_smtp::parse_mail;

fn bench_redaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("redaction");

    for (name, address) in [
        ("short", "a@b.io"),
        ("typical", "alice.liddell@mail.example.com"),
        ("no_at", "not-an-address-at-all"),
    ] {
        group.bench_with_input(BenchmarkId::new("redact_sender", name), &address, |b, addr| {
            b.iter(|| redact_sender(black_box(addr)));
        });
    }

    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let config = RouteConfig::default();

    c.bench_function("route_parse_and_url", |b| {
        b.iter(|| {
            let route = RecipientRoute::parse(black_box("hooks+orders+eu@api.example.com"))
                .expect("fixture address parses");
            route.target_url(&config)
        });
    });
}

fn bench_mail_parsing(c: &mut Criterion) {
    let clock = TestClock::new();

    let simple = "Received: from client.example.net (198.51.100.7)\r\n\
                  Subject: benchmark\r\n\
                  \r\n\
                  A short single-line body.";

    let body_line = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\r\n";
    let large = format!(
        "Subject: benchmark\r\n\r\n{}",
        body_line.repeat(500)
    );

    let multipart = format!(
        "Subject: benchmark\r\n\
         Content-Type: multipart/alternative; boundary=\"bnd\"\r\n\
         \r\n\
         --bnd\r\nContent-Type: text/plain\r\n\r\n{}\r\n\
         --bnd\r\nContent-Type: text/html\r\n\r\n<p>{}</p>\r\n\
         --bnd--",
        body_line.repeat(50),
        body_line.repeat(50)
    );

    let mut group = c.benchmark_group("mail_parsing");

    for (name, raw) in
        [("simple", simple.to_string()), ("large_body", large), ("multipart", multipart)]
    {
        group.bench_with_input(BenchmarkId::new("parse_mail", name), &raw, |b, raw| {
            b.iter(|| {
                parse_mail(
                    black_box("alice@example.com"),
                    black_box("demo+add@example.com"),
                    black_box(raw),
                    &clock,
                )
                .expect("fixture mail parses")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_redaction, bench_routing, bench_mail_parsing);
criterion_main!(benches);
