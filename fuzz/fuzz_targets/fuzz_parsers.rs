//! Fuzz testing for the string parsers behind configuration values.
//!
//! Every parser must return a value or an error for any input, never panic.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_parsers -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `CidrRange::parse` and `contains` (trusted proxies)
//! - `RateLimitAlgorithm` / `SlashAction` `FromStr`
//! - Content type, charset and encoding allow-list checks
//! - `DefaultIpExtractor` on arbitrary forwarding headers
//! - Trailing slash normalization and stack trace truncation

#![no_main]

use std::net::{IpAddr, Ipv6Addr};

use arbitrary::Arbitrary;
use axum::body::Body;
use axum::http::Request;
use libfuzzer_sys::fuzz_target;
use middleware_config::middleware::recover::{self, RecoverConfig};
use middleware_config::middleware::{
    CidrRange, ContentCharsetConfig, ContentEncodingConfig, ContentTypeConfig, DefaultIpExtractor,
    IpExtractor, RateLimitAlgorithm, SlashAction, TrailingSlashConfig,
};
use middleware_config::Configurable;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    text: &'a str,
    header: &'a str,
    addr: u128,
    stack_size: i64,
    prefer_slash: bool,
}

fuzz_target!(|input: Input<'_>| {
    if let Some(range) = CidrRange::parse(input.text) {
        let _ = range.contains(&IpAddr::V6(Ipv6Addr::from(input.addr)));
        let _ = range.contains(&IpAddr::from([0, 0, 0, 0]));
    }

    let _ = input.text.parse::<RateLimitAlgorithm>();
    let _ = input.text.parse::<SlashAction>();

    let _ = ContentTypeConfig::default().allows(input.text);
    let _ = ContentCharsetConfig::default().allows(input.text);
    let _ = ContentEncodingConfig::default().allows(input.text);

    // Header values must be visible ASCII; invalid ones are rejected by the builder
    for name in ["x-forwarded-for", "x-real-ip", "x-forwarded", "forwarded"] {
        if let Ok(req) = Request::builder()
            .header(name, input.header)
            .body(Body::empty())
        {
            let _ = DefaultIpExtractor.extract_ip(&req);
        }
    }

    let slash = TrailingSlashConfig {
        prefer_trailing_slash: input.prefer_slash,
        ..TrailingSlashConfig::default()
    };
    let _ = slash.normalize(input.text);

    let rec = RecoverConfig::from_options(&[recover::with_stack_size(input.stack_size)]);
    let _ = rec.truncate_trace(input.text);
});
