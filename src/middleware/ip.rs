//! Client IP extraction shared by the real-IP and rate-limit configurations.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **The default extractor trusts client-provided headers.** Malicious clients
//! can set `X-Forwarded-For` or `X-Real-IP` themselves when the service is
//! reachable directly. Deploy behind a reverse proxy that overwrites these
//! headers, and list that proxy in `RealIpConfig::trusted_proxies`.
//!
//! # Header Priority
//!
//! [`DefaultIpExtractor`] checks, in order, returning the first non-empty match:
//!
//! 1. `X-Forwarded-For`: first entry of the comma-separated list
//! 2. `X-Real-IP`
//! 3. `X-Forwarded`: first entry of the comma-separated list
//! 4. `Forwarded`: the `for=` parameter of the first element (RFC 7239)
//! 5. The connection address (`ConnectInfo<SocketAddr>`), port stripped
//! 6. Empty string
//!
//! # Internal Architecture
//!
//! ```text
//!   extract_ip_from_headers ──► ExtractedIp<'a>  (borrowed, no allocation)
//!              │
//!              ▼
//!   DefaultIpExtractor::extract_ip ──► String    (debug log names the source)
//! ```

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::debug;

/// Maps a request to the client IP it should be attributed to.
pub trait IpExtractor: Send + Sync {
    fn extract_ip(&self, req: &Request<Body>) -> String;
}

impl<F> IpExtractor for F
where
    F: Fn(&Request<Body>) -> String + Send + Sync,
{
    fn extract_ip(&self, req: &Request<Body>) -> String {
        self(req)
    }
}

/// Where an IP was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractedIp<'a> {
    FromXff(&'a str),
    FromRealIp(&'a str),
    FromXForwarded(&'a str),
    FromForwarded(&'a str),
    NotFound,
}

#[inline]
fn header_str<'a>(req: &'a Request<Body>, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[inline]
fn first_list_entry(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Pull the `for=` parameter out of the first element of a `Forwarded` header.
///
/// `Forwarded: for="[2001:db8::1]:4711";proto=https, for=198.51.100.17`
/// yields `2001:db8::1`.
fn forwarded_for(value: &str) -> Option<&str> {
    let first = value.split(',').next()?;
    for pair in first.split(';') {
        let Some((key, raw)) = pair.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("for") {
            continue;
        }
        let unquoted = raw.trim().trim_matches('"');
        // Bracketed IPv6, optionally followed by a port.
        if let Some(rest) = unquoted.strip_prefix('[') {
            return rest.split(']').next().filter(|v| !v.is_empty());
        }
        return Some(unquoted).filter(|v| !v.is_empty());
    }
    None
}

#[inline]
fn extract_ip_from_headers(req: &Request<Body>) -> ExtractedIp<'_> {
    if let Some(ip) = header_str(req, "x-forwarded-for").and_then(first_list_entry) {
        return ExtractedIp::FromXff(ip);
    }

    if let Some(ip) = header_str(req, "x-real-ip") {
        return ExtractedIp::FromRealIp(ip);
    }

    if let Some(ip) = header_str(req, "x-forwarded").and_then(first_list_entry) {
        return ExtractedIp::FromXForwarded(ip);
    }

    if let Some(ip) = header_str(req, "forwarded").and_then(forwarded_for) {
        return ExtractedIp::FromForwarded(ip);
    }

    ExtractedIp::NotFound
}

/// Connection address recorded by `into_make_service_with_connect_info`.
pub fn remote_addr(req: &Request<Body>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Header-chain IP extractor used by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIpExtractor;

impl IpExtractor for DefaultIpExtractor {
    fn extract_ip(&self, req: &Request<Body>) -> String {
        let (source, ip) = match extract_ip_from_headers(req) {
            ExtractedIp::FromXff(ip) => ("x-forwarded-for", ip),
            ExtractedIp::FromRealIp(ip) => ("x-real-ip", ip),
            ExtractedIp::FromXForwarded(ip) => ("x-forwarded", ip),
            ExtractedIp::FromForwarded(ip) => ("forwarded", ip),
            ExtractedIp::NotFound => {
                return match remote_addr(req) {
                    Some(addr) => addr.ip().to_string(),
                    None => {
                        debug!("No proxy headers or connection info - client IP unknown");
                        String::new()
                    }
                };
            }
        };
        debug!(client_ip = %ip, source, "Extracted client IP from header");
        ip.to_string()
    }
}
