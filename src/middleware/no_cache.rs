//! No-cache response headers configuration.
//!
//! The defaults tell browsers and proxies (including nginx via
//! `X-Accel-Expires`) never to cache a response, and strip request headers
//! that could produce a `304 Not Modified`.

use std::collections::HashMap;

use axum::http::HeaderName;
use chrono::{DateTime, Utc};

use super::headers::{HeaderLayer, parse_header};
use crate::options::{ConfigOption, Configurable};

/// `Cache-Control` value sent by default.
pub const CACHE_CONTROL: &str =
    "no-cache, no-store, no-transform, must-revalidate, private, max-age=0";

/// Request headers removed by default.
pub const DEFAULT_ETAG_HEADERS: [&str; 6] = [
    "ETag",
    "If-Modified-Since",
    "If-Match",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
];

/// The Unix epoch as an HTTP date: `Thu, 01 Jan 1970 00:00:00 UTC`.
pub fn epoch() -> String {
    DateTime::<Utc>::UNIX_EPOCH
        .format("%a, %d %b %Y %H:%M:%S UTC")
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoCacheConfig {
    /// Response headers to set.
    pub headers: Option<HashMap<String, String>>,
    /// Request headers to strip.
    pub etag_headers: Option<Vec<String>>,
}

impl Default for NoCacheConfig {
    fn default() -> Self {
        let headers = HashMap::from([
            ("Expires".to_string(), epoch()),
            ("Cache-Control".to_string(), CACHE_CONTROL.to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
            ("X-Accel-Expires".to_string(), "0".to_string()),
        ]);
        Self {
            headers: Some(headers),
            etag_headers: Some(DEFAULT_ETAG_HEADERS.iter().map(|h| h.to_string()).collect()),
        }
    }
}

impl Configurable for NoCacheConfig {}

impl NoCacheConfig {
    /// Header layer applying this config. Response headers always overwrite.
    pub fn to_layer(&self) -> HeaderLayer {
        let mut pairs: Vec<_> = self
            .headers
            .iter()
            .flatten()
            .filter_map(|(name, value)| parse_header(name, value))
            .collect();
        pairs.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        let removed = self
            .etag_headers
            .iter()
            .flatten()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();

        HeaderLayer::new(pairs, true).removing_request_headers(removed)
    }
}

pub type NoCacheOption = ConfigOption<NoCacheConfig>;

pub fn with_headers(headers: impl Into<Option<HashMap<String, String>>>) -> NoCacheOption {
    let headers = headers.into();
    ConfigOption::new(move |cfg: &mut NoCacheConfig| cfg.headers = headers.clone())
}

pub fn with_etag_headers(headers: impl Into<Option<Vec<String>>>) -> NoCacheOption {
    let headers = headers.into();
    ConfigOption::new(move |cfg: &mut NoCacheConfig| cfg.etag_headers = headers.clone())
}
