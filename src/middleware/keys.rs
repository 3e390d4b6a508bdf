//! Partition keys for per-caller and per-endpoint policies.
//!
//! A [`KeyExtractor`] decides the granularity of rate limiting and circuit
//! breaking: one key for everything (global), one per client IP, one per path,
//! one per user, or any combination a closure can express.

use axum::body::Body;
use axum::http::Request;

use super::ip::remote_addr;

/// Maps a request to a partition key.
pub trait KeyExtractor: Send + Sync {
    fn extract_key(&self, req: &Request<Body>) -> String;
}

impl<F> KeyExtractor for F
where
    F: Fn(&Request<Body>) -> String + Send + Sync,
{
    fn extract_key(&self, req: &Request<Body>) -> String {
        self(req)
    }
}

/// `X-Forwarded-For` verbatim when non-empty, otherwise the connection
/// address verbatim (port included), otherwise an empty key.
///
/// Unlike [`DefaultIpExtractor`](super::ip::DefaultIpExtractor) the header is
/// not split, so a proxy chain is a key of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedForKey;

impl KeyExtractor for ForwardedForKey {
    fn extract_key(&self, req: &Request<Body>) -> String {
        if let Some(value) = req.headers().get("x-forwarded-for")
            && let Ok(value) = value.to_str()
            && !value.is_empty()
        {
            return value.to_string();
        }

        remote_addr(req)
            .map(|addr| addr.to_string())
            .unwrap_or_default()
    }
}

/// The request URI path, so each endpoint gets its own state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathKey;

impl KeyExtractor for PathKey {
    fn extract_key(&self, req: &Request<Body>) -> String {
        req.uri().path().to_string()
    }
}
