//! Request ID configuration and middleware.
//!
//! # Features
//!
//! - Configurable header name (default `X-Request-Id`)
//! - Pluggable [`IdGenerator`]; the default produces 32 lowercase hex chars
//!   from the OS CSPRNG and falls back to a timestamp id if it fails
//! - Propagates an incoming id instead of generating a new one
//! - Echoes the id on the response and records it in the tracing span
//!
//! # Client Usage
//!
//! ```bash
//! curl -H "X-Request-Id: my-correlation-id" http://localhost:3000/health
//! ```

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Request, Response};
use chrono::Utc;
use rand::TryRngCore;
use rand::rngs::OsRng;
use tower::{Layer, Service};
use tracing::{Span, debug, warn};
use uuid::Uuid;

use crate::options::{ConfigOption, Configurable};

/// Default header carrying the request id.
pub const DEFAULT_HEADER: &str = "X-Request-Id";

/// Produces request identifiers. Must be safe to call concurrently.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// 16 random bytes from the OS, hex encoded (32 lowercase characters).
///
/// If the OS source fails the id becomes `request-<unix nanos>` instead of
/// propagating the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHexId;

impl IdGenerator for RandomHexId {
    fn generate(&self) -> String {
        let mut bytes = [0u8; 16];
        match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => encode_hex(&bytes),
            Err(e) => {
                warn!(error = %e, "Secure random source failed, using timestamp request id");
                timestamp_id()
            }
        }
    }
}

/// Hyphenated UUIDv4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Id;

impl IdGenerator for UuidV4Id {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

fn timestamp_id() -> String {
    format!(
        "request-{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Tunables for the request id middleware.
#[derive(Clone)]
pub struct RequestIdConfig {
    pub header: String,
    /// `None` means incoming ids are propagated but never generated.
    pub generator: Option<Arc<dyn IdGenerator>>,
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            generator: Some(Arc::new(RandomHexId)),
        }
    }
}

impl Configurable for RequestIdConfig {}

impl fmt::Debug for RequestIdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdConfig")
            .field("header", &self.header)
            .field("generator", &self.generator.as_ref().map(|_| ".."))
            .finish()
    }
}

pub type RequestIdOption = ConfigOption<RequestIdConfig>;

pub fn with_header(header: impl Into<String>) -> RequestIdOption {
    let header = header.into();
    ConfigOption::new(move |cfg: &mut RequestIdConfig| cfg.header = header.clone())
}

pub fn with_generator(generator: Option<Arc<dyn IdGenerator>>) -> RequestIdOption {
    ConfigOption::new(move |cfg: &mut RequestIdConfig| cfg.generator = generator.clone())
}

/// Request ID layer for Tower middleware stack.
#[derive(Clone)]
pub struct RequestIdLayer {
    header: HeaderName,
    generator: Option<Arc<dyn IdGenerator>>,
}

impl RequestIdLayer {
    /// Build the layer from a resolved config.
    ///
    /// An unparseable header name falls back to [`DEFAULT_HEADER`].
    pub fn new(config: &RequestIdConfig) -> Self {
        let header = HeaderName::from_bytes(config.header.as_bytes()).unwrap_or_else(|_| {
            warn!(header = %config.header, "Invalid request id header name, using default");
            HeaderName::from_static("x-request-id")
        });
        Self {
            header,
            generator: config.generator.clone(),
        }
    }
}

impl Default for RequestIdLayer {
    fn default() -> Self {
        Self::new(&RequestIdConfig::default())
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService {
            inner,
            header: self.header.clone(),
            generator: self.generator.clone(),
        }
    }
}

/// Request ID service wrapper.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
    header: HeaderName,
    generator: Option<Arc<dyn IdGenerator>>,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = self.extract_or_generate(&req);
        let header = self.header.clone();

        // Only ids that are valid header values travel further
        let value = request_id
            .as_deref()
            .and_then(|id| HeaderValue::from_str(id).ok());

        if let Some(ref value) = value {
            req.headers_mut().insert(header.clone(), value.clone());
        }
        if let Some(ref id) = request_id {
            Span::current().record("request_id", id.as_str());
            debug!(request_id = %id, "Processing request");
        }

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            if let Some(value) = value {
                response.headers_mut().insert(header, value);
            }
            Ok(response)
        })
    }
}

impl<S> RequestIdService<S> {
    fn extract_or_generate<B>(&self, req: &Request<B>) -> Option<String> {
        if let Some(header_value) = req.headers().get(&self.header)
            && let Ok(value) = header_value.to_str()
            && !value.is_empty()
        {
            return Some(value.to_string());
        }

        self.generator.as_ref().map(|g| g.generate())
    }
}

/// Extension trait to read the request id set by [`RequestIdLayer`].
pub trait RequestIdExt {
    /// Request id under the default header name.
    fn request_id(&self) -> Option<String>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<String> {
        self.headers()
            .get(DEFAULT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn test_random_hex_id_format() {
        let id = RandomHexId.generate();
        assert_eq!(id.len(), 32);
        assert!(is_lower_hex(&id), "not lowercase hex: {id}");
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
    }

    #[test]
    fn test_timestamp_id_prefix() {
        let id = timestamp_id();
        assert!(id.starts_with("request-"));
        assert!(id["request-".len()..].parse::<i64>().is_ok());
    }

    #[test]
    fn test_random_hex_ids_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| (0..200).map(|_| RandomHexId.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate request id");
            }
        }
        assert_eq!(seen.len(), 1600);
    }

    #[test]
    fn test_uuid_generator() {
        let id = UuidV4Id.generate();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_defaults() {
        let cfg = RequestIdConfig::default();
        assert_eq!(cfg.header, "X-Request-Id");
        assert!(cfg.generator.is_some());
    }

    #[test]
    fn test_options() {
        let cfg = RequestIdConfig::from_options(&[
            with_header("X-Correlation-Id"),
            with_generator(Some(Arc::new(|| "fixed".to_string()))),
        ]);
        assert_eq!(cfg.header, "X-Correlation-Id");
        assert_eq!(cfg.generator.unwrap().generate(), "fixed");
    }

    #[test]
    fn test_request_id_ext_trait() {
        let req = Request::builder()
            .header("x-request-id", "test-id")
            .body(Body::empty())
            .unwrap();

        assert_eq!(req.request_id(), Some("test-id".to_string()));
    }

    #[test]
    fn test_request_id_ext_trait_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(req.request_id(), None);
    }
}
