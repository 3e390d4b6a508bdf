//! Rate limit policy configuration.
//!
//! # Contract
//!
//! A limiter consuming [`RateLimitConfig`] must honour:
//!
//! - `rate` requests are permitted per `window`
//! - `algorithm` names the accounting strategy (token bucket, sliding window,
//!   fixed window); refill and window boundaries belong to the limiter
//! - `key_extractor` partitions state; the default keys on `X-Forwarded-For`
//!   and falls back to the connection address
//! - on limit exceeded: respond with `status_code` and `message`, plus
//!   `X-RateLimit-*` / `Retry-After` headers when `include_headers` is set
//! - requests whose path is in `exempt_paths` bypass the limiter entirely
//!   (exact string match)
//!
//! No value is validated here. Zero or negative rates, a zero window, an absent
//! key extractor and an absent message are all representable; what a limiter
//! does with them is up to the limiter. [`Middlewares::validate`] offers an
//! opt-in check.
//!
//! [`Middlewares::validate`]: crate::config::Middlewares::validate

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use serde::{Deserialize, Serialize};

use super::keys::{ForwardedForKey, KeyExtractor};
use crate::error::ConfigError;
use crate::options::{ConfigOption, Configurable};

/// Default number of requests per window.
pub const DEFAULT_RATE: i64 = 100;

/// Default accounting window (one minute).
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default status code for rejected requests (429 Too Many Requests).
pub const DEFAULT_STATUS_CODE: u16 = 429;

/// Default rejection body.
pub const DEFAULT_MESSAGE: &str = "Rate limit exceeded";

/// Accounting strategy a limiter should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAlgorithm {
    #[default]
    TokenBucket,
    SlidingWindow,
    FixedWindow,
}

impl RateLimitAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAlgorithm::TokenBucket => "token_bucket",
            RateLimitAlgorithm::SlidingWindow => "sliding_window",
            RateLimitAlgorithm::FixedWindow => "fixed_window",
        }
    }
}

impl fmt::Display for RateLimitAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "token_bucket" => Ok(RateLimitAlgorithm::TokenBucket),
            "sliding_window" => Ok(RateLimitAlgorithm::SlidingWindow),
            "fixed_window" => Ok(RateLimitAlgorithm::FixedWindow),
            other => Err(ConfigError::invalid(
                "rate limit algorithm",
                format!("unknown algorithm '{other}', expected token_bucket, sliding_window or fixed_window"),
            )),
        }
    }
}

/// Tunables for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Requests permitted per `window`.
    pub rate: i64,
    /// Accounting window.
    pub window: Duration,
    pub algorithm: RateLimitAlgorithm,
    /// Partitions limiter state. `None` leaves the choice to the limiter.
    pub key_extractor: Option<Arc<dyn KeyExtractor>>,
    pub status_code: u16,
    pub message: Option<String>,
    /// Emit `X-RateLimit-Limit` / `X-RateLimit-Remaining` / `Retry-After`.
    pub include_headers: bool,
    /// Paths that bypass the limiter (exact match).
    pub exempt_paths: Option<Vec<String>>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            window: DEFAULT_WINDOW,
            algorithm: RateLimitAlgorithm::TokenBucket,
            key_extractor: Some(Arc::new(ForwardedForKey)),
            status_code: DEFAULT_STATUS_CODE,
            message: Some(DEFAULT_MESSAGE.to_string()),
            include_headers: true,
            exempt_paths: None,
        }
    }
}

impl Configurable for RateLimitConfig {}

impl RateLimitConfig {
    /// Whether `path` bypasses the limiter. Exact string match only.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths
            .as_deref()
            .is_some_and(|paths| paths.iter().any(|p| p == path))
    }

    /// Partition key for `req`, or `None` when no extractor is configured.
    pub fn key_for(&self, req: &Request<Body>) -> Option<String> {
        self.key_extractor.as_ref().map(|k| k.extract_key(req))
    }
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("rate", &self.rate)
            .field("window", &self.window)
            .field("algorithm", &self.algorithm)
            .field("key_extractor", &self.key_extractor.as_ref().map(|_| ".."))
            .field("status_code", &self.status_code)
            .field("message", &self.message)
            .field("include_headers", &self.include_headers)
            .field("exempt_paths", &self.exempt_paths)
            .finish()
    }
}

pub type RateLimitOption = ConfigOption<RateLimitConfig>;

pub fn with_rate(rate: i64) -> RateLimitOption {
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.rate = rate)
}

pub fn with_window(window: Duration) -> RateLimitOption {
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.window = window)
}

pub fn with_algorithm(algorithm: RateLimitAlgorithm) -> RateLimitOption {
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.algorithm = algorithm)
}

pub fn with_key_extractor(extractor: Option<Arc<dyn KeyExtractor>>) -> RateLimitOption {
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.key_extractor = extractor.clone())
}

pub fn with_status_code(status_code: u16) -> RateLimitOption {
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.status_code = status_code)
}

pub fn with_message(message: impl Into<Option<String>>) -> RateLimitOption {
    let message = message.into();
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.message = message.clone())
}

pub fn with_include_headers(include: bool) -> RateLimitOption {
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.include_headers = include)
}

pub fn with_exempt_paths(paths: impl Into<Option<Vec<String>>>) -> RateLimitOption {
    let paths = paths.into();
    ConfigOption::new(move |cfg: &mut RateLimitConfig| cfg.exempt_paths = paths.clone())
}
