//! Circuit breaker policy configuration.
//!
//! The breaker a consumer builds from [`CircuitBreakerConfig`] is expected to
//! follow this state machine, independently for every key produced by
//! `key_extractor`:
//!
//! ```text
//! ┌─────────┐  failure_threshold consecutive   ┌─────────┐
//! │ Closed  │ ───────────── failures ────────► │  Open   │ ◄──┐
//! └────▲────┘                                  └────┬────┘    │
//!      │                                            │         │
//!      │ success_threshold           recovery_timeout│         │ any
//!      │ consecutive successes              elapses  ▼         │ failure
//!      │                                   ┌───────────────┐  │
//!      └────────────────────────────────── │   HalfOpen    │ ─┘
//!                                          └───────────────┘
//! ```
//!
//! A response counts as a failure when `is_failure(request, status)` says so
//! (default: status ≥ 500). While open, requests are answered immediately with
//! `open_status_code` and `open_message` and never reach the handler.
//!
//! Only the policy lives here. Counters, timers and their synchronization
//! belong to the consumer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use serde::{Deserialize, Serialize};

use super::keys::{KeyExtractor, PathKey};
use crate::options::{ConfigOption, Configurable};

pub const DEFAULT_FAILURE_THRESHOLD: i64 = 5;
pub const DEFAULT_SUCCESS_THRESHOLD: i64 = 3;
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OPEN_STATUS_CODE: u16 = 503;
pub const DEFAULT_OPEN_MESSAGE: &str = "Service temporarily unavailable";

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation - all requests pass through.
    Closed,
    /// Failing fast - all requests are rejected immediately.
    Open,
    /// Testing recovery - trial requests decide between Closed and Open.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Decides whether a completed request counts against the circuit.
pub trait FailureClassifier: Send + Sync {
    fn is_failure(&self, req: &Request<Body>, status: u16) -> bool;
}

impl<F> FailureClassifier for F
where
    F: Fn(&Request<Body>, u16) -> bool + Send + Sync,
{
    fn is_failure(&self, req: &Request<Body>, status: u16) -> bool {
        self(req, status)
    }
}

/// Any 5xx status is a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerErrorClassifier;

impl FailureClassifier for ServerErrorClassifier {
    fn is_failure(&self, _req: &Request<Body>, status: u16) -> bool {
        status >= 500
    }
}

/// Tunables for the circuit breaker middleware.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: i64,
    /// Consecutive half-open successes that close it again.
    pub success_threshold: i64,
    /// Time spent open before allowing trial requests.
    pub recovery_timeout: Duration,
    pub failure_classifier: Option<Arc<dyn FailureClassifier>>,
    /// Partitions breaker state. Default: one circuit per URL path.
    pub key_extractor: Option<Arc<dyn KeyExtractor>>,
    pub open_status_code: u16,
    pub open_message: Option<String>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
            failure_classifier: Some(Arc::new(ServerErrorClassifier)),
            key_extractor: Some(Arc::new(PathKey)),
            open_status_code: DEFAULT_OPEN_STATUS_CODE,
            open_message: Some(DEFAULT_OPEN_MESSAGE.to_string()),
        }
    }
}

impl Configurable for CircuitBreakerConfig {}

impl CircuitBreakerConfig {
    /// Classify a completed request. Without a classifier nothing is a failure.
    pub fn is_failure(&self, req: &Request<Body>, status: u16) -> bool {
        self.failure_classifier
            .as_ref()
            .is_some_and(|c| c.is_failure(req, status))
    }

    /// Circuit key for `req`, or `None` when no extractor is configured.
    pub fn key_for(&self, req: &Request<Body>) -> Option<String> {
        self.key_extractor.as_ref().map(|k| k.extract_key(req))
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("recovery_timeout", &self.recovery_timeout)
            .field(
                "failure_classifier",
                &self.failure_classifier.as_ref().map(|_| ".."),
            )
            .field("key_extractor", &self.key_extractor.as_ref().map(|_| ".."))
            .field("open_status_code", &self.open_status_code)
            .field("open_message", &self.open_message)
            .finish()
    }
}

pub type CircuitBreakerOption = ConfigOption<CircuitBreakerConfig>;

pub fn with_failure_threshold(threshold: i64) -> CircuitBreakerOption {
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| cfg.failure_threshold = threshold)
}

pub fn with_success_threshold(threshold: i64) -> CircuitBreakerOption {
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| cfg.success_threshold = threshold)
}

pub fn with_recovery_timeout(timeout: Duration) -> CircuitBreakerOption {
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| cfg.recovery_timeout = timeout)
}

pub fn with_failure_classifier(
    classifier: Option<Arc<dyn FailureClassifier>>,
) -> CircuitBreakerOption {
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| {
        cfg.failure_classifier = classifier.clone()
    })
}

pub fn with_key_extractor(extractor: Option<Arc<dyn KeyExtractor>>) -> CircuitBreakerOption {
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| {
        cfg.key_extractor = extractor.clone()
    })
}

pub fn with_open_status_code(status_code: u16) -> CircuitBreakerOption {
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| cfg.open_status_code = status_code)
}

pub fn with_open_message(message: impl Into<Option<String>>) -> CircuitBreakerOption {
    let message = message.into();
    ConfigOption::new(move |cfg: &mut CircuitBreakerConfig| cfg.open_message = message.clone())
}
