//! Request timeout configuration.
//!
//! Handlers that do their own deadline bookkeeping can ask for the effective
//! timeout through [`RequestTimeoutExt`]; a per-request [`RequestTimeout`]
//! extension wins over the configured default.

use std::time::Duration;

use axum::http::Request;

use crate::options::{ConfigOption, Configurable};

/// Default handler deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub timeout: Duration,
    /// Status sent when the deadline passes (504 Gateway Timeout).
    pub status_code: u16,
    pub message: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            status_code: 504,
            message: "Request timed out".to_string(),
        }
    }
}

impl Configurable for TimeoutConfig {}

/// Per-request timeout override stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);

/// Extension trait for reading the effective timeout of a request.
pub trait RequestTimeoutExt {
    /// The request's override, or `config.timeout`.
    fn effective_timeout(&self, config: &TimeoutConfig) -> Duration;
}

impl<B> RequestTimeoutExt for Request<B> {
    fn effective_timeout(&self, config: &TimeoutConfig) -> Duration {
        self.extensions()
            .get::<RequestTimeout>()
            .map(|t| t.0)
            .unwrap_or(config.timeout)
    }
}

pub type TimeoutOption = ConfigOption<TimeoutConfig>;

pub fn with_timeout(timeout: Duration) -> TimeoutOption {
    ConfigOption::new(move |cfg: &mut TimeoutConfig| cfg.timeout = timeout)
}

pub fn with_status_code(status_code: u16) -> TimeoutOption {
    ConfigOption::new(move |cfg: &mut TimeoutConfig| cfg.status_code = status_code)
}

pub fn with_message(message: impl Into<String>) -> TimeoutOption {
    let message = message.into();
    ConfigOption::new(move |cfg: &mut TimeoutConfig| cfg.message = message.clone())
}
