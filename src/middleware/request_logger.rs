//! Request logging configuration.
//!
//! Consumed by the `TraceLayer` wiring in [`crate::routes`] through
//! [`RequestLoggerConfig::span_for`] and [`RequestLoggerConfig::on_response`]:
//! `level` becomes the span and event level, `skip_paths` are exact-match
//! paths that are not logged.

use std::time::Duration;

use axum::http::{Request, Response};
use tracing::field::{Empty, debug};
use tracing::{Level, Span};

use crate::options::{ConfigOption, Configurable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLoggerConfig {
    pub level: Level,
    pub skip_paths: Option<Vec<String>>,
    pub include_headers: bool,
    pub include_query: bool,
}

impl Default for RequestLoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            skip_paths: None,
            include_headers: false,
            include_query: true,
        }
    }
}

impl Configurable for RequestLoggerConfig {}

impl RequestLoggerConfig {
    pub fn should_log(&self, path: &str) -> bool {
        !self
            .skip_paths
            .as_deref()
            .is_some_and(|paths| paths.iter().any(|p| p == path))
    }

    /// Span for one request, or a disabled span for skipped paths.
    ///
    /// Declares an empty `request_id` field for the request id layer to fill.
    pub fn span_for<B>(&self, req: &Request<B>) -> Span {
        let path = req.uri().path();
        if !self.should_log(path) {
            return Span::none();
        }

        let target = if self.include_query {
            req.uri().path_and_query().map_or(path, |pq| pq.as_str())
        } else {
            path
        };
        let method = req.method();

        let span = if self.level == Level::ERROR {
            tracing::error_span!("request", %method, uri = %target, request_id = Empty, headers = Empty)
        } else if self.level == Level::WARN {
            tracing::warn_span!("request", %method, uri = %target, request_id = Empty, headers = Empty)
        } else if self.level == Level::INFO {
            tracing::info_span!("request", %method, uri = %target, request_id = Empty, headers = Empty)
        } else if self.level == Level::DEBUG {
            tracing::debug_span!("request", %method, uri = %target, request_id = Empty, headers = Empty)
        } else {
            tracing::trace_span!("request", %method, uri = %target, request_id = Empty, headers = Empty)
        };

        if self.include_headers {
            span.record("headers", debug(req.headers()));
        }
        span
    }

    /// Completion event inside `span`. Nothing is emitted for skipped paths.
    pub fn on_response<B>(&self, response: &Response<B>, latency: Duration, span: &Span) {
        if span.is_disabled() {
            return;
        }
        let status = response.status().as_u16();
        let latency_ms = latency.as_millis() as u64;

        if self.level == Level::ERROR {
            tracing::error!(parent: span, status, latency_ms, "Request completed");
        } else if self.level == Level::WARN {
            tracing::warn!(parent: span, status, latency_ms, "Request completed");
        } else if self.level == Level::INFO {
            tracing::info!(parent: span, status, latency_ms, "Request completed");
        } else if self.level == Level::DEBUG {
            tracing::debug!(parent: span, status, latency_ms, "Request completed");
        } else {
            tracing::trace!(parent: span, status, latency_ms, "Request completed");
        }
    }
}

pub type RequestLoggerOption = ConfigOption<RequestLoggerConfig>;

pub fn with_level(level: Level) -> RequestLoggerOption {
    ConfigOption::new(move |cfg: &mut RequestLoggerConfig| cfg.level = level)
}

pub fn with_skip_paths(paths: impl Into<Option<Vec<String>>>) -> RequestLoggerOption {
    let paths = paths.into();
    ConfigOption::new(move |cfg: &mut RequestLoggerConfig| cfg.skip_paths = paths.clone())
}

pub fn with_include_headers(include: bool) -> RequestLoggerOption {
    ConfigOption::new(move |cfg: &mut RequestLoggerConfig| cfg.include_headers = include)
}

pub fn with_include_query(include: bool) -> RequestLoggerOption {
    ConfigOption::new(move |cfg: &mut RequestLoggerConfig| cfg.include_query = include)
}
