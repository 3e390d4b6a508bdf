//! Cross-origin resource sharing configuration.
//!
//! [`CorsConfig::to_layer`] turns a resolved config into a
//! [`tower_http::cors::CorsLayer`].
//!
//! # Security Note
//!
//! Using `*` (any origin) is convenient for development but should be
//! avoided in production. Specify explicit origins instead.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer, ExposeHeaders};
use tracing::warn;

use crate::options::{ConfigOption, Configurable};

/// Methods allowed by default.
pub const DEFAULT_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Request headers allowed by default.
pub const DEFAULT_HEADERS: [&str; 5] = [
    "Accept",
    "Authorization",
    "Content-Type",
    "Origin",
    "X-Request-Id",
];

/// Default preflight cache lifetime (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any.
    pub allowed_origins: Option<Vec<String>>,
    pub allowed_methods: Option<Vec<String>>,
    pub allowed_headers: Option<Vec<String>>,
    pub exposed_headers: Option<Vec<String>>,
    pub allow_credentials: bool,
    /// How long browsers may cache a preflight response.
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Some(vec!["*".to_string()]),
            allowed_methods: Some(DEFAULT_METHODS.iter().map(|m| m.to_string()).collect()),
            allowed_headers: Some(DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()),
            exposed_headers: None,
            allow_credentials: false,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl Configurable for CorsConfig {}

impl CorsConfig {
    /// Whether any origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        has_wildcard(self.allowed_origins.as_deref())
    }

    /// Build the tower-http layer for this config.
    ///
    /// Entries that are not valid methods, header names or header values are
    /// skipped with a warning. A `"*"` entry in any list means "any". The CORS
    /// protocol forbids wildcards together with credentials, so with
    /// `allow_credentials` the request origin, method and headers are mirrored
    /// instead and a wildcard exposed header is dropped.
    pub fn to_layer(&self) -> CorsLayer {
        let credentials = self.allow_credentials;

        let origin = if self.allows_any_origin() {
            if credentials {
                warn!("CORS wildcard origin with credentials; mirroring request origin instead");
                AllowOrigin::mirror_request()
            } else {
                Any.into()
            }
        } else {
            AllowOrigin::list(parse_all(
                self.allowed_origins.as_deref(),
                "origin",
                |o| HeaderValue::from_str(o).ok(),
            ))
        };

        let methods = match (has_wildcard(self.allowed_methods.as_deref()), credentials) {
            (true, true) => {
                warn!("CORS wildcard method with credentials; mirroring request method instead");
                AllowMethods::mirror_request()
            }
            (true, false) => AllowMethods::any(),
            (false, _) => AllowMethods::list(parse_all(
                self.allowed_methods.as_deref(),
                "method",
                |m| Method::from_bytes(m.as_bytes()).ok(),
            )),
        };

        let headers = match (has_wildcard(self.allowed_headers.as_deref()), credentials) {
            (true, true) => {
                warn!("CORS wildcard header with credentials; mirroring request headers instead");
                AllowHeaders::mirror_request()
            }
            (true, false) => AllowHeaders::any(),
            (false, _) => AllowHeaders::list(parse_all(
                self.allowed_headers.as_deref(),
                "allowed header",
                header_name,
            )),
        };

        let exposed = match (has_wildcard(self.exposed_headers.as_deref()), credentials) {
            (true, false) => ExposeHeaders::any(),
            (true, true) => {
                warn!("CORS wildcard exposed header with credentials; dropping it");
                let named: Vec<String> = self
                    .exposed_headers
                    .iter()
                    .flatten()
                    .filter(|h| h.trim() != "*")
                    .cloned()
                    .collect();
                ExposeHeaders::list(parse_all(Some(named.as_slice()), "exposed header", header_name))
            }
            (false, _) => ExposeHeaders::list(parse_all(
                self.exposed_headers.as_deref(),
                "exposed header",
                header_name,
            )),
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .expose_headers(exposed)
            .allow_credentials(credentials)
            .max_age(self.max_age)
    }
}

fn header_name(name: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes()).ok()
}

fn has_wildcard(values: Option<&[String]>) -> bool {
    values.is_some_and(|values| values.iter().any(|v| v.trim() == "*"))
}

fn parse_all<T>(
    values: Option<&[String]>,
    kind: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Vec<T> {
    values
        .unwrap_or_default()
        .iter()
        .filter_map(|value| {
            let parsed = parse(value);
            if parsed.is_none() {
                warn!(value = %value, kind, "Invalid CORS entry, skipping");
            }
            parsed
        })
        .collect()
}

pub type CorsOption = ConfigOption<CorsConfig>;

pub fn with_allowed_origins(origins: impl Into<Option<Vec<String>>>) -> CorsOption {
    let origins = origins.into();
    ConfigOption::new(move |cfg: &mut CorsConfig| cfg.allowed_origins = origins.clone())
}

pub fn with_allowed_methods(methods: impl Into<Option<Vec<String>>>) -> CorsOption {
    let methods = methods.into();
    ConfigOption::new(move |cfg: &mut CorsConfig| cfg.allowed_methods = methods.clone())
}

pub fn with_allowed_headers(headers: impl Into<Option<Vec<String>>>) -> CorsOption {
    let headers = headers.into();
    ConfigOption::new(move |cfg: &mut CorsConfig| cfg.allowed_headers = headers.clone())
}

pub fn with_exposed_headers(headers: impl Into<Option<Vec<String>>>) -> CorsOption {
    let headers = headers.into();
    ConfigOption::new(move |cfg: &mut CorsConfig| cfg.exposed_headers = headers.clone())
}

pub fn with_allow_credentials(allow: bool) -> CorsOption {
    ConfigOption::new(move |cfg: &mut CorsConfig| cfg.allow_credentials = allow)
}

pub fn with_max_age(max_age: Duration) -> CorsOption {
    ConfigOption::new(move |cfg: &mut CorsConfig| cfg.max_age = max_age)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CorsConfig::default();
        assert_eq!(cfg.allowed_origins, Some(vec!["*".to_string()]));
        assert_eq!(cfg.allowed_methods.as_ref().map(Vec::len), Some(7));
        assert_eq!(cfg.allowed_headers.as_ref().map(Vec::len), Some(5));
        assert!(cfg.exposed_headers.is_none());
        assert!(!cfg.allow_credentials);
        assert_eq!(cfg.max_age, Duration::from_secs(86_400));
        assert!(cfg.allows_any_origin());
    }

    #[test]
    fn test_origins_replaced_wholesale() {
        let cfg = CorsConfig::from_options(&[
            with_allowed_origins(vec!["https://a.example".to_string()]),
            with_allowed_origins(vec!["https://b.example".to_string()]),
        ]);
        assert_eq!(cfg.allowed_origins, Some(vec!["https://b.example".to_string()]));
        assert!(!cfg.allows_any_origin());
    }

    #[test]
    fn test_to_layer_any() {
        let _layer = CorsConfig::default().to_layer();
        // Just verify it doesn't panic
    }

    #[test]
    fn test_to_layer_specific_with_invalid_entries() {
        let cfg = CorsConfig::from_options(&[
            with_allowed_origins(vec![
                "https://example.com".to_string(),
                "bad\norigin".to_string(),
            ]),
            with_allowed_methods(vec!["GET".to_string(), "NOT A METHOD".to_string()]),
            with_exposed_headers(vec!["X-Total-Count".to_string()]),
        ]);
        let _layer = cfg.to_layer();
    }

    #[test]
    fn test_to_layer_nil_lists() {
        let cfg = CorsConfig::from_options(&[
            with_allowed_origins(None),
            with_allowed_methods(None),
            with_allowed_headers(None),
        ]);
        let _layer = cfg.to_layer();
    }

    #[test]
    fn test_wildcard_lists_with_credentials_build_a_router() {
        let cfg = CorsConfig::from_options(&[
            with_allowed_origins(vec!["https://app.example".to_string()]),
            with_allowed_methods(vec!["*".to_string()]),
            with_allowed_headers(vec!["*".to_string()]),
            with_exposed_headers(vec!["*".to_string()]),
            with_allow_credentials(true),
        ]);
        let _router: axum::Router = axum::Router::new()
            .route("/", axum::routing::get(|| async { "ok" }))
            .layer(cfg.to_layer());
    }

    #[test]
    fn test_wildcard_lists_without_credentials_build_a_router() {
        let cfg = CorsConfig::from_options(&[
            with_allowed_methods(vec!["*".to_string()]),
            with_allowed_headers(vec!["*".to_string()]),
            with_exposed_headers(vec!["*".to_string()]),
        ]);
        let _router: axum::Router = axum::Router::new()
            .route("/", axum::routing::get(|| async { "ok" }))
            .layer(cfg.to_layer());
    }
}
