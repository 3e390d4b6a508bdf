//! HTTP Basic authentication configuration and middleware.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: [`StaticCredentials`] compares passwords
//!   with `subtle` so response timing does not leak how much matched
//! - **Selective protection**: exempt paths bypass authentication
//!
//! # Path Matching Behavior
//!
//! Exempt paths use **exact string matching** against `request.uri().path()`:
//! `/health` is exempt, `/health/` and `/HEALTH` are not. Query strings are
//! not part of the path and never affect matching.
//!
//! # Client Usage
//!
//! ```bash
//! curl -u admin:secret http://localhost:3000/admin
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::options::{ConfigOption, Configurable};

/// Default protection realm announced in `WWW-Authenticate`.
pub const DEFAULT_REALM: &str = "Restricted";

/// Decides whether a user/password pair is accepted.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, user: &str, password: &str) -> bool;
}

impl<F> CredentialValidator for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn validate(&self, user: &str, password: &str) -> bool {
        self(user, password)
    }
}

/// Fixed user → password table.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn single(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            users: HashMap::from([(user.into(), password.into())]),
        }
    }
}

impl CredentialValidator for StaticCredentials {
    fn validate(&self, user: &str, password: &str) -> bool {
        match self.users.get(user) {
            Some(expected) => constant_time_eq(password, expected),
            None => false,
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("users", &self.users.len())
            .finish()
    }
}

/// Perform constant-time comparison of two strings.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[derive(Clone)]
pub struct BasicAuthConfig {
    pub realm: String,
    /// `None` rejects every non-exempt request.
    pub validator: Option<Arc<dyn CredentialValidator>>,
    pub exempt_paths: Option<Vec<String>>,
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
            validator: None,
            exempt_paths: None,
        }
    }
}

impl Configurable for BasicAuthConfig {}

impl BasicAuthConfig {
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths
            .as_deref()
            .is_some_and(|paths| paths.iter().any(|p| p == path))
    }
}

impl fmt::Debug for BasicAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthConfig")
            .field("realm", &self.realm)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .field("exempt_paths", &self.exempt_paths)
            .finish()
    }
}

pub type BasicAuthOption = ConfigOption<BasicAuthConfig>;

pub fn with_realm(realm: impl Into<String>) -> BasicAuthOption {
    let realm = realm.into();
    ConfigOption::new(move |cfg: &mut BasicAuthConfig| cfg.realm = realm.clone())
}

pub fn with_validator(validator: Option<Arc<dyn CredentialValidator>>) -> BasicAuthOption {
    ConfigOption::new(move |cfg: &mut BasicAuthConfig| cfg.validator = validator.clone())
}

pub fn with_exempt_paths(paths: impl Into<Option<Vec<String>>>) -> BasicAuthOption {
    let paths = paths.into();
    ConfigOption::new(move |cfg: &mut BasicAuthConfig| cfg.exempt_paths = paths.clone())
}

/// Basic authentication layer.
#[derive(Clone)]
pub struct BasicAuthLayer {
    config: Arc<BasicAuthConfig>,
}

impl BasicAuthLayer {
    pub fn new(config: BasicAuthConfig) -> Self {
        if config.validator.is_none() {
            warn!("Basic auth has no credential validator, all protected requests will be rejected");
        }
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Basic authentication service wrapper.
#[derive(Clone)]
pub struct BasicAuthService<S> {
    inner: S,
    config: Arc<BasicAuthConfig>,
}

impl<S> Service<Request<Body>> for BasicAuthService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if config.is_exempt(path) {
                debug!(path, "Bypassing basic auth for exempt path");
                return inner.call(req).await;
            }

            let Some((user, password)) = extract_credentials(&req) else {
                warn!(path = %req.uri().path(), "Missing or malformed basic credentials");
                return Ok(unauthorized_response(&config.realm));
            };

            let accepted = config
                .validator
                .as_ref()
                .is_some_and(|v| v.validate(&user, &password));

            if accepted {
                debug!(user = %user, "Basic authentication successful");
                inner.call(req).await
            } else {
                warn!(path = %req.uri().path(), user = %user, "Invalid basic credentials");
                Ok(unauthorized_response(&config.realm))
            }
        })
    }
}

/// Decode `Authorization: Basic <base64(user:password)>`.
///
/// The scheme is matched case-insensitively. The password may contain `:`.
fn extract_credentials<B>(req: &Request<B>) -> Option<(String, String)> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Realm text safe inside a quoted header parameter: `"` becomes `'` and
/// control characters become spaces.
fn quoted_realm(realm: &str) -> String {
    realm
        .chars()
        .map(|c| match c {
            '"' => '\'',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

/// Build an unauthorized (401) response carrying the realm challenge.
fn unauthorized_response(realm: &str) -> Response<Body> {
    let challenge = format!(r#"Basic realm="{}""#, quoted_realm(realm));
    (
        StatusCode::UNAUTHORIZED,
        [
            (WWW_AUTHENTICATE.as_str(), challenge),
            ("Content-Type", "application/json".to_string()),
        ],
        r#"{"error":"unauthorized","message":"Authentication required"}"#.to_string(),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    #[test]
    fn test_defaults() {
        let cfg = BasicAuthConfig::default();
        assert_eq!(cfg.realm, "Restricted");
        assert!(cfg.validator.is_none());
        assert!(cfg.exempt_paths.is_none());
    }

    #[test]
    fn test_extract_credentials() {
        let req = Request::builder()
            .header("authorization", basic("admin", "pa:ss"))
            .body(Body::empty())
            .unwrap();
        let (user, password) = extract_credentials(&req).unwrap();
        assert_eq!(user, "admin");
        assert_eq!(password, "pa:ss");
    }

    #[test]
    fn test_extract_credentials_lowercase_scheme() {
        let header = basic("u", "p").replacen("Basic", "basic", 1);
        let req = Request::builder()
            .header("authorization", header)
            .body(Body::empty())
            .unwrap();
        assert!(extract_credentials(&req).is_some());
    }

    #[test]
    fn test_extract_credentials_rejects_other_schemes() {
        let req = Request::builder()
            .header("authorization", "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert!(extract_credentials(&req).is_none());

        let req = Request::builder()
            .header("authorization", "Basic !!!not-base64")
            .body(Body::empty())
            .unwrap();
        assert!(extract_credentials(&req).is_none());
    }

    #[test]
    fn test_static_credentials() {
        let creds = StaticCredentials::single("admin", "secret");
        assert!(creds.validate("admin", "secret"));
        assert!(!creds.validate("admin", "secret2"));
        assert!(!creds.validate("root", "secret"));
    }

    #[test]
    fn test_closure_validator() {
        let cfg = BasicAuthConfig::from_options(&[with_validator(Some(Arc::new(
            |user: &str, _: &str| user == "guest",
        )))]);
        assert!(cfg.validator.unwrap().validate("guest", ""));
    }

    #[test]
    fn test_is_exempt_exact_match() {
        let cfg = BasicAuthConfig::from_options(&[with_exempt_paths(vec!["/health".to_string()])]);
        assert!(cfg.is_exempt("/health"));
        assert!(!cfg.is_exempt("/health/"));
        assert!(!cfg.is_exempt("/HEALTH"));
    }

    #[test]
    fn test_constant_time_eq_different_lengths() {
        assert!(!constant_time_eq("short", "much-longer-string"));
    }

    #[test]
    fn test_unauthorized_response_challenge() {
        let response = unauthorized_response("Admin Area");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            r#"Basic realm="Admin Area""#
        );
    }

    #[test]
    fn test_unauthorized_response_sanitizes_realm() {
        let response = unauthorized_response("Ops \"Area\"\nline\x7f");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            r#"Basic realm="Ops 'Area' line ""#
        );
    }
}
