//! Request body size limit configuration and layer.
//!
//! ```text
//! Request ─► Content-Length > limit? ──yes──► status_code + message
//!               │ no
//!               ▼
//!          DefaultBodyLimit ─► handler ─► 413 from body extractor? ─► status_code + message
//! ```
//!
//! Any 413 leaving the wrapped service is rewritten, including one a handler
//! produced itself.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::warn;

use crate::options::{ConfigOption, Configurable};

/// Default maximum request body size (1 MiB).
pub const DEFAULT_LIMIT: i64 = 1024 * 1024;

/// Tunables for the body size limit middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLimitConfig {
    /// Maximum accepted body in bytes.
    pub limit: i64,
    /// Response status for oversized bodies (413 Payload Too Large).
    pub status_code: u16,
    pub message: String,
}

impl Default for BodyLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            status_code: 413,
            message: "Request body too large".to_string(),
        }
    }
}

impl Configurable for BodyLimitConfig {}

impl BodyLimitConfig {
    /// Axum extractor limit for this config.
    ///
    /// A negative limit disables the check; a limit beyond `usize` saturates.
    pub fn extractor_limit(&self) -> DefaultBodyLimit {
        match self.max_bytes() {
            Some(max) => DefaultBodyLimit::max(max),
            None => DefaultBodyLimit::disable(),
        }
    }

    /// Limit in bytes, `None` when disabled.
    pub fn max_bytes(&self) -> Option<usize> {
        (self.limit >= 0).then(|| usize::try_from(self.limit).unwrap_or(usize::MAX))
    }

    /// Layer enforcing the limit and answering with `status_code` and `message`.
    pub fn to_layer(&self) -> BodyLimitLayer {
        BodyLimitLayer::new(self)
    }
}

#[derive(Debug)]
struct Rejection {
    max_bytes: Option<usize>,
    status: StatusCode,
    message: String,
}

impl Rejection {
    fn response(&self) -> Response<Body> {
        (
            self.status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message.clone(),
        )
            .into_response()
    }
}

/// Applies [`DefaultBodyLimit`] and maps its rejection to the configured
/// status and message.
#[derive(Debug, Clone)]
pub struct BodyLimitLayer {
    limit: DefaultBodyLimit,
    rejection: Arc<Rejection>,
}

impl BodyLimitLayer {
    pub fn new(config: &BodyLimitConfig) -> Self {
        let status = StatusCode::from_u16(config.status_code).unwrap_or_else(|_| {
            warn!(
                status_code = config.status_code,
                "Invalid body limit status code, using 413"
            );
            StatusCode::PAYLOAD_TOO_LARGE
        });
        Self {
            limit: config.extractor_limit(),
            rejection: Arc::new(Rejection {
                max_bytes: config.max_bytes(),
                status,
                message: config.message.clone(),
            }),
        }
    }
}

impl<S> Layer<S> for BodyLimitLayer {
    type Service = BodyLimitService<<DefaultBodyLimit as Layer<S>>::Service>;

    fn layer(&self, inner: S) -> Self::Service {
        BodyLimitService {
            inner: self.limit.layer(inner),
            rejection: self.rejection.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BodyLimitService<S> {
    inner: S,
    rejection: Arc<Rejection>,
}

impl<S> Service<Request<Body>> for BodyLimitService<S>
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
        let rejection = self.rejection.clone();

        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let (Some(declared), Some(max)) = (declared, rejection.max_bytes)
            && declared > max as u64
        {
            warn!(content_length = declared, limit = max, "Request body too large");
            return Box::pin(async move { Ok(rejection.response()) });
        }

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                warn!(limit = ?rejection.max_bytes, "Request body too large");
                return Ok(rejection.response());
            }
            Ok(response)
        })
    }
}

pub type BodyLimitOption = ConfigOption<BodyLimitConfig>;

pub fn with_limit(limit: i64) -> BodyLimitOption {
    ConfigOption::new(move |cfg: &mut BodyLimitConfig| cfg.limit = limit)
}

pub fn with_status_code(status_code: u16) -> BodyLimitOption {
    ConfigOption::new(move |cfg: &mut BodyLimitConfig| cfg.status_code = status_code)
}

pub fn with_message(message: impl Into<String>) -> BodyLimitOption {
    let message = message.into();
    ConfigOption::new(move |cfg: &mut BodyLimitConfig| cfg.message = message.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::Router;
    use axum::body::to_bytes;
    use axum::http::Method;
    use axum::routing::post;
    use tower::ServiceExt;

    use super::*;

    fn app(cfg: &BodyLimitConfig) -> Router {
        Router::new()
            .route("/", post(|body: String| async move { body }))
            .layer(cfg.to_layer())
    }

    fn post_body(body: &'static str, content_length: Option<usize>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::POST).uri("/");
        if let Some(len) = content_length {
            builder = builder.header(CONTENT_LENGTH, len);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[test]
    fn test_default_limit_is_one_mib() {
        assert_eq!(BodyLimitConfig::default().limit, 1_048_576);
    }

    #[test]
    fn test_with_limit_only_touches_limit() {
        let cfg = BodyLimitConfig::from_options(&[with_limit(10)]);
        assert_eq!(
            cfg,
            BodyLimitConfig {
                limit: 10,
                ..BodyLimitConfig::default()
            }
        );
    }

    #[test]
    fn test_negative_limit_accepted() {
        let cfg = BodyLimitConfig::from_options(&[with_limit(-1)]);
        assert_eq!(cfg.limit, -1);
        // Disabled limit still builds a layer
        let _layer = cfg.to_layer();
    }

    #[test]
    fn test_max_bytes() {
        assert_eq!(BodyLimitConfig::default().max_bytes(), Some(1_048_576));
        assert_eq!(
            BodyLimitConfig::from_options(&[with_limit(0)]).max_bytes(),
            Some(0)
        );
        assert!(
            BodyLimitConfig::from_options(&[with_limit(-1)])
                .max_bytes()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_oversized_streamed_body_uses_configured_rejection() {
        let cfg = BodyLimitConfig::from_options(&[
            with_limit(4),
            with_status_code(400),
            with_message("too big"),
        ]);

        let response = app(&cfg)
            .oneshot(post_body("0123456789", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"too big");
    }

    #[tokio::test]
    async fn test_declared_content_length_rejected_up_front() {
        let cfg = BodyLimitConfig::from_options(&[with_limit(4), with_status_code(422)]);

        let response = app(&cfg)
            .oneshot(post_body("0123456789", Some(10)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Request body too large");
    }

    #[tokio::test]
    async fn test_body_within_limit_passes() {
        let cfg = BodyLimitConfig::from_options(&[with_limit(16), with_status_code(400)]);

        let response = app(&cfg)
            .oneshot(post_body("tiny", Some(4)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"tiny");
    }

    #[tokio::test]
    async fn test_invalid_status_falls_back_to_413() {
        let cfg = BodyLimitConfig::from_options(&[with_limit(2), with_status_code(42)]);

        let response = app(&cfg)
            .oneshot(post_body("0123456789", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
