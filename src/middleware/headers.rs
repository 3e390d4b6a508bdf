//! Header injection layer shared by the no-cache, security-header and
//! set-header configurations.
//!
//! ```text
//! Request ─► strip `remove_request` headers ─► inner service ─► set `response` headers
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::warn;

/// Parse a header pair, logging and skipping anything invalid.
pub(crate) fn parse_header(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let parsed_name = HeaderName::from_bytes(name.as_bytes());
    let parsed_value = HeaderValue::from_str(value);
    match (parsed_name, parsed_value) {
        (Ok(n), Ok(v)) => Some((n, v)),
        _ => {
            warn!(header = %name, "Invalid header name or value, skipping");
            None
        }
    }
}

#[derive(Debug, Default)]
struct HeaderRules {
    remove_request: Vec<HeaderName>,
    response: Vec<(HeaderName, HeaderValue)>,
    overwrite: bool,
}

/// Adds response headers and strips request headers.
#[derive(Debug, Clone)]
pub struct HeaderLayer {
    rules: Arc<HeaderRules>,
}

impl HeaderLayer {
    /// Response headers set on every response.
    ///
    /// With `overwrite == false` a header the handler already set is kept.
    pub fn new(response: Vec<(HeaderName, HeaderValue)>, overwrite: bool) -> Self {
        Self {
            rules: Arc::new(HeaderRules {
                remove_request: Vec::new(),
                response,
                overwrite,
            }),
        }
    }

    /// Also remove these headers from incoming requests.
    pub fn removing_request_headers(self, names: Vec<HeaderName>) -> Self {
        let rules = HeaderRules {
            remove_request: names,
            response: self.rules.response.clone(),
            overwrite: self.rules.overwrite,
        };
        Self {
            rules: Arc::new(rules),
        }
    }

    pub fn response_headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.rules.response
    }

    pub fn removed_request_headers(&self) -> &[HeaderName] {
        &self.rules.remove_request
    }
}

impl<S> Layer<S> for HeaderLayer {
    type Service = HeaderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HeaderService {
            inner,
            rules: self.rules.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeaderService<S> {
    inner: S,
    rules: Arc<HeaderRules>,
}

impl<S> Service<Request<Body>> for HeaderService<S>
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
        for name in &self.rules.remove_request {
            req.headers_mut().remove(name);
        }

        let rules = self.rules.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            let headers = response.headers_mut();
            for (name, value) in &rules.response {
                if rules.overwrite || !headers.contains_key(name) {
                    headers.insert(name.clone(), value.clone());
                }
            }
            Ok(response)
        })
    }
}
