//! Demo router wired from resolved middleware configuration.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← request logger config (level, skip paths)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← propagates or generates, echoes on the response
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Response Headers │ ← security headers, then custom headers
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← preflight answered before authentication
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Basic Auth     │ ← 401 unless exempt (only with a validator)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Body Limit     │ ← configured status above the size limit
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! `/health` additionally carries the no-cache headers.

use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::config::Middlewares;
use crate::middleware::{BasicAuthLayer, RequestIdLayer};

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the demo router with every consuming layer applied.
pub fn build_router(middlewares: &Middlewares) -> Router {
    let mut router = Router::new().route(
        "/health",
        get(health_check).layer(middlewares.no_cache.to_layer()),
    );

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(
        limit = middlewares.body_limit.limit,
        "Request body size limit configured"
    );
    router = router.layer(middlewares.body_limit.to_layer());

    // 2. Basic auth (only when credentials can be checked)
    if middlewares.basic_auth.validator.is_some() {
        info!(realm = %middlewares.basic_auth.realm, "Basic authentication enabled");
        router = router.layer(BasicAuthLayer::new(middlewares.basic_auth.clone()));
    } else {
        info!("Basic authentication disabled (no credential validator)");
    }

    // 3. CORS
    router = router.layer(middlewares.cors.to_layer());

    // 4. Response headers
    router = router
        .layer(middlewares.set_header.to_layer())
        .layer(middlewares.security_headers.to_layer());

    // 5. Request ID
    router = router.layer(RequestIdLayer::new(&middlewares.request_id));

    // 6. Tracing - applied last, runs first
    let span_logger = middlewares.request_logger.clone();
    let response_logger = middlewares.request_logger.clone();
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(move |req: &Request<Body>| span_logger.span_for(req))
            .on_response(move |res: &Response<Body>, latency: Duration, span: &Span| {
                response_logger.on_response(res, latency, span)
            }),
    )
}
