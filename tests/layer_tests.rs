//! End-to-end tests for the layers driven by resolved configuration.
//!
//! Requests are sent through the router with `tower::ServiceExt::oneshot`;
//! no sockets are opened.
//!
//! Run with: `cargo test --test layer_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::routing::{get, post};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tower::ServiceExt;

use middleware_config::middleware::{
    BasicAuthLayer, DefaultIpExtractor, ForwardedForKey, HeaderLayer, IpExtractor, KeyExtractor,
    RequestIdLayer, StaticCredentials, basic_auth, body_limit, cors, no_cache, request_id,
    security_headers, set_header,
};
use middleware_config::{Config, Configurable, build_router};

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn routes() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/health", get(|| async { "healthy" }))
}

// =============================================================================
// Request ID
// =============================================================================

#[tokio::test]
async fn test_request_id_generated() {
    let app = routes().layer(RequestIdLayer::default());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[tokio::test]
async fn test_request_id_propagated() {
    let app = routes().layer(RequestIdLayer::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "client-supplied-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "client-supplied-id"
    );
}

#[tokio::test]
async fn test_request_id_custom_header_and_generator() {
    let cfg = request_id::RequestIdConfig::from_options(&[
        request_id::with_header("X-Correlation-Id"),
        request_id::with_generator(Some(Arc::new(|| "fixed-id".to_string()))),
    ]);
    let app = routes().layer(RequestIdLayer::new(&cfg));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-correlation-id").unwrap(), "fixed-id");
    assert!(!response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_without_generator_only_propagates() {
    let cfg = request_id::RequestIdConfig::from_options(&[request_id::with_generator(None)]);
    let app = routes().layer(RequestIdLayer::new(&cfg));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(!response.headers().contains_key("x-request-id"));
}

// =============================================================================
// Header layers
// =============================================================================

#[tokio::test]
async fn test_no_cache_headers() {
    let app = routes().layer(no_cache::NoCacheConfig::default().to_layer());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("expires").unwrap(), "Thu, 01 Jan 1970 00:00:00 UTC");
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "no-cache, no-store, no-transform, must-revalidate, private, max-age=0"
    );
    assert_eq!(headers.get("pragma").unwrap(), "no-cache");
    assert_eq!(headers.get("x-accel-expires").unwrap(), "0");
}

#[tokio::test]
async fn test_no_cache_strips_etag_request_headers() {
    let app = Router::new()
        .route(
            "/",
            get(|req: Request<Body>| async move {
                req.headers().contains_key("if-none-match").to_string()
            }),
        )
        .layer(no_cache::NoCacheConfig::default().to_layer());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("if-none-match", "\"abc\"")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"false");
}

#[tokio::test]
async fn test_security_headers_defaults() {
    let app = routes().layer(security_headers::SecurityHeadersConfig::default().to_layer());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
    assert!(!headers.contains_key("strict-transport-security"));
    assert!(!headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_security_headers_keep_handler_values() {
    let app = Router::new()
        .route(
            "/",
            get(|| async { ([("x-frame-options", "DENY")], "framed") }),
        )
        .layer(security_headers::SecurityHeadersConfig::default().to_layer());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_set_header_overwrite() {
    let handler = || async { ([("x-powered-by", "handler")], "ok") };

    let overwrite = set_header::SetHeaderConfig::from_options(&[set_header::with_headers(
        HashMap::from([("X-Powered-By".to_string(), "config".to_string())]),
    )]);
    let app = Router::new()
        .route("/", get(handler))
        .layer(overwrite.to_layer());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-powered-by").unwrap(), "config");

    let keep = set_header::SetHeaderConfig {
        overwrite: false,
        ..overwrite
    };
    let app = Router::new().route("/", get(handler)).layer(keep.to_layer());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-powered-by").unwrap(), "handler");
}

#[test]
fn test_invalid_header_entries_are_skipped() {
    let layer = HeaderLayer::new(Vec::new(), true);
    assert!(layer.response_headers().is_empty());

    let cfg = set_header::SetHeaderConfig::from_options(&[set_header::with_headers(
        HashMap::from([
            ("Bad Header".to_string(), "x".to_string()),
            ("X-Good".to_string(), "y".to_string()),
        ]),
    )]);
    assert_eq!(cfg.to_layer().response_headers().len(), 1);
}

// =============================================================================
// Basic auth
// =============================================================================

fn auth_app() -> Router {
    let cfg = basic_auth::BasicAuthConfig::from_options(&[
        basic_auth::with_realm("Admin"),
        basic_auth::with_validator(Some(Arc::new(StaticCredentials::single("admin", "s3cret")))),
        basic_auth::with_exempt_paths(vec!["/health".to_string()]),
    ]);
    routes().layer(BasicAuthLayer::new(cfg))
}

#[tokio::test]
async fn test_basic_auth_accepts_valid_credentials() {
    let response = auth_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("authorization", basic("admin", "s3cret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_basic_auth_rejects_missing_and_wrong_credentials() {
    for header in [None, Some(basic("admin", "wrong")), Some("Bearer x".to_string())] {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let response = auth_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("www-authenticate").unwrap(),
            "Basic realm=\"Admin\""
        );
    }
}

#[tokio::test]
async fn test_basic_auth_exempt_path() {
    let response = auth_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Exact match only
    let response = auth_app()
        .oneshot(Request::builder().uri("/health/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_basic_auth_without_validator_rejects() {
    let app = routes().layer(BasicAuthLayer::new(basic_auth::BasicAuthConfig::default()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("authorization", basic("anyone", "anything"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// CORS and body limit
// =============================================================================

#[tokio::test]
async fn test_cors_preflight_specific_origin() {
    let cfg = cors::CorsConfig::from_options(&[cors::with_allowed_origins(vec![
        "https://app.example.com".to_string(),
    ])]);
    let app = routes().layer(cfg.to_layer());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header("origin", "https://app.example.com")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example.com"
    );
    assert_eq!(response.headers().get("access-control-max-age").unwrap(), "86400");
}

#[tokio::test]
async fn test_cors_wildcard() {
    let app = routes().layer(cors::CorsConfig::default().to_layer());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("origin", "https://anywhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn test_cors_wildcard_lists_with_credentials_mirror_request() {
    let cfg = cors::CorsConfig::from_options(&[
        cors::with_allowed_origins(vec!["https://app.example".to_string()]),
        cors::with_allowed_methods(vec!["*".to_string()]),
        cors::with_allowed_headers(vec!["*".to_string()]),
        cors::with_exposed_headers(vec!["*".to_string(), "X-Total-Count".to_string()]),
        cors::with_allow_credentials(true),
    ]);
    let app = routes().layer(cfg.to_layer());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header("origin", "https://app.example")
                .header("access-control-request-method", "PATCH")
                .header("access-control-request-headers", "x-custom-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    assert_eq!(headers.get("access-control-allow-methods").unwrap(), "PATCH");
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "x-custom-token"
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("origin", "https://app.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-expose-headers").unwrap(),
        "x-total-count"
    );
}

#[tokio::test]
async fn test_body_limit() {
    let cfg = body_limit::BodyLimitConfig::from_options(&[body_limit::with_limit(8)]);
    let app = Router::new()
        .route("/", post(|body: String| async move { body }))
        .layer(cfg.to_layer());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .body(Body::from("tiny"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .body(Body::from("this body is far too large"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_body_limit_custom_status_and_message() {
    let cfg = body_limit::BodyLimitConfig::from_options(&[
        body_limit::with_limit(4),
        body_limit::with_status_code(400),
        body_limit::with_message("too big"),
    ]);
    let app = Router::new()
        .route("/", post(|body: String| async move { body }))
        .layer(cfg.to_layer());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .body(Body::from("0123456789"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"too big");
}

// =============================================================================
// Extractors against real requests
// =============================================================================

#[test]
fn test_default_ip_extractor_priority() {
    let mut req = Request::builder()
        .header("x-forwarded-for", "203.0.113.1, 198.51.100.1")
        .header("x-real-ip", "192.0.2.1")
        .header("x-forwarded", "192.0.2.2")
        .header("forwarded", "for=192.0.2.3")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo("192.0.2.4:5555".parse::<SocketAddr>().unwrap()));

    assert_eq!(DefaultIpExtractor.extract_ip(&req), "203.0.113.1");

    req.headers_mut().remove("x-forwarded-for");
    assert_eq!(DefaultIpExtractor.extract_ip(&req), "192.0.2.1");

    req.headers_mut().remove("x-real-ip");
    assert_eq!(DefaultIpExtractor.extract_ip(&req), "192.0.2.2");

    req.headers_mut().remove("x-forwarded");
    assert_eq!(DefaultIpExtractor.extract_ip(&req), "192.0.2.3");

    req.headers_mut().remove("forwarded");
    assert_eq!(DefaultIpExtractor.extract_ip(&req), "192.0.2.4");
}

#[test]
fn test_forwarded_for_key() {
    let mut req = Request::builder()
        .header("x-forwarded-for", "203.0.113.1, 198.51.100.1")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo("192.0.2.4:5555".parse::<SocketAddr>().unwrap()));

    assert_eq!(ForwardedForKey.extract_key(&req), "203.0.113.1, 198.51.100.1");

    req.headers_mut().remove("x-forwarded-for");
    assert_eq!(ForwardedForKey.extract_key(&req), "192.0.2.4:5555");
}

// =============================================================================
// Full router
// =============================================================================

#[tokio::test]
async fn test_router_health_from_config() {
    let mut config = Config::default();
    config
        .request_id_options
        .push(request_id::with_generator(Some(Arc::new(|| "router-id".to_string()))));
    let app = build_router(&config.build());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-request-id").unwrap(), "router-id");
    assert_eq!(response.headers().get("cache-control").unwrap(), no_cache::CACHE_CONTROL);

    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_router_with_basic_auth() {
    let mut config = Config::default();
    config.basic_auth_options.push(basic_auth::with_validator(Some(Arc::new(
        |user: &str, password: &str| user == "ops" && password == "pw",
    ))));
    let app = build_router(&config.build());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // Request id is outside auth, so even rejections carry one
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("authorization", basic("ops", "pw"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
