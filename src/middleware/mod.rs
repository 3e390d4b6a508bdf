//! Per-middleware configuration modules and the layers that consume them.
//!
//! Every module follows the same shape:
//!
//! - an `XConfig` struct with public fields and a `Default` impl that builds
//!   a fresh value on each call
//! - an `XOption` alias for [`ConfigOption<XConfig>`](crate::options::ConfigOption)
//! - one `with_<field>` constructor per field
//!
//! # Policies
//!
//! - **Rate Limiting**: rate/window/algorithm plus a pluggable key extractor
//! - **Circuit Breaking**: thresholds, recovery timeout, failure classifier
//!
//! # Layers
//!
//! ```text
//! Request → Basic Auth → Request ID → Headers → CORS → Body Limit → Handler
//!              ↓             ↓           ↓
//!          401 Unauth   X-Request-Id  no-cache / security / custom headers
//! ```
//!
//! # Strategy Hooks
//!
//! Function-valued settings are traits with closure blanket impls:
//! [`KeyExtractor`], [`IpExtractor`], [`FailureClassifier`], [`IdGenerator`]
//! and [`CredentialValidator`]. Each is stored as `Option<Arc<dyn Trait>>`.

pub mod basic_auth;
pub mod body_limit;
pub mod circuit_breaker;
pub mod compression;
pub mod content_charset;
pub mod content_encoding;
pub mod content_type;
pub mod cors;
pub mod headers;
pub mod ip;
pub mod keys;
pub mod no_cache;
pub mod rate_limit;
pub mod real_ip;
pub mod recover;
pub mod request_id;
pub mod request_logger;
pub mod security_headers;
pub mod set_header;
pub mod timeout;
pub mod trailing_slash;

pub use basic_auth::{BasicAuthConfig, BasicAuthLayer, CredentialValidator, StaticCredentials};
pub use body_limit::{BodyLimitConfig, BodyLimitLayer};
pub use circuit_breaker::{
    CircuitBreakerConfig, CircuitState, FailureClassifier, ServerErrorClassifier,
};
pub use compression::CompressionConfig;
pub use content_charset::ContentCharsetConfig;
pub use content_encoding::ContentEncodingConfig;
pub use content_type::ContentTypeConfig;
pub use cors::CorsConfig;
pub use headers::HeaderLayer;
pub use ip::{DefaultIpExtractor, IpExtractor};
pub use keys::{ForwardedForKey, KeyExtractor, PathKey};
pub use no_cache::NoCacheConfig;
pub use rate_limit::{RateLimitAlgorithm, RateLimitConfig};
pub use real_ip::{CidrRange, RealIpConfig, TrustedProxies};
pub use recover::RecoverConfig;
pub use request_id::{IdGenerator, RandomHexId, RequestIdConfig, RequestIdExt, RequestIdLayer, UuidV4Id};
pub use request_logger::RequestLoggerConfig;
pub use security_headers::SecurityHeadersConfig;
pub use set_header::SetHeaderConfig;
pub use timeout::{RequestTimeout, RequestTimeoutExt, TimeoutConfig};
pub use trailing_slash::{SlashAction, TrailingSlashConfig};
