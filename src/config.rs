//! Aggregated middleware configuration.
//!
//! [`Config`] holds one option list per middleware plus pass-through server
//! settings. [`Config::build`] applies each list, in order, onto that
//! middleware's defaults and returns the resolved [`Middlewares`].
//!
//! # Environment Overrides
//!
//! [`Config::from_env`] reads a `.env` file if present and then:
//!
//! - Server: `HOST`, `PORT`, `SHUTDOWN_TIMEOUT_SECS`
//! - TLS: `TLS_CERT_FILE` + `TLS_KEY_FILE`, or `AUTO_TLS_DOMAINS` (comma-separated)
//!   with optional `AUTO_TLS_CACHE_DIR`
//! - Rate limiting: `RATE_LIMIT_RATE`, `RATE_LIMIT_WINDOW_SECS`, `RATE_LIMIT_ALGORITHM`
//! - Circuit breaker: `CIRCUIT_BREAKER_FAILURE_THRESHOLD`,
//!   `CIRCUIT_BREAKER_SUCCESS_THRESHOLD`, `CIRCUIT_BREAKER_RECOVERY_TIMEOUT_SECS`
//! - `CORS_ALLOWED_ORIGINS`, `TRUSTED_PROXIES` (comma-separated)
//! - `REQUEST_BODY_LIMIT` (bytes, negative disables), `REQUEST_TIMEOUT_SECS`
//!
//! Overrides are appended to the option lists, so options pushed afterwards
//! still win. Empty values count as unset.

use std::env;
use std::time::Duration;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::middleware::basic_auth::{BasicAuthConfig, BasicAuthOption};
use crate::middleware::body_limit::{self, BodyLimitConfig, BodyLimitOption};
use crate::middleware::circuit_breaker::{self, CircuitBreakerConfig, CircuitBreakerOption};
use crate::middleware::compression::{CompressionConfig, CompressionOption};
use crate::middleware::content_charset::{ContentCharsetConfig, ContentCharsetOption};
use crate::middleware::content_encoding::{ContentEncodingConfig, ContentEncodingOption};
use crate::middleware::content_type::{ContentTypeConfig, ContentTypeOption};
use crate::middleware::cors::{self, CorsConfig, CorsOption};
use crate::middleware::no_cache::{NoCacheConfig, NoCacheOption};
use crate::middleware::rate_limit::{self, RateLimitAlgorithm, RateLimitConfig, RateLimitOption};
use crate::middleware::real_ip::{self, CidrRange, RealIpConfig, RealIpOption};
use crate::middleware::recover::{RecoverConfig, RecoverOption};
use crate::middleware::request_id::{RequestIdConfig, RequestIdOption};
use crate::middleware::request_logger::{RequestLoggerConfig, RequestLoggerOption};
use crate::middleware::security_headers::{SecurityHeadersConfig, SecurityHeadersOption};
use crate::middleware::set_header::{SetHeaderConfig, SetHeaderOption};
use crate::middleware::timeout::{self, TimeoutConfig, TimeoutOption};
use crate::middleware::trailing_slash::{TrailingSlashConfig, TrailingSlashOption};
use crate::options::Configurable;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default time allowed for in-flight requests after a shutdown signal.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Manually provisioned certificate files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_file: String,
    pub key_file: String,
}

/// Automatically managed certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTlsConfig {
    pub domains: Vec<String>,
    /// Where issued certificates are cached between restarts.
    pub cache_dir: Option<String>,
}

/// Listener settings. The crate passes these through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
    pub auto_tls: Option<AutoTlsConfig>,
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            auto_tls: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check TLS settings for consistency.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Tls` if a certificate is given without its key
    /// (or the reverse), if manual and automatic TLS are both configured, or
    /// if automatic TLS has no domains.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(tls) = &self.tls
            && (tls.cert_file.is_empty() || tls.key_file.is_empty())
        {
            return Err(ConfigError::Tls(
                "certificate and key files must be provided together".to_string(),
            ));
        }

        if let Some(auto_tls) = &self.auto_tls {
            if self.tls.is_some() {
                return Err(ConfigError::Tls(
                    "manual certificates and automatic TLS are mutually exclusive".to_string(),
                ));
            }
            if auto_tls.domains.is_empty() {
                return Err(ConfigError::Tls(
                    "automatic TLS requires at least one domain".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Option lists for every middleware plus server settings.
///
/// # Example
///
/// ```rust
/// use middleware_config::Config;
/// use middleware_config::middleware::recover;
///
/// let mut config = Config::default();
/// config.recover_options.push(recover::with_stack_size(8192));
///
/// let middlewares = config.build();
/// assert_eq!(middlewares.recover.stack_size, 8192);
/// assert!(middlewares.recover.enable_stack_trace);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,

    // Policies
    pub rate_limit_options: Vec<RateLimitOption>,
    pub circuit_breaker_options: Vec<CircuitBreakerOption>,

    // Request shaping
    pub basic_auth_options: Vec<BasicAuthOption>,
    pub body_limit_options: Vec<BodyLimitOption>,
    pub content_charset_options: Vec<ContentCharsetOption>,
    pub content_encoding_options: Vec<ContentEncodingOption>,
    pub content_type_options: Vec<ContentTypeOption>,
    pub real_ip_options: Vec<RealIpOption>,
    pub timeout_options: Vec<TimeoutOption>,
    pub trailing_slash_options: Vec<TrailingSlashOption>,

    // Response shaping
    pub compression_options: Vec<CompressionOption>,
    pub cors_options: Vec<CorsOption>,
    pub no_cache_options: Vec<NoCacheOption>,
    pub security_headers_options: Vec<SecurityHeadersOption>,
    pub set_header_options: Vec<SetHeaderOption>,

    // Observability and safety
    pub recover_options: Vec<RecoverOption>,
    pub request_id_options: Vec<RequestIdOption>,
    pub request_logger_options: Vec<RequestLoggerOption>,
}

/// Resolved configuration for every middleware.
#[derive(Debug, Clone)]
pub struct Middlewares {
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub basic_auth: BasicAuthConfig,
    pub body_limit: BodyLimitConfig,
    pub content_charset: ContentCharsetConfig,
    pub content_encoding: ContentEncodingConfig,
    pub content_type: ContentTypeConfig,
    pub real_ip: RealIpConfig,
    pub timeout: TimeoutConfig,
    pub trailing_slash: TrailingSlashConfig,
    pub compression: CompressionConfig,
    pub cors: CorsConfig,
    pub no_cache: NoCacheConfig,
    pub security_headers: SecurityHeadersConfig,
    pub set_header: SetHeaderConfig,
    pub recover: RecoverConfig,
    pub request_id: RequestIdConfig,
    pub request_logger: RequestLoggerConfig,
}

impl Config {
    /// Load server settings and middleware overrides from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable values and
    /// `ConfigError::Tls` for a certificate without a key (or the reverse).
    pub fn from_env() -> ConfigResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reading variables through `lookup`.
    pub fn from_source<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource(lookup);

        let server = ServerConfig {
            host: env.get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env.parse("PORT")?.unwrap_or(DEFAULT_PORT),
            tls: Self::parse_tls(&env)?,
            auto_tls: Self::parse_auto_tls(&env)?,
            shutdown_timeout: env
                .parse("SHUTDOWN_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        };

        let mut config = Self {
            server,
            ..Self::default()
        };

        // Rate limiting
        if let Some(rate) = env.parse::<i64>("RATE_LIMIT_RATE")? {
            config.rate_limit_options.push(rate_limit::with_rate(rate));
        }
        if let Some(secs) = env.parse::<u64>("RATE_LIMIT_WINDOW_SECS")? {
            config
                .rate_limit_options
                .push(rate_limit::with_window(Duration::from_secs(secs)));
        }
        if let Some(algorithm) = env.parse::<RateLimitAlgorithm>("RATE_LIMIT_ALGORITHM")? {
            config
                .rate_limit_options
                .push(rate_limit::with_algorithm(algorithm));
        }

        // Circuit breaker
        if let Some(n) = env.parse::<i64>("CIRCUIT_BREAKER_FAILURE_THRESHOLD")? {
            config
                .circuit_breaker_options
                .push(circuit_breaker::with_failure_threshold(n));
        }
        if let Some(n) = env.parse::<i64>("CIRCUIT_BREAKER_SUCCESS_THRESHOLD")? {
            config
                .circuit_breaker_options
                .push(circuit_breaker::with_success_threshold(n));
        }
        if let Some(secs) = env.parse::<u64>("CIRCUIT_BREAKER_RECOVERY_TIMEOUT_SECS")? {
            config
                .circuit_breaker_options
                .push(circuit_breaker::with_recovery_timeout(Duration::from_secs(secs)));
        }

        // Request handling
        if let Some(origins) = env.list("CORS_ALLOWED_ORIGINS") {
            config.cors_options.push(cors::with_allowed_origins(origins));
        }
        if let Some(limit) = env.parse::<i64>("REQUEST_BODY_LIMIT")? {
            config.body_limit_options.push(body_limit::with_limit(limit));
        }
        if let Some(secs) = env.parse::<u64>("REQUEST_TIMEOUT_SECS")? {
            config
                .timeout_options
                .push(timeout::with_timeout(Duration::from_secs(secs)));
        }
        if let Some(proxies) = env.list("TRUSTED_PROXIES") {
            config
                .real_ip_options
                .push(real_ip::with_trusted_proxies(proxies));
        }

        debug!(
            rate_limit = config.rate_limit_options.len(),
            circuit_breaker = config.circuit_breaker_options.len(),
            cors = config.cors_options.len(),
            body_limit = config.body_limit_options.len(),
            timeout = config.timeout_options.len(),
            real_ip = config.real_ip_options.len(),
            "Environment overrides loaded"
        );

        Ok(config)
    }

    fn parse_tls<F>(env: &EnvSource<F>) -> ConfigResult<Option<TlsConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        match (env.get("TLS_CERT_FILE"), env.get("TLS_KEY_FILE")) {
            (Some(cert_file), Some(key_file)) => Ok(Some(TlsConfig {
                cert_file,
                key_file,
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::Tls(
                "TLS_CERT_FILE and TLS_KEY_FILE must be set together".to_string(),
            )),
        }
    }

    fn parse_auto_tls<F>(env: &EnvSource<F>) -> ConfigResult<Option<AutoTlsConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_dir = env.get("AUTO_TLS_CACHE_DIR");
        match env.list("AUTO_TLS_DOMAINS") {
            Some(domains) if !domains.is_empty() => Ok(Some(AutoTlsConfig { domains, cache_dir })),
            _ if cache_dir.is_some() => Err(ConfigError::Tls(
                "AUTO_TLS_CACHE_DIR requires AUTO_TLS_DOMAINS".to_string(),
            )),
            _ => Ok(None),
        }
    }

    /// Apply every option list onto its middleware's defaults.
    ///
    /// Never fails and performs no validation; see [`Middlewares::validate`].
    pub fn build(&self) -> Middlewares {
        Middlewares {
            rate_limit: RateLimitConfig::from_options(&self.rate_limit_options),
            circuit_breaker: CircuitBreakerConfig::from_options(&self.circuit_breaker_options),
            basic_auth: BasicAuthConfig::from_options(&self.basic_auth_options),
            body_limit: BodyLimitConfig::from_options(&self.body_limit_options),
            content_charset: ContentCharsetConfig::from_options(&self.content_charset_options),
            content_encoding: ContentEncodingConfig::from_options(&self.content_encoding_options),
            content_type: ContentTypeConfig::from_options(&self.content_type_options),
            real_ip: RealIpConfig::from_options(&self.real_ip_options),
            timeout: TimeoutConfig::from_options(&self.timeout_options),
            trailing_slash: TrailingSlashConfig::from_options(&self.trailing_slash_options),
            compression: CompressionConfig::from_options(&self.compression_options),
            cors: CorsConfig::from_options(&self.cors_options),
            no_cache: NoCacheConfig::from_options(&self.no_cache_options),
            security_headers: SecurityHeadersConfig::from_options(&self.security_headers_options),
            set_header: SetHeaderConfig::from_options(&self.set_header_options),
            recover: RecoverConfig::from_options(&self.recover_options),
            request_id: RequestIdConfig::from_options(&self.request_id_options),
            request_logger: RequestLoggerConfig::from_options(&self.request_logger_options),
        }
    }
}

impl Middlewares {
    /// Opt-in sanity checks on the resolved values.
    ///
    /// `build()` accepts anything; call this when the configuration is about
    /// to drive real middleware.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rate_limit.rate <= 0 {
            return Err(invalid("rate limit rate must be greater than 0"));
        }
        if self.rate_limit.window.is_zero() {
            return Err(invalid("rate limit window must be greater than 0"));
        }
        if self.circuit_breaker.failure_threshold <= 0 {
            return Err(invalid("circuit breaker failure threshold must be greater than 0"));
        }
        if self.circuit_breaker.success_threshold <= 0 {
            return Err(invalid("circuit breaker success threshold must be greater than 0"));
        }

        let status_codes = [
            ("rate limit status code", self.rate_limit.status_code),
            ("circuit breaker open status code", self.circuit_breaker.open_status_code),
            ("body limit status code", self.body_limit.status_code),
            ("content charset status code", self.content_charset.status_code),
            ("content encoding status code", self.content_encoding.status_code),
            ("content type status code", self.content_type.status_code),
            ("recover status code", self.recover.status_code),
            ("timeout status code", self.timeout.status_code),
            ("trailing slash redirect code", self.trailing_slash.redirect_code),
        ];
        for (name, code) in status_codes {
            if !(100..=599).contains(&code) {
                return Err(invalid(format!("{name} {code} is not a valid HTTP status")));
            }
        }

        for cidr in self.real_ip.trusted_proxies.iter().flatten() {
            if CidrRange::parse(cidr).is_none() {
                return Err(invalid(format!("invalid trusted proxy CIDR '{cidr}'")));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

/// Variable lookup with the parsing helpers used by [`Config::from_source`].
struct EnvSource<F>(F);

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, `None` when unset or empty.
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Parse an environment variable into the specified type.
    fn parse<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(val) => val
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::invalid(name, format!("{e}"))),
            None => Ok(None),
        }
    }

    /// Comma-separated list with blank entries dropped.
    fn list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
    }
}
