//! # Middleware Config
//!
//! Configuration for a toolkit of HTTP middlewares, built on functional
//! options:
//!
//! - **Fresh defaults**: every config's `Default` builds a new value
//! - **Functional options**: `with_<field>` constructors, applied in order,
//!   last write wins, collections replaced wholesale
//! - **Nil vs empty**: `None` and `Some(vec![])` stay distinct
//! - **Strategy hooks**: key extractors, IP extractors, failure classifiers,
//!   id generators and credential validators as traits with closure impls
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Config (server settings + one option list per middleware)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config::build() → Middlewares (resolved configs)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layers (request id, headers, basic auth, CORS, body limit) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Axum router                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use middleware_config::middleware::rate_limit::{self, RateLimitAlgorithm};
//! use middleware_config::{Config, ConfigResult, build_router};
//!
//! fn main() -> ConfigResult<()> {
//!     let mut config = Config::from_env()?;
//!     config.rate_limit_options.extend([
//!         rate_limit::with_rate(50),
//!         rate_limit::with_algorithm(RateLimitAlgorithm::SlidingWindow),
//!     ]);
//!
//!     let middlewares = config.build();
//!     middlewares.validate()?;
//!
//!     let _app = build_router(&middlewares);
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Configuration
//!
//! ```bash
//! PORT=8080 RATE_LIMIT_RATE=50 CORS_ALLOWED_ORIGINS=https://app.example.com cargo run
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod options;
pub mod routes;
pub mod utils;

// Re-exports for convenience
pub use config::{AutoTlsConfig, Config, Middlewares, ServerConfig, TlsConfig};
pub use error::{ConfigError, ConfigResult};
pub use options::{ConfigOption, Configurable, apply_options};
pub use routes::build_router;
