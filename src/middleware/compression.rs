//! Response compression configuration.
//!
//! Only the knobs live here; encoding itself belongs to the consumer.

use crate::options::{ConfigOption, Configurable};

/// Default compression level (zlib scale).
pub const DEFAULT_LEVEL: i32 = 6;

/// MIME types compressed by default.
pub const DEFAULT_MIME_TYPES: [&str; 11] = [
    "text/html",
    "text/css",
    "text/plain",
    "text/javascript",
    "text/xml",
    "application/javascript",
    "application/x-javascript",
    "application/json",
    "application/xml",
    "application/rss+xml",
    "image/svg+xml",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    pub level: i32,
    /// Accepted `Content-Encoding` values, in preference order.
    pub encodings: Option<Vec<String>>,
    pub mime_types: Option<Vec<String>>,
    /// Bodies shorter than this are sent uncompressed.
    pub min_length: i64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            encodings: Some(vec!["gzip".to_string(), "deflate".to_string()]),
            mime_types: Some(DEFAULT_MIME_TYPES.iter().map(|m| m.to_string()).collect()),
            min_length: 0,
        }
    }
}

impl Configurable for CompressionConfig {}

impl CompressionConfig {
    /// Whether a response of `content_type` is eligible. Parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn is_compressible(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        self.mime_types
            .as_deref()
            .is_some_and(|types| types.iter().any(|t| t.eq_ignore_ascii_case(essence)))
    }
}

pub type CompressionOption = ConfigOption<CompressionConfig>;

pub fn with_level(level: i32) -> CompressionOption {
    ConfigOption::new(move |cfg: &mut CompressionConfig| cfg.level = level)
}

pub fn with_encodings(encodings: impl Into<Option<Vec<String>>>) -> CompressionOption {
    let encodings = encodings.into();
    ConfigOption::new(move |cfg: &mut CompressionConfig| cfg.encodings = encodings.clone())
}

pub fn with_mime_types(mime_types: impl Into<Option<Vec<String>>>) -> CompressionOption {
    let mime_types = mime_types.into();
    ConfigOption::new(move |cfg: &mut CompressionConfig| cfg.mime_types = mime_types.clone())
}

pub fn with_min_length(min_length: i64) -> CompressionOption {
    ConfigOption::new(move |cfg: &mut CompressionConfig| cfg.min_length = min_length)
}
