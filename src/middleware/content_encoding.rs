//! Allowed request `Content-Encoding` configuration.

use crate::options::{ConfigOption, Configurable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEncodingConfig {
    pub encodings: Option<Vec<String>>,
    pub status_code: u16,
}

impl Default for ContentEncodingConfig {
    fn default() -> Self {
        Self {
            encodings: Some(vec!["gzip".to_string(), "deflate".to_string()]),
            status_code: 415,
        }
    }
}

impl Configurable for ContentEncodingConfig {}

impl ContentEncodingConfig {
    /// Every coding listed in a `Content-Encoding` value must be allowed.
    pub fn allows(&self, content_encoding: &str) -> bool {
        let Some(allowed) = self.encodings.as_deref() else {
            return false;
        };
        content_encoding
            .split(',')
            .map(str::trim)
            .filter(|coding| !coding.is_empty())
            .all(|coding| allowed.iter().any(|a| a.eq_ignore_ascii_case(coding)))
    }
}

pub type ContentEncodingOption = ConfigOption<ContentEncodingConfig>;

pub fn with_encodings(encodings: impl Into<Option<Vec<String>>>) -> ContentEncodingOption {
    let encodings = encodings.into();
    ConfigOption::new(move |cfg: &mut ContentEncodingConfig| cfg.encodings = encodings.clone())
}

pub fn with_status_code(status_code: u16) -> ContentEncodingOption {
    ConfigOption::new(move |cfg: &mut ContentEncodingConfig| cfg.status_code = status_code)
}
