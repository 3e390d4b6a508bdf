//! Allowed request charset configuration.

use crate::options::{ConfigOption, Configurable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCharsetConfig {
    pub charsets: Option<Vec<String>>,
    pub status_code: u16,
}

impl Default for ContentCharsetConfig {
    fn default() -> Self {
        Self {
            charsets: Some(vec!["utf-8".to_string()]),
            status_code: 415,
        }
    }
}

impl Configurable for ContentCharsetConfig {}

impl ContentCharsetConfig {
    /// Check the `charset` parameter of a `Content-Type` value.
    ///
    /// A value without a charset parameter matches when an empty string is in
    /// the allowlist.
    pub fn allows(&self, content_type: &str) -> bool {
        let charset = content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'))
            .unwrap_or_default();

        self.charsets
            .as_deref()
            .is_some_and(|allowed| allowed.iter().any(|c| c.eq_ignore_ascii_case(charset)))
    }
}

pub type ContentCharsetOption = ConfigOption<ContentCharsetConfig>;

pub fn with_charsets(charsets: impl Into<Option<Vec<String>>>) -> ContentCharsetOption {
    let charsets = charsets.into();
    ConfigOption::new(move |cfg: &mut ContentCharsetConfig| cfg.charsets = charsets.clone())
}

pub fn with_status_code(status_code: u16) -> ContentCharsetOption {
    ConfigOption::new(move |cfg: &mut ContentCharsetConfig| cfg.status_code = status_code)
}
