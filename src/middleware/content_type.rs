//! Allowed request `Content-Type` configuration.

use crate::options::{ConfigOption, Configurable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeConfig {
    /// Accepted media types, compared case-insensitively without parameters.
    pub allowed_types: Option<Vec<String>>,
    /// Response status for other types (415 Unsupported Media Type).
    pub status_code: u16,
}

impl Default for ContentTypeConfig {
    fn default() -> Self {
        Self {
            allowed_types: Some(vec!["application/json".to_string()]),
            status_code: 415,
        }
    }
}

impl Configurable for ContentTypeConfig {}

impl ContentTypeConfig {
    pub fn allows(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        self.allowed_types
            .as_deref()
            .is_some_and(|types| types.iter().any(|t| t.trim().eq_ignore_ascii_case(essence)))
    }
}

pub type ContentTypeOption = ConfigOption<ContentTypeConfig>;

pub fn with_allowed_types(types: impl Into<Option<Vec<String>>>) -> ContentTypeOption {
    let types = types.into();
    ConfigOption::new(move |cfg: &mut ContentTypeConfig| cfg.allowed_types = types.clone())
}

pub fn with_status_code(status_code: u16) -> ContentTypeOption {
    ConfigOption::new(move |cfg: &mut ContentTypeConfig| cfg.status_code = status_code)
}
