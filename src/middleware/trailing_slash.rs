//! Trailing slash normalization configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::options::{ConfigOption, Configurable};

/// What to do with a path whose trailing slash does not match the preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashAction {
    /// Answer with a redirect to the normalized path.
    #[default]
    Redirect,
    /// Rewrite the path internally and continue.
    Rewrite,
}

impl fmt::Display for SlashAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlashAction::Redirect => write!(f, "redirect"),
            SlashAction::Rewrite => write!(f, "rewrite"),
        }
    }
}

impl FromStr for SlashAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(SlashAction::Redirect),
            "rewrite" => Ok(SlashAction::Rewrite),
            other => Err(ConfigError::invalid(
                "trailing slash action",
                format!("unknown action '{other}', expected redirect or rewrite"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingSlashConfig {
    pub action: SlashAction,
    /// `true`: `/a` → `/a/`. `false`: `/a/` → `/a`.
    pub prefer_trailing_slash: bool,
    pub redirect_code: u16,
}

impl Default for TrailingSlashConfig {
    fn default() -> Self {
        Self {
            action: SlashAction::Redirect,
            prefer_trailing_slash: false,
            redirect_code: 301,
        }
    }
}

impl Configurable for TrailingSlashConfig {}

impl TrailingSlashConfig {
    /// Normalized form of `path`, or `None` if it already matches.
    /// The root path `/` is never changed.
    pub fn normalize(&self, path: &str) -> Option<String> {
        if path == "/" || path.is_empty() {
            return None;
        }
        let has_slash = path.ends_with('/');
        match (self.prefer_trailing_slash, has_slash) {
            (true, false) => Some(format!("{path}/")),
            (false, true) => {
                let trimmed = path.trim_end_matches('/');
                Some(if trimmed.is_empty() {
                    "/".to_string()
                } else {
                    trimmed.to_string()
                })
            }
            _ => None,
        }
    }
}

pub type TrailingSlashOption = ConfigOption<TrailingSlashConfig>;

pub fn with_action(action: SlashAction) -> TrailingSlashOption {
    ConfigOption::new(move |cfg: &mut TrailingSlashConfig| cfg.action = action)
}

pub fn with_prefer_trailing_slash(prefer: bool) -> TrailingSlashOption {
    ConfigOption::new(move |cfg: &mut TrailingSlashConfig| cfg.prefer_trailing_slash = prefer)
}

pub fn with_redirect_code(code: u16) -> TrailingSlashOption {
    ConfigOption::new(move |cfg: &mut TrailingSlashConfig| cfg.redirect_code = code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TrailingSlashConfig::default();
        assert_eq!(cfg.action, SlashAction::Redirect);
        assert!(!cfg.prefer_trailing_slash);
        assert_eq!(cfg.redirect_code, 301);
    }

    #[test]
    fn test_normalize_strip() {
        let cfg = TrailingSlashConfig::default();
        assert_eq!(cfg.normalize("/users/").as_deref(), Some("/users"));
        assert_eq!(cfg.normalize("/users//").as_deref(), Some("/users"));
        assert_eq!(cfg.normalize("/users"), None);
        assert_eq!(cfg.normalize("/"), None);
    }

    #[test]
    fn test_normalize_add() {
        let cfg = TrailingSlashConfig::from_options(&[with_prefer_trailing_slash(true)]);
        assert_eq!(cfg.normalize("/users").as_deref(), Some("/users/"));
        assert_eq!(cfg.normalize("/users/"), None);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("Rewrite".parse::<SlashAction>().unwrap(), SlashAction::Rewrite);
        assert!("drop".parse::<SlashAction>().is_err());
    }
}
