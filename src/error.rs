use thiserror::Error;

/// Errors produced while loading or validating configuration.
///
/// Applying options never fails. These errors only come from parsing
/// environment values, the `FromStr` impls of configuration enums, and the
/// opt-in `validate()` checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::InvalidValue`] error.
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
