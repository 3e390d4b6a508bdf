//! Functional options shared by every middleware configuration.
//!
//! An option is a small closure that overwrites exactly one field of a
//! configuration value. Options are applied in order, so a later option for
//! the same field wins. Collections are replaced wholesale, never merged.
//!
//! ```rust
//! use middleware_config::middleware::recover::{self, RecoverConfig};
//! use middleware_config::options::Configurable;
//!
//! let cfg = RecoverConfig::from_options(&[
//!     recover::with_stack_size(8192),
//!     recover::with_enable_stack_trace(false),
//! ]);
//! assert_eq!(cfg.stack_size, 8192);
//! assert!(!cfg.enable_stack_trace);
//! ```

use std::fmt;
use std::sync::Arc;

/// A single configuration mutation.
///
/// Cheap to clone and safe to share between threads, so option lists can
/// live in long-lived configuration and be applied more than once.
pub struct ConfigOption<T> {
    apply: Arc<dyn Fn(&mut T) + Send + Sync>,
}

impl<T> ConfigOption<T> {
    /// Wrap a closure as an option.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self { apply: Arc::new(f) }
    }

    /// Apply this option to a configuration value.
    #[inline]
    pub fn apply(&self, config: &mut T) {
        (self.apply)(config)
    }
}

impl<T> Clone for ConfigOption<T> {
    fn clone(&self) -> Self {
        Self {
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<T> fmt::Debug for ConfigOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfigOption(..)")
    }
}

/// Apply `options` to `config` in slice order and return the result.
pub fn apply_options<T>(mut config: T, options: &[ConfigOption<T>]) -> T {
    for option in options {
        option.apply(&mut config);
    }
    config
}

/// A configuration with a default value that options can be layered onto.
pub trait Configurable: Default + Sized {
    /// Start from `Self::default()` and apply `options` in order.
    fn from_options(options: &[ConfigOption<Self>]) -> Self {
        apply_options(Self::default(), options)
    }

    /// Apply `options` onto an existing value.
    fn with_options(self, options: &[ConfigOption<Self>]) -> Self {
        apply_options(self, options)
    }
}
