//! Panic recovery configuration.

use crate::options::{ConfigOption, Configurable};

/// Default size of the captured stack trace buffer (4 KiB).
pub const DEFAULT_STACK_SIZE: i64 = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverConfig {
    /// Maximum bytes of stack trace to capture.
    pub stack_size: i64,
    /// Capture and log a stack trace when a handler panics.
    pub enable_stack_trace: bool,
    /// Status returned after a recovered panic.
    pub status_code: u16,
}

impl Default for RecoverConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            enable_stack_trace: true,
            status_code: 500,
        }
    }
}

impl Configurable for RecoverConfig {}

impl RecoverConfig {
    /// Truncate a captured trace to `stack_size` bytes on a char boundary.
    ///
    /// Returns an empty string when stack traces are disabled or the size
    /// is not positive.
    pub fn truncate_trace<'a>(&self, trace: &'a str) -> &'a str {
        if !self.enable_stack_trace || self.stack_size <= 0 {
            return "";
        }
        let limit = usize::try_from(self.stack_size).unwrap_or(usize::MAX);
        if trace.len() <= limit {
            return trace;
        }
        let mut end = limit;
        while !trace.is_char_boundary(end) {
            end -= 1;
        }
        &trace[..end]
    }
}

pub type RecoverOption = ConfigOption<RecoverConfig>;

pub fn with_stack_size(stack_size: i64) -> RecoverOption {
    ConfigOption::new(move |cfg: &mut RecoverConfig| cfg.stack_size = stack_size)
}

pub fn with_enable_stack_trace(enable: bool) -> RecoverOption {
    ConfigOption::new(move |cfg: &mut RecoverConfig| cfg.enable_stack_trace = enable)
}

pub fn with_status_code(status_code: u16) -> RecoverOption {
    ConfigOption::new(move |cfg: &mut RecoverConfig| cfg.status_code = status_code)
}
