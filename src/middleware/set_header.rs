//! Static response header injection configuration.

use std::collections::HashMap;

use super::headers::{HeaderLayer, parse_header};
use crate::options::{ConfigOption, Configurable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetHeaderConfig {
    pub headers: Option<HashMap<String, String>>,
    /// Replace headers the handler already set.
    pub overwrite: bool,
}

impl Default for SetHeaderConfig {
    fn default() -> Self {
        Self {
            headers: None,
            overwrite: true,
        }
    }
}

impl Configurable for SetHeaderConfig {}

impl SetHeaderConfig {
    pub fn to_layer(&self) -> HeaderLayer {
        let mut pairs: Vec<_> = self
            .headers
            .iter()
            .flatten()
            .filter_map(|(name, value)| parse_header(name, value))
            .collect();
        pairs.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        HeaderLayer::new(pairs, self.overwrite)
    }
}

pub type SetHeaderOption = ConfigOption<SetHeaderConfig>;

pub fn with_headers(headers: impl Into<Option<HashMap<String, String>>>) -> SetHeaderOption {
    let headers = headers.into();
    ConfigOption::new(move |cfg: &mut SetHeaderConfig| cfg.headers = headers.clone())
}

pub fn with_overwrite(overwrite: bool) -> SetHeaderOption {
    ConfigOption::new(move |cfg: &mut SetHeaderConfig| cfg.overwrite = overwrite)
}
