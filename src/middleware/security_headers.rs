//! Security response headers configuration.
//!
//! Empty strings and a zero HSTS max-age switch the corresponding header off.
//! HSTS is only meaningful over TLS; the consumer decides when to send it.

use super::headers::{HeaderLayer, parse_header};
use crate::options::{ConfigOption, Configurable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeadersConfig {
    /// `X-XSS-Protection`
    pub xss_protection: String,
    /// `X-Content-Type-Options`
    pub content_type_nosniff: String,
    /// `X-Frame-Options`
    pub x_frame_options: String,
    /// `Strict-Transport-Security` max-age in seconds.
    pub hsts_max_age: i64,
    pub hsts_exclude_subdomains: bool,
    pub hsts_preload: bool,
    pub content_security_policy: String,
    /// Send the policy as `Content-Security-Policy-Report-Only`.
    pub csp_report_only: bool,
    pub referrer_policy: String,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            xss_protection: "1; mode=block".to_string(),
            content_type_nosniff: "nosniff".to_string(),
            x_frame_options: "SAMEORIGIN".to_string(),
            hsts_max_age: 0,
            hsts_exclude_subdomains: false,
            hsts_preload: false,
            content_security_policy: String::new(),
            csp_report_only: false,
            referrer_policy: String::new(),
        }
    }
}

impl Configurable for SecurityHeadersConfig {}

impl SecurityHeadersConfig {
    /// `Strict-Transport-Security` value, if enabled.
    pub fn hsts_value(&self) -> Option<String> {
        if self.hsts_max_age <= 0 {
            return None;
        }
        let mut value = format!("max-age={}", self.hsts_max_age);
        if !self.hsts_exclude_subdomains {
            value.push_str("; includeSubdomains");
        }
        if self.hsts_preload {
            value.push_str("; preload");
        }
        Some(value)
    }

    /// Header pairs this config produces, in a stable order.
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |name: &'static str, value: &str| {
            if !value.is_empty() {
                pairs.push((name, value.to_string()));
            }
        };

        push("X-XSS-Protection", &self.xss_protection);
        push("X-Content-Type-Options", &self.content_type_nosniff);
        push("X-Frame-Options", &self.x_frame_options);
        if let Some(hsts) = self.hsts_value() {
            push("Strict-Transport-Security", &hsts);
        }
        let csp_header = if self.csp_report_only {
            "Content-Security-Policy-Report-Only"
        } else {
            "Content-Security-Policy"
        };
        push(csp_header, &self.content_security_policy);
        push("Referrer-Policy", &self.referrer_policy);
        pairs
    }

    /// Header layer applying this config. Headers set by handlers are kept.
    pub fn to_layer(&self) -> HeaderLayer {
        let pairs = self
            .header_pairs()
            .into_iter()
            .filter_map(|(name, value)| parse_header(name, &value))
            .collect();
        HeaderLayer::new(pairs, false)
    }
}

pub type SecurityHeadersOption = ConfigOption<SecurityHeadersConfig>;

pub fn with_xss_protection(value: impl Into<String>) -> SecurityHeadersOption {
    let value = value.into();
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| cfg.xss_protection = value.clone())
}

pub fn with_content_type_nosniff(value: impl Into<String>) -> SecurityHeadersOption {
    let value = value.into();
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| {
        cfg.content_type_nosniff = value.clone()
    })
}

pub fn with_x_frame_options(value: impl Into<String>) -> SecurityHeadersOption {
    let value = value.into();
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| cfg.x_frame_options = value.clone())
}

pub fn with_hsts_max_age(seconds: i64) -> SecurityHeadersOption {
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| cfg.hsts_max_age = seconds)
}

pub fn with_hsts_exclude_subdomains(exclude: bool) -> SecurityHeadersOption {
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| {
        cfg.hsts_exclude_subdomains = exclude
    })
}

pub fn with_hsts_preload(preload: bool) -> SecurityHeadersOption {
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| cfg.hsts_preload = preload)
}

pub fn with_content_security_policy(policy: impl Into<String>) -> SecurityHeadersOption {
    let policy = policy.into();
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| {
        cfg.content_security_policy = policy.clone()
    })
}

pub fn with_csp_report_only(report_only: bool) -> SecurityHeadersOption {
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| cfg.csp_report_only = report_only)
}

pub fn with_referrer_policy(policy: impl Into<String>) -> SecurityHeadersOption {
    let policy = policy.into();
    ConfigOption::new(move |cfg: &mut SecurityHeadersConfig| cfg.referrer_policy = policy.clone())
}
