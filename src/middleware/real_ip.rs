//! Real client IP configuration.
//!
//! Resolves the client IP with a pluggable [`IpExtractor`] and carries the
//! trusted proxy networks a consumer should require before believing
//! forwarding headers.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use tracing::{debug, warn};

use super::ip::{DefaultIpExtractor, IpExtractor};
use crate::options::{ConfigOption, Configurable};

/// Parsed CIDR network range for trusted proxy validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    ///
    /// A bare address is an implicit /32 or /128. Returns `None` if the
    /// format is invalid.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();
        let (ip, prefix_len) = match cidr.split_once('/') {
            Some((ip, prefix)) => {
                let ip: IpAddr = ip.parse().ok()?;
                let prefix_len: u8 = prefix.parse().ok()?;
                (ip, prefix_len)
            }
            None => {
                let ip: IpAddr = cidr.parse().ok()?;
                (ip, max_prefix(&ip))
            }
        };

        if prefix_len > max_prefix(&ip) {
            return None;
        }

        Some(Self {
            network: ip,
            prefix_len,
        })
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check if an IP address is contained within this CIDR range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u32::MAX << (32 - self.prefix_len)
                };
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u128::MAX << (128 - self.prefix_len)
                };
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            // IPv4 and IPv6 don't match
            _ => false,
        }
    }
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Tunables for real IP resolution.
#[derive(Clone)]
pub struct RealIpConfig {
    pub extractor: Option<Arc<dyn IpExtractor>>,
    /// CIDR ranges of reverse proxies whose forwarding headers are believed.
    pub trusted_proxies: Option<Vec<String>>,
}

impl Default for RealIpConfig {
    fn default() -> Self {
        Self {
            extractor: Some(Arc::new(DefaultIpExtractor)),
            trusted_proxies: None,
        }
    }
}

impl Configurable for RealIpConfig {}

impl RealIpConfig {
    /// Client IP for `req`, or `None` when no extractor is configured.
    pub fn client_ip(&self, req: &Request<Body>) -> Option<String> {
        self.extractor.as_ref().map(|e| e.extract_ip(req))
    }

    /// Parse `trusted_proxies` once for repeated checks.
    ///
    /// `None` trusts every source. A list, even an empty one or one whose
    /// entries are all invalid, trusts only the ranges that parse. Invalid
    /// entries are logged and skipped.
    pub fn trusted_set(&self) -> TrustedProxies {
        let Some(proxies) = self.trusted_proxies.as_deref() else {
            return TrustedProxies::Any;
        };

        let ranges: Vec<CidrRange> = proxies
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in trusted proxies, skipping");
                }
                parsed
            })
            .collect();

        if ranges.is_empty() {
            warn!("Trusted proxy list has no valid ranges; no proxy will be trusted");
        } else {
            debug!(count = ranges.len(), "Trusted proxy validation enabled");
        }
        TrustedProxies::Ranges(ranges)
    }

    /// Whether `ip` belongs to a trusted proxy.
    ///
    /// Parses the list on every call; hold on to [`RealIpConfig::trusted_set`]
    /// when checking many addresses.
    pub fn is_trusted_proxy(&self, ip: &str) -> bool {
        self.trusted_set().is_trusted(ip)
    }
}

/// Parsed form of [`RealIpConfig::trusted_proxies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustedProxies {
    /// No list configured.
    Any,
    /// Only these ranges.
    Ranges(Vec<CidrRange>),
}

impl TrustedProxies {
    pub fn is_trusted(&self, ip: &str) -> bool {
        match self {
            TrustedProxies::Any => true,
            TrustedProxies::Ranges(ranges) => match ip.trim().parse::<IpAddr>() {
                Ok(ip) => ranges.iter().any(|range| range.contains(&ip)),
                Err(_) => false,
            },
        }
    }

    pub fn ranges(&self) -> &[CidrRange] {
        match self {
            TrustedProxies::Any => &[],
            TrustedProxies::Ranges(ranges) => ranges,
        }
    }
}

impl fmt::Debug for RealIpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealIpConfig")
            .field("extractor", &self.extractor.as_ref().map(|_| ".."))
            .field("trusted_proxies", &self.trusted_proxies)
            .finish()
    }
}

pub type RealIpOption = ConfigOption<RealIpConfig>;

pub fn with_extractor(extractor: Option<Arc<dyn IpExtractor>>) -> RealIpOption {
    ConfigOption::new(move |cfg: &mut RealIpConfig| cfg.extractor = extractor.clone())
}

pub fn with_trusted_proxies(proxies: impl Into<Option<Vec<String>>>) -> RealIpOption {
    let proxies = proxies.into();
    ConfigOption::new(move |cfg: &mut RealIpConfig| cfg.trusted_proxies = proxies.clone())
}
