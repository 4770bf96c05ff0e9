//! Identity resolution.
//!
//! Produces the canonical client address for a request. Forwarded headers
//! are only honoured when the direct peer is a trusted proxy (or when the
//! deployment says every peer is), so a client cannot pick its own identity
//! by sending `X-Forwarded-For`.

use crate::domain::config::SecurityConfig;
use crate::domain::error::StatsError;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use stats_store::Identity;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, warn};

/// Forwarding headers, in the order they are consulted.
pub const FORWARDED_HEADERS: [&str; 6] = [
    "x-client-ip",
    "x-forwarded-for",
    "cf-connecting-ip",
    "true-client-ip",
    "x-real-ip",
    "forwarded",
];

/// Where a request came from: the transport peer plus its headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    /// Socket address of the direct peer, when the server recorded one.
    pub peer: Option<IpAddr>,
    pub headers: HeaderMap,
}

impl RequestOrigin {
    pub fn new(peer: Option<IpAddr>, headers: HeaderMap) -> Self {
        Self { peer, headers }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip());
        Self::new(peer, parts.headers.clone())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Trusted proxy configuration
#[derive(Clone, Debug)]
pub struct TrustedProxyConfig {
    /// List of trusted proxy IPs
    pub trusted_proxies: Vec<IpAddr>,
    /// Trust local IPs (127.0.0.1, ::1)
    pub trust_localhost: bool,
    /// Trust private IPs (10.x.x.x, 192.168.x.x, 172.16-31.x.x, fc00::/7)
    pub trust_private: bool,
    /// Honour forwarded headers regardless of the peer
    pub trust_all: bool,
    /// Number of trusted proxies in chain (for X-Forwarded-For)
    pub proxy_count: usize,
}

impl Default for TrustedProxyConfig {
    fn default() -> Self {
        Self {
            trusted_proxies: Vec::new(),
            trust_localhost: true,
            trust_private: false,
            trust_all: false,
            proxy_count: 1,
        }
    }
}

impl From<&SecurityConfig> for TrustedProxyConfig {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            trusted_proxies: config.trusted_proxies.clone(),
            trust_localhost: config.trust_localhost,
            trust_private: config.trust_private,
            trust_all: config.trust_forwarded_headers,
            proxy_count: config.proxy_count,
        }
    }
}

/// Resolves the client identity of a request.
#[derive(Clone, Debug, Default)]
pub struct IdentityResolver {
    config: TrustedProxyConfig,
}

impl IdentityResolver {
    pub fn new(config: TrustedProxyConfig) -> Self {
        Self { config }
    }

    /// Ignore all forwarding headers; the peer address is the identity.
    pub fn direct_only() -> Self {
        Self::new(TrustedProxyConfig {
            trusted_proxies: Vec::new(),
            trust_localhost: false,
            trust_private: false,
            trust_all: false,
            proxy_count: 0,
        })
    }

    /// Canonical client identity, or `NoIdentity` when no address is known.
    pub fn resolve(&self, origin: &RequestOrigin) -> Result<Identity, StatsError> {
        self.resolve_ip(origin)
            .map(Identity::from_ip)
            .ok_or(StatsError::NoIdentity)
    }

    /// Client address before conversion to an `Identity`.
    pub fn resolve_ip(&self, origin: &RequestOrigin) -> Option<IpAddr> {
        if self.honours_headers(origin.peer) {
            if let Some(ip) = self.from_headers(&origin.headers) {
                return Some(ip.to_canonical());
            }
        } else if has_forwarding_headers(&origin.headers) {
            warn!(
                peer = ?origin.peer,
                "Ignoring forwarded headers from untrusted source"
            );
        }

        origin.peer.map(|ip| ip.to_canonical())
    }

    fn honours_headers(&self, peer: Option<IpAddr>) -> bool {
        self.config.trust_all || peer.is_some_and(|ip| is_trusted_proxy(ip, &self.config))
    }

    fn from_headers(&self, headers: &HeaderMap) -> Option<IpAddr> {
        for name in FORWARDED_HEADERS {
            let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
                continue;
            };

            let ip = match name {
                "x-forwarded-for" => {
                    let entries: Vec<&str> = value.split(',').collect();
                    select_from_right(&entries, self.config.proxy_count)
                        .and_then(parse_ip_token)
                }
                "forwarded" => {
                    let entries = forwarded_for_values(value);
                    select_from_right(&entries, self.config.proxy_count)
                        .and_then(parse_ip_token)
                }
                _ => parse_ip_token(value),
            };

            if let Some(ip) = ip {
                debug!(header = name, value, extracted_ip = %ip, "Extracted client IP from header");
                return Some(ip);
            }
        }
        None
    }
}

/// The entry `proxy_count` positions from the right; the leftmost entry when
/// the chain is shorter than that.
fn select_from_right<'a>(entries: &[&'a str], proxy_count: usize) -> Option<&'a str> {
    if entries.is_empty() {
        return None;
    }
    let index = entries.len().saturating_sub(proxy_count.max(1));
    entries.get(index).copied()
}

/// `for=` values of an RFC 7239 `Forwarded` header, in order.
fn forwarded_for_values(value: &str) -> Vec<&str> {
    value
        .split(',')
        .filter_map(|element| {
            element.split(';').find_map(|pair| {
                let (key, val) = pair.split_once('=')?;
                key.trim().eq_ignore_ascii_case("for").then_some(val.trim())
            })
        })
        .collect()
}

/// Parse one address token: bare IP, `ip:port`, `[v6]` or `[v6]:port`,
/// optionally quoted.
fn parse_ip_token(token: &str) -> Option<IpAddr> {
    let token = token.trim().trim_matches('"');
    if token.is_empty() {
        return None;
    }
    if let Ok(ip) = token.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = token.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    token
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .and_then(|(inner, _)| inner.parse::<IpAddr>().ok())
}

fn has_forwarding_headers(headers: &HeaderMap) -> bool {
    FORWARDED_HEADERS.iter().any(|name| headers.contains_key(*name))
}

/// Check if an IP is a trusted proxy
fn is_trusted_proxy(ip: IpAddr, config: &TrustedProxyConfig) -> bool {
    let ip = ip.to_canonical();

    // Check explicit trusted list
    if config.trusted_proxies.contains(&ip) {
        return true;
    }

    // Check localhost
    if config.trust_localhost && ip.is_loopback() {
        return true;
    }

    // Check private networks
    if config.trust_private && is_private_ip(ip) {
        return true;
    }

    false
}

/// Check if IP is in private range
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_link_local(),
        IpAddr::V6(ipv6) => {
            // IPv6 unique local addresses (fc00::/7)
            let octets = ipv6.octets();
            (octets[0] & 0xfe) == 0xfc
        }
    }
}
