//! URL checks for endpoints handed to or received from the API.
//!
//! - Session URLs returned by negotiation must be WebSocket URLs with a host.
//! - Callback URLs sent to the API must be HTTPS and must not point at a
//!   private or loopback address literal.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be ws or wss, got: {0}")]
    WebSocketRequired(String),

    #[error("URL scheme must be HTTPS, got: {0}")]
    HttpsRequired(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL points to a private/internal IP address: {0}")]
    PrivateIpDetected(IpAddr),
}

/// Checks if an IPv4 address is private/internal
///
/// Covers loopback, RFC 1918, link-local, broadcast, unspecified,
/// documentation and CGNAT (100.64.0.0/10) ranges.
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    if ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
    {
        return true;
    }
    let octets = ip.octets();
    octets[0] == 100 && (octets[1] & 0xC0) == 64
}

/// Checks if an IPv6 address is private/internal
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    // Link-local fe80::/10
    if segments[0] & 0xFFC0 == 0xFE80 {
        return true;
    }
    // Unique local fc00::/7
    if segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }
    if let Some(ipv4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&ipv4);
    }
    false
}

pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

/// Validate the WebSocket URL returned by session negotiation.
pub fn validate_session_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url)?;

    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(UrlValidationError::WebSocketRequired(
            parsed.scheme().to_string(),
        ));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(parsed)
}

/// Validate a callback URL before it is sent to the API.
///
/// No DNS resolution is done; only address literals are checked.
pub fn validate_callback_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url)?;

    if parsed.scheme() != "https" {
        return Err(UrlValidationError::HttpsRequired(
            parsed.scheme().to_string(),
        ));
    }

    let ip = match parsed.host() {
        Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip),
        Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip),
        Some(url::Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Some(url::Host::Domain(_)) => return Ok(parsed),
        None => return Err(UrlValidationError::MissingHost),
    };

    if is_private_ip(&ip) {
        warn!(url = %url, "Callback URL points to a private address");
        return Err(UrlValidationError::PrivateIpDetected(ip));
    }

    Ok(parsed)
}
