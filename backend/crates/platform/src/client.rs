//! Client identification utilities
//!
//! Common functions for identifying clients via HTTP headers.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Headers consulted for the client address, most trusted first.
///
/// `CF-Connecting-IP` is set by the CDN edge, `X-Forwarded-For` by
/// intermediate reverse proxies, `X-Real-IP` by nginx-style frontends.
const IP_HEADER_CHAIN: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Error when the client cannot be identified
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientIdError {
    #[error("Cannot determine client IP address")]
    Unresolvable,
}

/// Extract client IP address from headers
///
/// Walks the trusted header chain (CDN header, then forwarded-for,
/// then real-ip) and falls back to the direct connection IP. The first
/// value that parses as an IP address wins. For `X-Forwarded-For` only
/// the first hop is considered.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    for name in IP_HEADER_CHAIN {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }
    direct_ip
}

/// Extract the client IP, failing when it cannot be resolved
///
/// Rate limiting must never be silently skipped because the caller is
/// unidentifiable, so callers that gate on the IP use this variant.
pub fn require_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
) -> Result<IpAddr, ClientIdError> {
    extract_client_ip(headers, direct_ip).ok_or(ClientIdError::Unresolvable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_client_ip_cdn_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.5"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("203.0.113.5".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_xff_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("198.51.100.7".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_direct_fallback() {
        let headers = HeaderMap::new();
        let direct: IpAddr = "10.1.2.3".parse().unwrap();

        let ip = extract_client_ip(&headers, Some(direct));
        assert_eq!(ip, Some(direct));
    }

    #[test]
    fn test_extract_client_ip_garbage_header_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("not-an-ip"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("198.51.100.7".parse().unwrap()));
    }

    #[test]
    fn test_require_client_ip_unresolvable() {
        let headers = HeaderMap::new();
        let result = require_client_ip(&headers, None);
        assert!(matches!(result, Err(ClientIdError::Unresolvable)));
    }

    #[test]
    fn test_ipv6_supported() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("2001:db8::1"));

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("2001:db8::1".parse().unwrap()));
    }
}
