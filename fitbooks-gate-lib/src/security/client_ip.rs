use http::HeaderMap;
use std::net::SocketAddr;

/// Returned when no client address can be derived.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Proxy headers consulted for the client address, in priority order.
pub mod forwarded {
    /// Set by Cloudflare to the connecting client address.
    pub const CONNECTING_IP: &str = "cf-connecting-ip";
    /// Comma-separated chain; the first entry is the original client.
    pub const FOR: &str = "x-forwarded-for";
    pub const REAL_IP: &str = "x-real-ip";
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Derive the client address from trusted proxy headers.
///
/// Only meaningful behind a proxy that sets these headers faithfully; nothing
/// here validates them.
pub fn client_ip_from_headers(headers: &HeaderMap) -> String {
    if let Some(ip) = header_str(headers, forwarded::CONNECTING_IP) {
        return ip.to_string();
    }

    if let Some(chain) = header_str(headers, forwarded::FOR) {
        return chain
            .split(',')
            .next()
            .map(str::trim)
            .filter(|first| !first.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string();
    }

    if let Some(ip) = header_str(headers, forwarded::REAL_IP) {
        return ip.to_string();
    }

    UNKNOWN_CLIENT.to_string()
}

/// Client address used for rate limit keys.
///
/// With `trust_proxy_headers` the forwarded headers decide; otherwise the peer
/// socket address is used.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        client_ip_from_headers(headers)
    } else {
        peer.ip().to_string()
    }
}
