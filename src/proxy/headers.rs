//! HTTP header constants and utilities for the proxy service
//!
//! This module centralizes header names, hop-by-hop handling and the
//! gateway's own well-known paths.

use ::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::net::IpAddr;

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header carrying the chain of client addresses
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Standard header re-exports for convenience
pub use header::{CONNECTION, CONTENT_TYPE, HOST};

/// Headers that apply to a single connection and must not be forwarded
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Well-known paths served by the gateway itself
pub mod paths {
    /// Default path when none is specified
    pub const DEFAULT: &str = "/";

    /// Health check endpoint path
    pub const HEALTH: &str = "/__gateway/health";

    /// History snapshot endpoint path
    pub const HISTORY: &str = "/__gateway/history";
}

/// Remove hop-by-hop headers, including any listed in `Connection`
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Value of `name` as text, empty when absent
pub fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Append the peer address to `X-Forwarded-For`
pub fn append_forwarded_for(headers: &mut HeaderMap, peer: IpAddr) {
    let previous: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    let chain = if previous.is_empty() {
        peer.to_string()
    } else {
        format!("{}, {peer}", previous.join(", "))
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
