//! Type definitions for the proxy module

use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::proxy::headers::X_REQUEST_ID;

// ========== Size and Capacity Types ==========

/// Maximum number of exchanges retained by the history store
#[nutype(
    validate(predicate = |capacity: &usize| *capacity > 0),
    derive(Clone, Copy, Debug, Display, PartialEq, Eq, AsRef, TryFrom, Deserialize, Serialize)
)]
pub struct HistoryCapacity(usize);

/// Number of body bytes retained for history per direction.
///
/// Bytes beyond the limit are still forwarded, they are just not kept.
#[nutype(derive(Clone, Copy, Debug, Display, PartialEq, Eq, AsRef, From, Deserialize, Serialize))]
pub struct CaptureLimit(usize);

// ========== Routing Types ==========

/// Literal path prefix a route is registered under
#[nutype(
    validate(not_empty),
    derive(Clone, Debug, Display, PartialEq, Eq, AsRef, TryFrom, Deserialize, Serialize)
)]
pub struct RoutePrefix(String);

/// Backend base URL as configured.
///
/// Kept unparsed: a malformed target is reported as [`ProxyError::InvalidTarget`]
/// when it is used, see [`crate::proxy::url_resolver::UrlResolver::parse_target`].
#[nutype(
    sanitize(trim),
    derive(Clone, Debug, Display, PartialEq, Eq, AsRef, From, Deserialize, Serialize)
)]
pub struct TargetUrl(String);

// ========== Header Types ==========

/// Name of the inbound header whose value becomes the exchange id
#[nutype(
    sanitize(trim, lowercase),
    validate(predicate = |name: &str| http::HeaderName::from_bytes(name.as_bytes()).is_ok()),
    derive(Clone, Debug, Display, PartialEq, Eq, AsRef, TryFrom, Deserialize, Serialize)
)]
pub struct CorrelationHeader(String);

// ========== Constants ==========

/// Default per-call backend deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of body bytes retained per direction (1 MiB)
pub const DEFAULT_CAPTURE_LIMIT_BYTES: usize = 1024 * 1024;

/// Default history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Proxy engine configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Deadline for the backend round trip (until response headers arrive)
    pub request_timeout: Duration,
    /// Body bytes retained for history per direction
    pub capture_limit: CaptureLimit,
    /// Header carrying the caller supplied correlation id
    pub correlation_header: CorrelationHeader,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            capture_limit: CaptureLimit::new(DEFAULT_CAPTURE_LIMIT_BYTES),
            correlation_header: CorrelationHeader::try_new(X_REQUEST_ID.to_string())
                .expect("x-request-id is a valid header name"),
        }
    }
}

/// Which body a read failure happened on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodySide {
    Request,
    Response,
}

impl fmt::Display for BodySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// Errors that can occur in the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("No route configured for path {path}")]
    RouteNotFound { path: String },

    #[error("Invalid target URL '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Backend did not respond within {0:?}")]
    BackendTimeout(Duration),

    #[error("Failed to read {side} body: {message}")]
    BodyReadFailure { side: BodySide, message: String },

    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),
}

impl ProxyError {
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn body_read(side: BodySide, error: impl fmt::Display) -> Self {
        Self::BodyReadFailure {
            side,
            message: error.to_string(),
        }
    }

    /// Whether the failure happened after the request was handed to the backend.
    ///
    /// Only these failures produce a history record.
    pub fn is_post_dispatch(&self) -> bool {
        matches!(
            self,
            Self::BackendUnreachable(_)
                | Self::BackendTimeout(_)
                | Self::BodyReadFailure {
                    side: BodySide::Response,
                    ..
                }
        )
    }
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
