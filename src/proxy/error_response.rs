//! Unified error response handling for the proxy service
//!
//! Every failure maps to a status code and a short JSON diagnostic. No
//! backend bytes are ever part of an error response.

use crate::proxy::types::{BodySide, ProxyError};
use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Unique error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Correlation id supplied by the caller, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Convert to HTTP response, echoing the correlation id under `header`
    pub fn into_response_with_status(self, status: StatusCode, header: &str) -> Response {
        let request_id = self.request_id.clone();
        let mut response = (status, Json(self)).into_response();

        if let Some(id) = request_id {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(header.as_bytes()),
                HeaderValue::from_str(&id),
            ) {
                response.headers_mut().insert(name, value);
            }
        }

        response
    }
}

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    /// Convert to standardized error response
    fn to_error_response(&self) -> ErrorResponse;

    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;
}

impl ErrorResponseExt for ProxyError {
    fn to_error_response(&self) -> ErrorResponse {
        use ProxyError::*;

        let code = match self {
            RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            InvalidTarget { .. } => "INVALID_TARGET",
            BackendUnreachable(_) => "BACKEND_UNREACHABLE",
            BackendTimeout(_) => "BACKEND_TIMEOUT",
            BodyReadFailure { .. } => "BODY_READ_FAILURE",
            HttpError(_) => "INTERNAL_ERROR",
        };
        ErrorResponse::new(code, self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        use ProxyError::*;

        match self {
            RouteNotFound { .. } => StatusCode::BAD_REQUEST,
            InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BodyReadFailure {
                side: BodySide::Request,
                ..
            } => StatusCode::BAD_REQUEST,
            BodyReadFailure {
                side: BodySide::Response,
                ..
            } => StatusCode::BAD_GATEWAY,
            HttpError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error conversion for Axum responses without correlation
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_error_response())).into_response()
    }
}
