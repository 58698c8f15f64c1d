//! Proxy engine: route, rewrite, forward, capture, commit
//!
//! ```text
//! inbound request
//!     → RouteTable::resolve          (RouteNotFound: 400, no record)
//!     → UrlResolver rewrite          (InvalidTarget: 500, no record)
//!     → tee request body             (BodyReadFailure: 400, no record)
//!     → dispatch under deadline      (BackendUnreachable 502 / BackendTimeout 504, Failed record)
//!     → tee response body            (BodyReadFailure: 502, Failed record)
//!     → HistoryStore::append         (Completed record)
//!     → backend status, headers and body returned unchanged
//! ```

use crate::proxy::capture::tee_body;
use crate::proxy::error_response::ErrorResponseExt;
use crate::proxy::exchange::{MultiMap, PendingExchange, RequestCapture, ResponseRecord};
use crate::proxy::headers::{append_forwarded_for, header_text, strip_hop_by_hop, HOST};
use crate::proxy::history::HistoryStore;
use crate::proxy::route_table::RouteTable;
use crate::proxy::types::*;
use crate::proxy::url_resolver::UrlResolver;
use axum::body::Body;
use axum::extract::ConnectInfo;
use chrono::Utc;
use http::{HeaderMap, HeaderValue};
use hyper::{Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// HTTP client used to reach backends
pub type BackendClient = Client<HttpConnector, Body>;

/// Per-route request handling shared by every in-flight request
#[derive(Clone)]
pub struct ProxyEngine {
    config: Arc<ProxyConfig>,
    routes: Arc<RouteTable>,
    history: Arc<HistoryStore>,
    client: BackendClient,
}

impl ProxyEngine {
    pub fn new(config: ProxyConfig, routes: Arc<RouteTable>, history: Arc<HistoryStore>) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .http1_title_case_headers(true)
            .http1_preserve_header_case(true)
            .build_http();

        Self {
            config: Arc::new(config),
            routes,
            history,
            client,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Handle one inbound request.
    ///
    /// Never fails: errors become the mapped status with a short diagnostic.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let request_id = self.correlation_id(request.headers());

        match self.forward(request, &request_id).await {
            Ok(response) => response,
            Err(error) => {
                let mut body = error.to_error_response();
                if !request_id.is_empty() {
                    body = body.with_request_id(request_id);
                }
                body.into_response_with_status(
                    error.status_code(),
                    self.config.correlation_header.as_ref(),
                )
            }
        }
    }

    async fn forward(&self, request: Request<Body>, request_id: &str) -> ProxyResult<Response<Body>> {
        let started = Instant::now();
        let timestamp = Utc::now();
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let route = match self.routes.resolve(&path) {
            Ok(route) => route,
            Err(error) => {
                warn!(request_id, method = %parts.method, path = %path, "No route matched");
                return Err(error);
            }
        };

        let target = UrlResolver::parse_target(route.target()).inspect_err(|error| {
            warn!(request_id, prefix = %route.prefix(), error = %error, "Route target is invalid");
        })?;
        let forward_uri = UrlResolver::resolve_target_uri(&target, route.prefix(), &parts.uri)?;
        let forwarded_url = forward_uri.to_string();

        let (request_body, forward_body) =
            tokio::time::timeout(self.config.request_timeout, tee_body(body, self.config.capture_limit))
                .await
                .map_err(|_| ProxyError::body_read(BodySide::Request, "timed out"))?
                .map_err(|e| ProxyError::body_read(BodySide::Request, e))?;

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        let host = HeaderValue::from_str(target.authority().as_str())
            .map_err(|e| ProxyError::invalid_target(route.target().to_string(), e.to_string()))?;
        headers.insert(HOST, host);
        if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(&mut headers, peer.ip());
        }

        let mut outbound = Request::builder()
            .method(parts.method.clone())
            .uri(forward_uri)
            .body(forward_body)?;
        *outbound.headers_mut() = headers;

        let pending = PendingExchange::new(
            RequestCapture {
                id: request_id.to_string(),
                timestamp,
                method: parts.method.to_string(),
                path,
                headers: MultiMap::from_headers(&parts.headers),
                query: MultiMap::from_query(parts.uri.query()),
                body: request_body,
                forwarded_url,
            },
            started,
        );

        debug!(
            request_id,
            method = %parts.method,
            forwarded_url = %pending.request().forwarded_url,
            "Dispatching to backend"
        );

        // One deadline covers the round trip and the response capture window
        let timeout = self.config.request_timeout;
        let deadline = tokio::time::Instant::now() + timeout;

        let response = match tokio::time::timeout_at(deadline, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let error = ProxyError::BackendUnreachable(describe_client_error(&e));
                return Err(self.commit_failure(pending, error));
            }
            Err(_) => return Err(self.commit_failure(pending, ProxyError::BackendTimeout(timeout))),
        };

        let (mut response_parts, response_body) = response.into_parts();
        let captured = tokio::time::timeout_at(
            deadline,
            tee_body(Body::new(response_body), self.config.capture_limit),
        )
        .await;
        let (response_capture, client_body) = match captured {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                let error = ProxyError::body_read(BodySide::Response, e);
                return Err(self.commit_failure(pending, error));
            }
            Err(_) => return Err(self.commit_failure(pending, ProxyError::BackendTimeout(timeout))),
        };

        let record = pending.complete(ResponseRecord {
            status_code: response_parts.status.as_u16(),
            headers: MultiMap::from_headers(&response_parts.headers),
            body: response_capture,
        });

        info!(
            request_id,
            method = %record.method,
            path = %record.path,
            forwarded_url = %record.forwarded_url,
            status = response_parts.status.as_u16(),
            duration_ms = record.duration.map(|d| d.as_millis() as u64).unwrap_or_default(),
            "Exchange completed"
        );
        self.history.append(record);

        strip_hop_by_hop(&mut response_parts.headers);
        Ok(Response::from_parts(response_parts, client_body))
    }

    /// Record a post-dispatch failure and hand the error back
    fn commit_failure(&self, pending: PendingExchange, error: ProxyError) -> ProxyError {
        debug_assert!(error.is_post_dispatch());
        let record = pending.fail(&error);
        warn!(
            request_id = %record.id,
            method = %record.method,
            path = %record.path,
            forwarded_url = %record.forwarded_url,
            error = %error,
            "Exchange failed"
        );
        self.history.append(record);
        error
    }

    fn correlation_id(&self, headers: &HeaderMap) -> String {
        header_text(headers, self.config.correlation_header.as_ref())
    }
}

/// Flatten a client error and its causes into one line
fn describe_client_error(error: &hyper_util::client::legacy::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::route_table::RouteEntry;
    use axum::http::StatusCode;

    fn engine(routes: Vec<(&str, &str)>) -> ProxyEngine {
        let routes = routes
            .into_iter()
            .map(|(prefix, target)| {
                RouteEntry::new(
                    RoutePrefix::try_new(prefix.to_string()).unwrap(),
                    TargetUrl::new(target.to_string()),
                )
            })
            .collect();
        let history = Arc::new(HistoryStore::new(HistoryCapacity::try_new(10).unwrap()));
        ProxyEngine::new(ProxyConfig::default(), Arc::new(routes), history)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("x-request-id", "corr-1")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_path_is_rejected_without_record() {
        let engine = engine(vec![("/svc-a", "http://localhost:9001")]);

        let response = engine.handle(get("/unknown")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "corr-1");
        assert!(engine.history().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_target_is_rejected_without_record() {
        let engine = engine(vec![("/broken", "not a url")]);

        let response = engine.handle(get("/broken/items")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "INVALID_TARGET");
        assert_eq!(error["request_id"], "corr-1");
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_correlation_id_defaults_to_empty() {
        let engine = engine(vec![]);
        assert_eq!(engine.correlation_id(&HeaderMap::new()), "");

        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        assert_eq!(engine.correlation_id(&headers), "abc");
    }
}
