//! Test utilities for proxy module testing
//!
//! Mock backends bound to ephemeral ports and helpers for building engines
//! against them.

use crate::proxy::engine::ProxyEngine;
use crate::proxy::history::HistoryStore;
use crate::proxy::route_table::{RouteEntry, RouteTable};
use crate::proxy::types::*;
use axum::{
    body::Body,
    extract::{Path, Request},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// How long the slow endpoint sleeps before answering
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_millis(500);

/// Echo the request body unchanged and describe what arrived in headers
pub async fn echo_handler(request: Request) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let mut response = Response::new(Body::from(body_bytes));
    let headers = response.headers_mut();
    if let Ok(uri) = HeaderValue::from_str(&parts.uri.to_string()) {
        headers.insert("x-echo-uri", uri);
    }
    if let Some(host) = parts.headers.get("host") {
        headers.insert("x-echo-host", host.clone());
    }
    if let Some(forwarded) = parts.headers.get("x-forwarded-for") {
        headers.insert("x-echo-forwarded-for", forwarded.clone());
    }
    let multi = parts.headers.get_all("x-multi").iter().count();
    headers.insert("x-echo-multi-count", HeaderValue::from(multi));
    let method = HeaderValue::from_str(parts.method.as_str()).map_err(|_| StatusCode::BAD_REQUEST)?;
    headers.insert("x-echo-method", method);
    Ok(response)
}

/// Start a mock backend on an ephemeral port
pub async fn spawn_backend() -> SocketAddr {
    let app = axum::Router::new()
        .route("/items", get(|| async { axum::Json(serde_json::json!({"ok": true})) }))
        .route(
            "/status/{code}",
            get(|Path(code): Path<u16>| async move {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
                (status, "Status response")
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
                "Slow response"
            }),
        )
        .route(
            "/multi",
            get(|| async {
                let mut response = "multi".into_response();
                response
                    .headers_mut()
                    .append("set-cookie", HeaderValue::from_static("a=1"));
                response
                    .headers_mut()
                    .append("set-cookie", HeaderValue::from_static("b=2"));
                response
            }),
        )
        .route(
            "/abort",
            get(|| async {
                let head = stream::iter([Ok(Bytes::from_static(b"partial"))]);
                let tail = stream::once(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err::<Bytes, _>(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "backend went away",
                    ))
                });
                Body::from_stream(head.chain(tail))
            }),
        )
        .route(
            "/stall",
            get(|| async {
                let head = stream::iter([Ok::<_, io::Error>(Bytes::from_static(b"partial"))]);
                let tail = stream::once(async {
                    tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
                    Ok(Bytes::from_static(b"rest"))
                });
                Body::from_stream(head.chain(tail))
            }),
        )
        .fallback(echo_handler);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend serve");
    });

    addr
}

/// An address nothing is listening on
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("throwaway address");
    drop(listener);
    addr
}

pub fn route(prefix: &str, target: &str) -> RouteEntry {
    RouteEntry::new(
        RoutePrefix::try_new(prefix.to_string()).expect("test prefix is valid"),
        TargetUrl::new(target.to_string()),
    )
}

/// Proxy configuration with a short deadline and a small capture limit
pub fn test_proxy_config(timeout: Duration, capture_limit: usize) -> ProxyConfig {
    ProxyConfig {
        request_timeout: timeout,
        capture_limit: CaptureLimit::new(capture_limit),
        ..ProxyConfig::default()
    }
}

pub fn test_engine(config: ProxyConfig, routes: Vec<RouteEntry>, capacity: usize) -> ProxyEngine {
    let history = Arc::new(HistoryStore::new(
        HistoryCapacity::try_new(capacity).expect("test capacity is valid"),
    ));
    let routes: RouteTable = routes.into_iter().collect();
    ProxyEngine::new(config, Arc::new(routes), history)
}
