//! Front door of the gateway
//!
//! The `GatewayService` wraps a [`ProxyEngine`] in an axum router:
//!
//! ```rust,ignore
//! use golden_gate::proxy::{GatewayService, ProxyEngine};
//!
//! let service = GatewayService::new(engine);
//! let router = service.into_router();
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! ```
//!
//! ## Endpoints
//!
//! - `GET /__gateway/health`: liveness
//! - `GET /__gateway/history`: read-only JSON snapshot of recorded exchanges
//! - anything else: handed to the engine, which resolves it against the
//!   route table

use crate::proxy::engine::ProxyEngine;
use crate::proxy::exchange::ExchangeRecord;
use crate::proxy::headers::paths;
use crate::proxy::history::{HistoryStats, HistoryStore};
use crate::proxy::middleware::logging_middleware;
use axum::{
    extract::{Request, State},
    middleware::from_fn_with_state,
    response::Response,
    routing::get,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

/// Axum wrapper around the proxy engine
pub struct GatewayService {
    engine: Arc<ProxyEngine>,
}

impl GatewayService {
    pub fn new(engine: ProxyEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// History store shared with the engine
    pub fn history(&self) -> Arc<HistoryStore> {
        Arc::clone(self.engine.history())
    }

    /// Create an Axum router for the gateway with middleware
    pub fn into_router(self) -> axum::Router {
        let correlation_header = self.engine.config().correlation_header.clone();

        axum::Router::new()
            .route(paths::HEALTH, get(health_handler))
            .route(paths::HISTORY, get(history_handler))
            .fallback(proxy_handler)
            .with_state(self.engine)
            .layer(from_fn_with_state(correlation_header, logging_middleware))
    }
}

/// Read-only view of the history store
#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub capacity: usize,
    pub stats: HistoryStats,
    /// Oldest first
    pub records: Vec<Arc<ExchangeRecord>>,
}

impl HistoryView {
    pub fn from_store(store: &HistoryStore) -> Self {
        Self {
            capacity: *store.capacity().as_ref(),
            stats: store.stats(),
            records: store.snapshot(),
        }
    }
}

/// Axum handler for proxying requests
async fn proxy_handler(State(engine): State<Arc<ProxyEngine>>, request: Request) -> Response {
    engine.handle(request).await
}

/// Health check handler
async fn health_handler() -> &'static str {
    "OK"
}

async fn history_handler(State(engine): State<Arc<ProxyEngine>>) -> Json<HistoryView> {
    Json(HistoryView::from_store(engine.history()))
}
