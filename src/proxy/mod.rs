//! Recording reverse proxy
//!
//! Requests are matched against an ordered prefix route table, forwarded to
//! the selected backend, and each completed exchange is kept in a bounded
//! in-memory history:
//! - Engine: route, rewrite, forward and capture on the request path
//! - History: fixed-capacity store with oldest-first eviction

pub mod capture;
pub mod engine;
pub mod error_response;
pub mod exchange;
pub mod headers;
pub mod history;
pub mod middleware;
pub mod route_table;
pub mod service;
pub mod types;
pub mod url_resolver;

#[cfg(test)]
pub(crate) mod test_utils;


pub use engine::ProxyEngine;
pub use exchange::{ExchangeOutcome, ExchangeRecord};
pub use history::HistoryStore;
pub use route_table::{RouteEntry, RouteTable};
pub use service::GatewayService;
pub use types::{ProxyConfig, ProxyError, ProxyResult};
