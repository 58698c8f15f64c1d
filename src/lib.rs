//! Golden Gate - a local development reverse-proxy gateway
//!
//! Requests are routed by path prefix to upstream services, and every
//! forwarded exchange is recorded in a bounded in-memory history that can be
//! inspected while developing.

pub mod application;
pub mod config;
pub mod error;
pub mod proxy;

pub use application::Application;
pub use error::{Error, Result};
