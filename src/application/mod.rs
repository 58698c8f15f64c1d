//! Process bootstrap
//!
//! Wires settings into the route table, history store and proxy engine, then
//! serves the gateway router.

pub mod app;

pub use app::Application;
