//! Chrome process manager.
//!
//! Reuses a browser already listening on the debug port, otherwise launches
//! one with a dedicated profile directory and waits for the endpoint.

mod manager_core;
mod manager_types;

pub use manager_core::BrowserManager;
pub use manager_types::{BrowserError, BrowserManagerConfig};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
