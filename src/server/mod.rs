//! Web server module for the position hub.
//!
//! This module contains the Axum web server that stands in for the hosted
//! document store: it keeps the position collection in memory and serves it
//! over HTTP and WebSocket.

pub mod routes;
pub mod websocket;

// Re-export main server functionality
pub use routes::*;
