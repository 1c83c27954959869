//! Presentation Layer
//!
//! HTTP routes, middleware and the WebSocket hub.

pub mod http;
pub mod middleware;
pub mod websocket;
