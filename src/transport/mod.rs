//! The `transport` module is the gateway's edge: it owns the wire protocol,
//! maps broker errors onto status codes, and runs the WebSocket server that
//! forwards client requests to the dispatcher. A separate HTTP listener
//! serves metrics.

pub mod handler;
pub mod http;
pub mod message;
pub mod websocket;
