//! Transport implementations
//!
//! - **WsConnector**: WebSocket over tokio-tungstenite (the default)
//! - **LoopbackConnector**: in-process transport driven by a [`LoopbackPeer`]

pub mod loopback;
pub mod websocket;

pub use loopback::{LoopbackAcceptor, LoopbackConnector, LoopbackPeer};
pub use websocket::WsConnector;
