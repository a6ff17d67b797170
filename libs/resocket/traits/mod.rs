//! # resocket traits
//!
//! Core types and seams shared by the connection manager and its transports:
//!
//! - **Payload**: application frames, with optional JSON decoding
//! - **Connector / TransportHandle**: the transport capability interface
//! - **ReconnectBackoff**: delay policy for reconnection attempts
//! - **SocketError**: the crate error type

pub mod error;
pub mod payload;
pub mod reconnect;
pub mod connector;

// Re-export commonly used types
pub use error::{Result, SocketError};
pub use payload::Payload;
pub use reconnect::{
    ReconnectBackoff, BACKOFF_FACTOR, DEFAULT_BASE_DELAY, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY,
};
pub use connector::{
    CloseInfo, ConnectTarget, Connector, TransportCommand, TransportEvent, TransportHandle,
    TransportLink,
};
