//! # resocket
//!
//! A reconnecting, buffering socket client.
//!
//! ## Features
//!
//! - **Single live transport**: one owned connection at a time, replaced on reconnect
//! - **Backoff reconnection**: 1.5x growth, capped, with an optional lifetime budget
//! - **Buffered delivery**: bounded FIFO flushed on a timer, as batches or per message
//! - **Pause/resume**: hold delivery while buffering continues
//! - **Isolated listeners**: a panicking listener never takes down its siblings
//! - **Pluggable transports**: WebSocket by default, in-process loopback for embedding

pub mod traits;
pub mod core;
pub mod transport;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    buffer, builder, client, config, connection_state, listeners,
    builder::{states, ConnectionBuilder},
    client::{ConnectionManager, Metrics},
    config::SocketConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    listeners::{EventKind, ListenerRegistry},
};

// Re-export transports
pub use transport::{LoopbackAcceptor, LoopbackConnector, LoopbackPeer, WsConnector};
