//! # resocket core
//!
//! The connection manager and the pieces it is built from:
//!
//! - **client**: `ConnectionManager` handle and its driver task
//! - **builder**: type-state builder (URL required before `connect()`)
//! - **config**: `SocketConfig`, serde/YAML loadable
//! - **connection_state**: lock-free state and metrics mirrors
//! - **listeners**: per-category listener registry with isolated dispatch
//! - **buffer**: bounded FIFO for buffered delivery
//!
//! ## Example
//!
//! ```rust,ignore
//! use resocket::{ConnectionManager, Payload};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> resocket::Result<()> {
//!     let manager = ConnectionManager::builder()
//!         .url("wss://stream.example.com/ws")
//!         .reconnect(true)
//!         .buffer(64, Duration::from_millis(500))
//!         .on_bulk_message(|batch: &[Payload]| println!("{} messages", batch.len()))
//!         .connect()?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     manager.shutdown().await
//! }
//! ```

pub mod buffer;
pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod listeners;

// Re-export main types
pub use buffer::MessageBuffer;
pub use builder::{states, ConnectionBuilder};
pub use client::{ConnectionManager, Metrics};
pub use config::{SocketConfig, DEFAULT_FLUSH_INTERVAL_MS};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use listeners::{EventKind, Listener, ListenerRegistry};

// Re-export traits for convenience
pub use crate::traits::*;
