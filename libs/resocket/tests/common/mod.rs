//! Common test utilities for resocket integration tests
//!
//! Provides an echo WebSocket server, a listener recorder and helpers
//! for driving the manager on a paused Tokio clock.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use resocket::builder::states::HasUrl;
use resocket::{
    CloseInfo, ConnectionBuilder, ConnectionManager, LoopbackAcceptor, LoopbackConnector,
    LoopbackPeer, Payload, SocketError,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// A listener notification as seen by a test
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Opened,
    Closed(u16),
    Errored(String),
    Message(Payload),
    Bulk(Vec<Payload>),
    Destroyed,
}

/// Collects listener notifications in the order the manager fired them
#[derive(Debug, Clone)]
pub struct Recorder {
    tx: Sender<Seen>,
    rx: Receiver<Seen>,
}

impl Recorder {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Register opened, closed, errored, message and destroyed listeners
    pub fn attach(&self, builder: ConnectionBuilder<HasUrl>) -> ConnectionBuilder<HasUrl> {
        let opened = self.tx.clone();
        let closed = self.tx.clone();
        let errored = self.tx.clone();
        let message = self.tx.clone();
        let destroyed = self.tx.clone();

        builder
            .on_open(move || {
                let _ = opened.send(Seen::Opened);
            })
            .on_close(move |info: &CloseInfo| {
                let _ = closed.send(Seen::Closed(info.code));
            })
            .on_error(move |err: &SocketError| {
                let _ = errored.send(Seen::Errored(err.to_string()));
            })
            .on_message(move |payload: &Payload| {
                let _ = message.send(Seen::Message(payload.clone()));
            })
            .on_destroy(move || {
                let _ = destroyed.send(Seen::Destroyed);
            })
    }

    /// Register a bulk-message listener
    pub fn attach_bulk(&self, builder: ConnectionBuilder<HasUrl>) -> ConnectionBuilder<HasUrl> {
        let bulk = self.tx.clone();
        builder.on_bulk_message(move |batch: &[Payload]| {
            let _ = bulk.send(Seen::Bulk(batch.to_vec()));
        })
    }

    pub fn sender(&self) -> Sender<Seen> {
        self.tx.clone()
    }

    /// Everything recorded since the last call
    pub fn take(&self) -> Vec<Seen> {
        self.rx.try_iter().collect()
    }

    /// Wait (real time) for the next notification
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Seen> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// A manager wired to a loopback transport
pub struct Harness {
    pub manager: ConnectionManager,
    pub connector: LoopbackConnector,
    pub acceptor: LoopbackAcceptor,
    pub recorder: Recorder,
}

impl Harness {
    /// Build a manager on a loopback transport. `configure` gets a builder
    /// with the recorder's listeners already attached.
    pub fn start<F>(configure: F) -> Self
    where
        F: FnOnce(ConnectionBuilder<HasUrl>) -> ConnectionBuilder<HasUrl>,
    {
        Self::start_with(|_| {}, configure)
    }

    /// Like `start`, with access to the connector before the first open
    pub fn start_with<P, F>(prepare: P, configure: F) -> Self
    where
        P: FnOnce(&LoopbackConnector),
        F: FnOnce(ConnectionBuilder<HasUrl>) -> ConnectionBuilder<HasUrl>,
    {
        let (connector, acceptor) = LoopbackConnector::new();
        prepare(&connector);
        let recorder = Recorder::new();

        let builder = ConnectionManager::builder()
            .url("loop://feed")
            .id("test")
            .connector(connector.clone());
        let manager = configure(recorder.attach(builder))
            .connect()
            .expect("manager should start");

        Self {
            manager,
            connector,
            acceptor,
            recorder,
        }
    }

    /// Let the driver settle, then take the newest peer
    pub async fn accept(&self) -> LoopbackPeer {
        settle().await;
        self.acceptor
            .try_accept()
            .expect("manager should have opened a transport")
    }

    /// Accept the first peer and report it open
    pub async fn open(&self) -> LoopbackPeer {
        let peer = self.accept().await;
        assert!(peer.open());
        settle().await;
        peer
    }
}

/// Give the driver task a chance to process everything queued
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Advance the (paused) clock and let the driver react
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

/// Poll `condition` in real time until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// A simple mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0").await
    }

    /// Start on a specific address (used to restart on the same port)
    pub async fn start_on(addr: &str) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self { addr, shutdown }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>) {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
