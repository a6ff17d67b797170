//! In-process transport
//!
//! Every successful `open` on a [`LoopbackConnector`] produces a
//! [`LoopbackPeer`], the remote end of that connection, delivered through
//! the paired [`LoopbackAcceptor`]. The peer decides when the connection
//! opens, what it receives and how it ends, which makes the manager's
//! lifecycle fully scriptable without a network.

use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;

/// Connector side of the loopback transport
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    peers: Sender<LoopbackPeer>,
    fail_next: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

/// Receives the remote end of every connection the connector opens
#[derive(Debug)]
pub struct LoopbackAcceptor {
    peers: Receiver<LoopbackPeer>,
}

/// Remote end of one loopback connection
#[derive(Debug)]
pub struct LoopbackPeer {
    target: ConnectTarget,
    link: TransportLink,
    received: VecDeque<Payload>,
    closed_by_client: bool,
}

impl LoopbackConnector {
    pub fn new() -> (Self, LoopbackAcceptor) {
        let (tx, rx) = unbounded();
        (
            Self {
                peers: tx,
                fail_next: Arc::new(AtomicUsize::new(0)),
                opened: Arc::new(AtomicUsize::new(0)),
            },
            LoopbackAcceptor { peers: rx },
        )
    }

    /// Make the next `count` calls to `open` fail synchronously
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::Release);
    }

    /// Number of transports successfully created so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Acquire)
    }
}

impl Connector for LoopbackConnector {
    fn open(&self, target: &ConnectTarget) -> Result<TransportHandle> {
        let should_fail = self
            .fail_next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(SocketError::InvalidTarget(format!(
                "loopback refused {}",
                target.url
            )));
        }

        let (handle, link) = TransportHandle::pair();
        let peer = LoopbackPeer {
            target: target.clone(),
            link,
            received: VecDeque::new(),
            closed_by_client: false,
        };
        self.peers
            .send(peer)
            .map_err(|_| SocketError::ConnectionClosed("loopback acceptor dropped".into()))?;
        self.opened.fetch_add(1, Ordering::AcqRel);
        Ok(handle)
    }
}

impl LoopbackAcceptor {
    /// Take the next peer if one is waiting
    pub fn try_accept(&self) -> Option<LoopbackPeer> {
        self.peers.try_recv().ok()
    }

    /// Wait up to `timeout` for the next peer
    pub fn accept_timeout(&self, timeout: Duration) -> Option<LoopbackPeer> {
        match self.peers.recv_timeout(timeout) {
            Ok(peer) => Some(peer),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of peers waiting to be accepted
    pub fn pending(&self) -> usize {
        self.peers.len()
    }
}

impl LoopbackPeer {
    /// Address and protocols the manager asked for
    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    /// Report a successful open. Returns false if the manager detached.
    pub fn open(&self) -> bool {
        self.link.emit(TransportEvent::Opened)
    }

    /// Deliver an inbound payload
    pub fn message(&self, payload: impl Into<Payload>) -> bool {
        self.link.emit(TransportEvent::Message(payload.into()))
    }

    /// Report a transport error
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.link
            .emit(TransportEvent::Error(SocketError::WebSocket(message.into())))
    }

    /// Report a closure with the given code and reason
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        self.link
            .emit(TransportEvent::Closed(CloseInfo::new(code, reason)))
    }

    /// Next payload the manager sent, if any
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.poll_commands();
        self.received.pop_front()
    }

    /// Everything the manager sent so far, in order
    pub fn drain_sent(&mut self) -> Vec<Payload> {
        self.poll_commands();
        self.received.drain(..).collect()
    }

    /// True once the manager asked to close or dropped its handle
    pub fn is_closed_by_client(&mut self) -> bool {
        self.poll_commands();
        self.closed_by_client
    }

    fn poll_commands(&mut self) {
        loop {
            match self.link.commands.try_recv() {
                Ok(TransportCommand::Send(payload)) => self.received.push_back(payload),
                Ok(TransportCommand::Close) => self.closed_by_client = true,
                Err(TryRecvError::Disconnected) => {
                    self.closed_by_client = true;
                    return;
                }
                Err(TryRecvError::Empty) => return,
            }
        }
    }
}
