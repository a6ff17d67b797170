//! Transport capability seam
//!
//! A [`Connector`] turns a [`ConnectTarget`] into a live [`TransportHandle`].
//! The handle is the manager's only view of the underlying socket: commands
//! go out over one channel, lifecycle events come back over another. Dropping
//! the handle detaches the manager and tells the transport to close.

use crate::error::{Result, SocketError};
use crate::payload::Payload;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Resolved address and negotiation tokens for one connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub url: String,
    pub protocols: Vec<String>,
}

impl ConnectTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            protocols: Vec::new(),
        }
    }

    pub fn with_protocols(mut self, protocols: Vec<String>) -> Self {
        self.protocols = protocols;
        self
    }
}

/// Close code and reason reported with a closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub const NORMAL: u16 = 1000;
    pub const ABNORMAL: u16 = 1006;

    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Closure without a close frame (dropped TCP stream, failed dial)
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Self::ABNORMAL, reason)
    }

    pub fn is_normal(&self) -> bool {
        self.code == Self::NORMAL
    }
}

/// Lifecycle notification emitted by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(Payload),
    Error(SocketError),
    Closed(CloseInfo),
}

/// Instruction from the manager to its transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Send(Payload),
    Close,
}

/// Capability to create transports
///
/// `open` must not block. It performs whatever validation can be done
/// synchronously and starts the connection in the background; an `Err`
/// here is a construction failure, anything later arrives as an event.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, target: &ConnectTarget) -> Result<TransportHandle>;
}

/// Manager-side end of a live transport
#[derive(Debug)]
pub struct TransportHandle {
    commands: UnboundedSender<TransportCommand>,
    events: UnboundedReceiver<TransportEvent>,
}

/// Transport-side end paired with a [`TransportHandle`]
#[derive(Debug)]
pub struct TransportLink {
    pub events: UnboundedSender<TransportEvent>,
    pub commands: UnboundedReceiver<TransportCommand>,
}

impl TransportHandle {
    /// Create a connected handle/link pair
    pub fn pair() -> (TransportHandle, TransportLink) {
        let (command_tx, command_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded_channel();
        (
            TransportHandle {
                commands: command_tx,
                events: event_rx,
            },
            TransportLink {
                events: event_tx,
                commands: command_rx,
            },
        )
    }

    /// Queue a payload for the transport. Returns false if the transport is gone.
    pub fn send(&self, payload: Payload) -> bool {
        self.commands.send(TransportCommand::Send(payload)).is_ok()
    }

    /// Ask the transport to close
    pub fn close(&self) -> Result<()> {
        self.commands
            .send(TransportCommand::Close)
            .map_err(|_| SocketError::ConnectionClosed("transport already gone".into()))
    }

    /// Wait for the next lifecycle event. `None` means the transport ended
    /// without reporting a closure.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

impl TransportLink {
    /// Report an event to the manager. Returns false once the manager detached.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_round_trip() {
        let (mut handle, mut link) = TransportHandle::pair();

        assert!(handle.send(Payload::from("hello")));
        assert_eq!(
            link.commands.recv().await,
            Some(TransportCommand::Send(Payload::from("hello")))
        );

        assert!(link.emit(TransportEvent::Opened));
        assert_eq!(handle.next_event().await, Some(TransportEvent::Opened));
    }

    #[tokio::test]
    async fn test_dropping_handle_detaches() {
        let (handle, mut link) = TransportHandle::pair();
        drop(handle);

        assert!(!link.emit(TransportEvent::Opened));
        assert_eq!(link.commands.recv().await, None);
    }

    #[test]
    fn test_close_after_link_dropped_is_error() {
        let (handle, link) = TransportHandle::pair();
        drop(link);
        assert!(handle.close().is_err());
        assert!(!handle.send(Payload::from("x")));
    }

    #[test]
    fn test_close_info() {
        assert!(CloseInfo::new(1000, "bye").is_normal());
        let abnormal = CloseInfo::abnormal("reset");
        assert_eq!(abnormal.code, CloseInfo::ABNORMAL);
        assert!(!abnormal.is_normal());
    }
}
