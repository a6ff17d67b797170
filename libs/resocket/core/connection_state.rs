use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

/// Connection lifecycle state
///
/// `Destroyed` is terminal: once reached, no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Initializing = 0,
    Opened = 1,
    Errored = 2,
    Closed = 3,
    Destroyed = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Initializing,
            1 => ConnectionState::Opened,
            2 => ConnectionState::Errored,
            3 => ConnectionState::Closed,
            _ => ConnectionState::Destroyed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Initializing => "initializing",
            ConnectionState::Opened => "opened",
            ConnectionState::Errored => "errored",
            ConnectionState::Closed => "closed",
            ConnectionState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Lock-free connection state shared between the driver task and handles
#[derive(Debug)]
pub struct AtomicConnectionState {
    state: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `state` unless already destroyed. Returns whether it moved.
    ///
    /// Use [`AtomicConnectionState::destroy`] to enter `Destroyed`.
    pub fn set(&self, state: ConnectionState) -> bool {
        debug_assert_ne!(state, ConnectionState::Destroyed);
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != ConnectionState::Destroyed as u8).then_some(state as u8)
            })
            .is_ok()
    }

    /// Atomically swap `from` for `to`; fails if the current state differs
    pub fn compare_exchange(
        &self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    /// Enter `Destroyed`. Returns true only for the call that made the move.
    pub fn destroy(&self) -> bool {
        self.state.swap(ConnectionState::Destroyed as u8, Ordering::AcqRel)
            != ConnectionState::Destroyed as u8
    }

    #[inline]
    pub fn is_opened(&self) -> bool {
        self.get() == ConnectionState::Opened
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.get() == ConnectionState::Destroyed
    }
}

/// Counters describing a manager's traffic and recovery history
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    messages_evicted: AtomicU64,
    reconnect_attempts: AtomicU64,
    buffered: AtomicU64,
    reconnect_pending: AtomicBool,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_evicted(&self) {
        self.messages_evicted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn messages_evicted(&self) -> u64 {
        self.messages_evicted.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn set_buffered(&self, count: usize) {
        self.buffered.store(count as u64, Ordering::Release);
    }

    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Acquire) as usize
    }

    pub(crate) fn set_reconnect_pending(&self, pending: bool) {
        self.reconnect_pending.store(pending, Ordering::Release);
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending.load(Ordering::Acquire)
    }
}
