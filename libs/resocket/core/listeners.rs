//! Listener registry and isolated dispatch
//!
//! Listeners are grouped by [`EventKind`] and kept in registration order.
//! Registration is append-only. Dispatch invokes every listener of a kind
//! in order; a panicking listener is caught and logged and the remaining
//! listeners still run.

use crate::traits::{CloseInfo, Payload, SocketError};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

pub type OpenListener = Arc<dyn Fn() + Send + Sync>;
pub type CloseListener = Arc<dyn Fn(&CloseInfo) + Send + Sync>;
pub type ErrorListener = Arc<dyn Fn(&SocketError) + Send + Sync>;
pub type MessageListener = Arc<dyn Fn(&Payload) + Send + Sync>;
pub type BulkMessageListener = Arc<dyn Fn(&[Payload]) + Send + Sync>;
pub type DestroyListener = Arc<dyn Fn() + Send + Sync>;

/// Listener category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Opened,
    Closed,
    Errored,
    Message,
    BulkMessage,
    Destroyed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Opened => "opened",
            EventKind::Closed => "closed",
            EventKind::Errored => "errored",
            EventKind::Message => "message",
            EventKind::BulkMessage => "bulk-message",
            EventKind::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// A registered callback, tagged with its category
#[derive(Clone)]
pub enum Listener {
    Opened(OpenListener),
    Closed(CloseListener),
    Errored(ErrorListener),
    Message(MessageListener),
    BulkMessage(BulkMessageListener),
    Destroyed(DestroyListener),
}

impl Listener {
    pub fn kind(&self) -> EventKind {
        match self {
            Listener::Opened(_) => EventKind::Opened,
            Listener::Closed(_) => EventKind::Closed,
            Listener::Errored(_) => EventKind::Errored,
            Listener::Message(_) => EventKind::Message,
            Listener::BulkMessage(_) => EventKind::BulkMessage,
            Listener::Destroyed(_) => EventKind::Destroyed,
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({})", self.kind())
    }
}

/// A notification ready to be handed to listeners
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Opened,
    Closed(&'a CloseInfo),
    Errored(&'a SocketError),
    Message(&'a Payload),
    BulkMessage(&'a [Payload]),
    Destroyed,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Opened => EventKind::Opened,
            Event::Closed(_) => EventKind::Closed,
            Event::Errored(_) => EventKind::Errored,
            Event::Message(_) => EventKind::Message,
            Event::BulkMessage(_) => EventKind::BulkMessage,
            Event::Destroyed => EventKind::Destroyed,
        }
    }
}

/// Category → ordered listeners
#[derive(Debug, Default, Clone)]
pub struct ListenerRegistry {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Listener) {
        self.listeners
            .entry(listener.kind())
            .or_default()
            .push(listener);
    }

    /// Clone out the listeners of one kind so they can run without the lock held
    pub fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.listeners.get(&kind).cloned().unwrap_or_default()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    pub fn has(&self, kind: EventKind) -> bool {
        self.count(kind) > 0
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// Invoke `listeners` with `event`, each isolated from the others' panics.
/// `halted` is checked before every listener; once it returns true the
/// remaining listeners are skipped. Returns how many listeners panicked.
pub fn dispatch<H>(id: &str, listeners: &[Listener], event: Event<'_>, halted: H) -> usize
where
    H: Fn() -> bool,
{
    let mut failures = 0;
    for listener in listeners {
        if halted() {
            break;
        }
        let outcome = catch_unwind(AssertUnwindSafe(|| invoke(listener, event)));
        if let Err(panic) = outcome {
            failures += 1;
            error!(
                "[{}] {} listener panicked: {}",
                id,
                event.kind(),
                panic_message(panic.as_ref())
            );
        }
    }
    failures
}

fn invoke(listener: &Listener, event: Event<'_>) {
    match (listener, event) {
        (Listener::Opened(f), Event::Opened) => f(),
        (Listener::Closed(f), Event::Closed(info)) => f(info),
        (Listener::Errored(f), Event::Errored(err)) => f(err),
        (Listener::Message(f), Event::Message(payload)) => f(payload),
        (Listener::BulkMessage(f), Event::BulkMessage(batch)) => f(batch),
        (Listener::Destroyed(f), Event::Destroyed) => f(),
        _ => {}
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
