use crate::traits::Payload;
use std::collections::VecDeque;

/// Capacity-bounded FIFO of received payloads
///
/// When full, pushing evicts the oldest entry so the buffer always holds
/// the most recent `capacity` payloads in arrival order.
#[derive(Debug)]
pub struct MessageBuffer {
    items: VecDeque<Payload>,
    capacity: usize,
}

impl MessageBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a payload, returning the evicted one if the buffer overflowed.
    /// A zero-capacity buffer keeps nothing.
    pub fn push(&mut self, payload: Payload) -> Option<Payload> {
        if self.capacity == 0 {
            return Some(payload);
        }
        self.items.push_back(payload);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Remove and return everything, oldest first
    pub fn drain(&mut self) -> Vec<Payload> {
        self.items.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
