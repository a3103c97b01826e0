//! Per-channel ingestion buffer.
//!
//! The transport pushes events through an [`EventSink`], possibly from another
//! thread. The owning state machine drains the [`EventQueue`] on its tick
//! thread, one event kind at a time.

use crate::Event;
use concord_types::{ChannelId, EventKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Errors when pushing into a queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The event is addressed to another channel.
    #[error("Event for {got} pushed into queue of {expected}")]
    WrongChannel { expected: ChannelId, got: ChannelId },

    /// The owning queue has been dropped.
    #[error("Event queue for {0} is closed")]
    Closed(ChannelId),
}

/// `None` once the queue has been dropped.
type Shared = Arc<Mutex<Option<VecDeque<Event>>>>;

/// Inbound event buffer owned by one state machine.
#[derive(Debug)]
pub struct EventQueue {
    channel: ChannelId,
    events: Shared,
}

impl EventQueue {
    /// Create an empty queue for `channel`.
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            events: Arc::new(Mutex::new(Some(VecDeque::new()))),
        }
    }

    /// Channel this queue accepts.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Handle the transport uses to deliver events.
    pub fn sink(&self) -> EventSink {
        EventSink {
            channel: self.channel,
            events: Arc::clone(&self.events),
        }
    }

    /// Remove and return the oldest queued event of `kind`.
    ///
    /// Events of other kinds keep their position.
    pub fn dequeue(&self, kind: EventKind) -> Option<Event> {
        let mut guard = self.events.lock();
        let events = guard.as_mut()?;
        let position = events.iter().position(|e| e.kind == kind)?;
        events.remove(position)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.lock().as_ref().map_or(0, VecDeque::len)
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued event.
    pub fn clear(&self) {
        if let Some(events) = self.events.lock().as_mut() {
            events.clear();
        }
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        *self.events.lock() = None;
    }
}

/// Cloneable, thread-safe producer handle for an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct EventSink {
    channel: ChannelId,
    events: Shared,
}

impl EventSink {
    /// Channel this sink delivers to.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Append an event.
    pub fn push(&self, event: Event) -> Result<(), QueueError> {
        if event.channel != self.channel {
            return Err(QueueError::WrongChannel {
                expected: self.channel,
                got: event.channel,
            });
        }
        match self.events.lock().as_mut() {
            Some(events) => {
                events.push_back(event);
                Ok(())
            }
            None => Err(QueueError::Closed(self.channel)),
        }
    }

    /// Whether the owning queue still exists.
    pub fn is_closed(&self) -> bool {
        self.events.lock().is_none()
    }
}
