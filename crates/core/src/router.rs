//! Transport-side demultiplexing of wire codes onto channel queues.

use crate::{Event, EventSink, QueueError};
use concord_types::{ChannelId, EventCode};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors when routing a raw event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The code is not a broadcast kind on any channel.
    #[error("Unknown event code: {0}")]
    UnknownCode(u8),

    /// The destination queue refused the event.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Outcome of routing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Pushed into the channel's queue.
    Delivered,
    /// No instance is registered for the channel; the event was dropped.
    Unclaimed,
}

/// Routes inbound events to the queue of the channel that owns them.
///
/// One router sits at the transport adapter boundary and serves every
/// agreement instance sharing that transport.
#[derive(Debug, Default)]
pub struct ChannelRouter {
    sinks: HashMap<ChannelId, EventSink>,
    dropped: u64,
}

impl ChannelRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sink for its channel, replacing any previous one.
    pub fn register(&mut self, sink: EventSink) -> Option<EventSink> {
        self.sinks.insert(sink.channel(), sink)
    }

    /// Stop routing to `channel`.
    pub fn unregister(&mut self, channel: ChannelId) -> Option<EventSink> {
        self.sinks.remove(&channel)
    }

    /// Route a decoded event.
    pub fn route(&mut self, event: Event) -> Result<Delivery, RouteError> {
        match self.sinks.get(&event.channel) {
            Some(sink) => {
                sink.push(event)?;
                Ok(Delivery::Delivered)
            }
            None => {
                self.dropped += 1;
                debug!(
                    channel = %event.channel,
                    kind = %event.kind,
                    "No instance for channel, dropping event"
                );
                Ok(Delivery::Unclaimed)
            }
        }
    }

    /// Decode and route a raw `(code, payload)` pair as received from the wire.
    pub fn route_raw(
        &mut self,
        code: u8,
        payload: impl Into<String>,
    ) -> Result<Delivery, RouteError> {
        let Some(event) = Event::from_wire(EventCode(code), payload) else {
            warn!(code, "Ignoring event with unknown code");
            return Err(RouteError::UnknownCode(code));
        };
        self.route(event)
    }

    /// Number of events dropped because no channel claimed them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Check if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
