//! Inbound protocol events.

use concord_types::{ChannelId, EventCode, EventKind};

/// An event delivered by the transport.
///
/// Events are **passive data**: they describe a broadcast some other peer
/// made. They are consumed at most once, when the owning state machine
/// drains them from its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Which broadcast this is.
    pub kind: EventKind,
    /// Channel the event belongs to.
    pub channel: ChannelId,
    /// The sender's payload cache at the time of sending.
    pub payload: String,
}

impl Event {
    /// Create a new event.
    pub fn new(kind: EventKind, channel: ChannelId, payload: impl Into<String>) -> Self {
        Self {
            kind,
            channel,
            payload: payload.into(),
        }
    }

    /// Build an event from its wire representation.
    ///
    /// Returns `None` when the code does not name a broadcast kind.
    pub fn from_wire(code: EventCode, payload: impl Into<String>) -> Option<Self> {
        let (kind, channel) = code.decode()?;
        Some(Self::new(kind, channel, payload))
    }

    /// Wire code of this event.
    pub fn code(&self) -> EventCode {
        EventCode::new(self.kind, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_uses_channel_offset() {
        let event = Event::from_wire(EventCode(43), "go").unwrap();
        assert_eq!(event.kind, EventKind::Ready);
        assert_eq!(event.channel, ChannelId::new(3).unwrap());
        assert_eq!(event.payload, "go");
        assert_eq!(event.code(), EventCode(43));
    }

    #[test]
    fn test_from_wire_rejects_unknown_code() {
        assert!(Event::from_wire(EventCode(55), "x").is_none());
    }
}
