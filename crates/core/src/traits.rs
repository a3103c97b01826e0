//! Interfaces to the external transport.
//!
//! The agreement core never touches the network. Everything it needs from the
//! outside world goes through these two traits, which a transport adapter
//! (or the simulation) implements.

use concord_types::{EventCode, PeerId};

/// Broadcast side of the transport.
pub trait MessageChannel: Send + Sync {
    /// Broadcast an event to every other peer.
    ///
    /// Fire-and-forget: delivery is assumed reliable and ordered per event
    /// kind, but there is no acknowledgement and the sender does not receive
    /// its own event.
    fn send_event(&self, code: EventCode, payload: &str);
}

/// Replicated per-peer key/value state.
///
/// Each peer writes only its own entry; every other entry is a read of the
/// last value that reached this peer, which may lag the owner's true value.
pub trait PeerStateStore: Send + Sync {
    /// Best-effort replicate `value` under `key` in the local peer's entry.
    fn set_local_property(&self, key: &str, value: i32);

    /// Last known value of `key` for `peer`, or `None` if it never arrived.
    fn peer_property(&self, peer: PeerId, key: &str) -> Option<i32>;

    /// Peers currently visible, excluding the local peer.
    fn other_peers(&self) -> Vec<PeerId>;
}
