//! Read-only introspection of an agreement instance.

use concord_types::{AgreementState, ChannelId, PeerId};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Replicated state of one other peer as seen locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSnapshot {
    pub peer: PeerId,
    pub state: AgreementState,
    /// False when the peer has no entry and `state` is the `Free` default.
    pub replicated: bool,
}

/// Point-in-time view of the local state machine and its peers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementSnapshot {
    pub channel: ChannelId,
    pub property_key: String,
    pub state: AgreementState,
    pub payload_cache: String,
    pub propose_elapsed: Duration,
    pub conflict_elapsed: Duration,
    pub conflict_delay: Duration,
    pub pending_events: usize,
    pub peers: Vec<PeerSnapshot>,
}

impl fmt::Display for AgreementSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Channel={}", self.channel.get())?;
        writeln!(f, "PayloadCache={}", self.payload_cache)?;
        writeln!(
            f,
            "PropKey={}, CurrentState={}",
            self.property_key, self.state
        )?;
        writeln!(
            f,
            "ProposeElapsed={:.3}s, ConflictElapsed={:.3}s, ConflictDelay={:.3}s, PendingEvents={}",
            self.propose_elapsed.as_secs_f64(),
            self.conflict_elapsed.as_secs_f64(),
            self.conflict_delay.as_secs_f64(),
            self.pending_events
        )?;
        for peer in &self.peers {
            write!(f, "p={}, commState={}", peer.peer.0, peer.state)?;
            if !peer.replicated {
                write!(f, " (absent)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
