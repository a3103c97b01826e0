//! Agreement states and the event kinds derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Local state of one agreement channel.
///
/// The first four states form the proposal phase (collision detection and
/// backoff); the last four form the barrier phase leading to a commit pulse.
///
/// Each state has a fixed base value. The base value is what gets replicated
/// through the peer state store, and `base + channel` is the wire code of the
/// corresponding event, so values are spaced ten apart.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AgreementState {
    /// Idle; may propose.
    #[default]
    Free,
    /// Broadcast a proposal and waiting for every peer to receive it.
    Proposed,
    /// Collided with another proposal; backing off before retrying.
    Conflicted,
    /// Acknowledged someone else's proposal.
    Received,
    /// Proposer: every peer received, barrier announced.
    Ready,
    /// Barrier reached; the embedder is preparing for the commit.
    Preparing,
    /// The embedder confirmed it is prepared.
    Prepared,
    /// Commit pulse. Never observed across ticks.
    Command,
}

impl AgreementState {
    /// All states in base-value order.
    pub const ALL: [AgreementState; 8] = [
        AgreementState::Free,
        AgreementState::Proposed,
        AgreementState::Conflicted,
        AgreementState::Received,
        AgreementState::Ready,
        AgreementState::Preparing,
        AgreementState::Prepared,
        AgreementState::Command,
    ];

    /// States a peer may be in while a new proposal can still win.
    pub const PROPOSAL_PHASE: [AgreementState; 4] = [
        AgreementState::Free,
        AgreementState::Proposed,
        AgreementState::Conflicted,
        AgreementState::Received,
    ];

    /// Base value used for replication and as the event code offset.
    pub fn base_value(self) -> u8 {
        match self {
            AgreementState::Free => 0,
            AgreementState::Proposed => 10,
            AgreementState::Conflicted => 20,
            AgreementState::Received => 30,
            AgreementState::Ready => 40,
            AgreementState::Preparing => 50,
            AgreementState::Prepared => 60,
            AgreementState::Command => 70,
        }
    }

    /// Inverse of [`base_value`](Self::base_value).
    pub fn from_base_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.base_value() == value)
    }

    /// Decode a replicated property value.
    ///
    /// Returns `None` for values that are not a known base value; callers
    /// treat that the same as an absent entry.
    pub fn from_property(value: i32) -> Option<Self> {
        u8::try_from(value).ok().and_then(Self::from_base_value)
    }

    /// Value written to the peer state store.
    pub fn to_property(self) -> i32 {
        i32::from(self.base_value())
    }

    /// The event kind broadcast when entering this state, if any.
    pub fn event_kind(self) -> Option<EventKind> {
        match self {
            AgreementState::Proposed => Some(EventKind::Proposed),
            AgreementState::Ready => Some(EventKind::Ready),
            AgreementState::Command => Some(EventKind::Command),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            AgreementState::Free => "Free",
            AgreementState::Proposed => "Proposed",
            AgreementState::Conflicted => "Conflicted",
            AgreementState::Received => "Received",
            AgreementState::Ready => "Ready",
            AgreementState::Preparing => "Preparing",
            AgreementState::Prepared => "Prepared",
            AgreementState::Command => "Command",
        }
    }
}

impl fmt::Display for AgreementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The three states that are announced as broadcast events.
///
/// Inbound events of these kinds are drained independently, at most one of
/// each per tick, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Proposed,
    Ready,
    Command,
}

impl EventKind {
    /// Drain order within a tick.
    pub const DRAIN_ORDER: [EventKind; 3] =
        [EventKind::Proposed, EventKind::Ready, EventKind::Command];

    /// The state this event announces.
    pub fn state(self) -> AgreementState {
        match self {
            EventKind::Proposed => AgreementState::Proposed,
            EventKind::Ready => AgreementState::Ready,
            EventKind::Command => AgreementState::Command,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state().name())
    }
}
