//! Evaluation of other peers' replicated states.
//!
//! Every read here may be stale. Callers re-evaluate on every tick, so a
//! lagging read corrects itself once the write propagates.

use concord_core::PeerStateStore;
use concord_types::{AgreementState, PeerId};

/// Result of checking every visible peer against a set of expected states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PeerCheck {
    /// No other peer is visible.
    Alone,
    /// Every visible peer is in one of the expected states.
    Matched,
    /// The first peer found outside the expected states.
    Blocked {
        peer: PeerId,
        state: AgreementState,
    },
}

impl PeerCheck {
    /// Whether the condition holds, counting the empty peer set as a match.
    pub(crate) fn holds(self) -> bool {
        !matches!(self, PeerCheck::Blocked { .. })
    }
}

/// Read-only view of the other peers on one channel.
pub(crate) struct PeerView<'a> {
    store: &'a dyn PeerStateStore,
    key: &'a str,
}

impl<'a> PeerView<'a> {
    pub(crate) fn new(store: &'a dyn PeerStateStore, key: &'a str) -> Self {
        Self { store, key }
    }

    /// State of `peer`. Missing or unrecognized entries read as `Free`.
    pub(crate) fn state_of(&self, peer: PeerId) -> AgreementState {
        self.store
            .peer_property(peer, self.key)
            .and_then(AgreementState::from_property)
            .unwrap_or_default()
    }

    /// All visible peers with their states, sorted by peer id.
    pub(crate) fn states(&self) -> Vec<(PeerId, AgreementState, bool)> {
        let mut peers: Vec<_> = self
            .store
            .other_peers()
            .into_iter()
            .map(|peer| {
                let raw = self.store.peer_property(peer, self.key);
                let state = raw
                    .and_then(AgreementState::from_property)
                    .unwrap_or_default();
                (peer, state, raw.is_some())
            })
            .collect();
        peers.sort_by_key(|(peer, _, _)| *peer);
        peers
    }

    /// Check every visible peer against `expected`.
    pub(crate) fn check(&self, expected: &[AgreementState]) -> PeerCheck {
        let peers = self.store.other_peers();
        if peers.is_empty() {
            return PeerCheck::Alone;
        }
        for peer in peers {
            let state = self.state_of(peer);
            if !expected.contains(&state) {
                return PeerCheck::Blocked { peer, state };
            }
        }
        PeerCheck::Matched
    }

    /// Shorthand for `check(expected).holds()`.
    pub(crate) fn all_in(&self, expected: &[AgreementState]) -> bool {
        self.check(expected).holds()
    }
}
