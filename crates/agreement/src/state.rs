//! Agreement state machine.

use crate::backoff::BackoffTimers;
use crate::peers::{PeerCheck, PeerView};
use crate::snapshot::{AgreementSnapshot, PeerSnapshot};
use crate::AgreementConfig;
use concord_core::{Event, EventQueue, EventSink, MessageChannel, Notification, PeerStateStore};
use concord_types::{AgreementState, ChannelId, ConfigError, EventCode, EventKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One agreement instance, owned by the local peer.
///
/// Single-threaded and poll-driven: nothing happens between calls to
/// [`tick`](Self::tick), [`propose`](Self::propose) and
/// [`confirm_prepared`](Self::confirm_prepared). Outbound events go through
/// the [`MessageChannel`], every externally visible state change is
/// replicated through the [`PeerStateStore`], and inbound events are read
/// from this instance's own [`EventQueue`].
pub struct AgreementStateMachine {
    config: AgreementConfig,

    /// Validated channel.
    channel: ChannelId,

    /// Replicated property key for `channel`.
    property_key: String,

    /// Current state. Only changed through `apply_state`.
    state: AgreementState,

    /// Payload of the live proposal. Empty whenever `state` is `Free`.
    payload_cache: String,

    timers: BackoffTimers,

    queue: EventQueue,

    transport: Arc<dyn MessageChannel>,

    store: Arc<dyn PeerStateStore>,
}

impl std::fmt::Debug for AgreementStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgreementStateMachine")
            .field("channel", &self.channel)
            .field("state", &self.state)
            .field("payload_cache", &self.payload_cache)
            .field("timers", &self.timers)
            .field("pending_events", &self.queue.len())
            .finish()
    }
}

impl AgreementStateMachine {
    /// Create a new instance in the `Free` state.
    ///
    /// Fails if the configured channel is outside `0..=9`.
    pub fn new(
        config: AgreementConfig,
        transport: Arc<dyn MessageChannel>,
        store: Arc<dyn PeerStateStore>,
    ) -> Result<Self, ConfigError> {
        let channel = config.channel_id()?;
        let timers = BackoffTimers::new(config.conflict_delay_range, config.seed);
        Ok(Self {
            property_key: channel.property_key(),
            channel,
            state: AgreementState::Free,
            payload_cache: String::new(),
            timers,
            queue: EventQueue::new(channel),
            transport,
            store,
            config,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current state.
    pub fn state(&self) -> AgreementState {
        self.state
    }

    /// Payload of the live proposal, empty when there is none.
    pub fn payload_cache(&self) -> &str {
        &self.payload_cache
    }

    /// Channel this instance runs on.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Property key this instance replicates its state under.
    pub fn property_key(&self) -> &str {
        &self.property_key
    }

    /// Configuration this instance was built with.
    pub fn config(&self) -> &AgreementConfig {
        &self.config
    }

    /// Handle for the transport to deliver inbound events.
    pub fn sink(&self) -> EventSink {
        self.queue.sink()
    }

    /// Number of inbound events not yet drained.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    fn peers(&self) -> PeerView<'_> {
        PeerView::new(self.store.as_ref(), &self.property_key)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    /// Propose `payload` for agreement.
    ///
    /// Only allowed from `Free` or `Conflicted`; returns `false` otherwise
    /// without changing anything. If some peer is already past the proposal
    /// phase, a commit is about to happen: the proposal is kept as a retry
    /// reservation in `Conflicted` and `false` is returned.
    pub fn propose(&mut self, payload: impl Into<String>) -> bool {
        if !matches!(
            self.state,
            AgreementState::Free | AgreementState::Conflicted
        ) {
            debug!(state = %self.state, "Rejecting proposal, already mid-protocol");
            return false;
        }

        self.payload_cache = payload.into();
        let check = self.peers().check(&AgreementState::PROPOSAL_PHASE);
        if let PeerCheck::Blocked { peer, state } = check {
            info!(
                channel = self.channel.get(),
                %peer,
                peer_state = %state,
                "Peer is past the proposal phase, reserving retry"
            );
            self.apply_state(AgreementState::Conflicted);
            return false;
        }

        self.broadcast(EventKind::Proposed);
        true
    }

    /// Acknowledge the barrier: the local side effects for the commit are done.
    ///
    /// Only allowed from `Preparing`.
    pub fn confirm_prepared(&mut self) -> bool {
        if self.state != AgreementState::Preparing {
            debug!(state = %self.state, "Ignoring prepared confirmation");
            return false;
        }
        self.apply_state(AgreementState::Prepared);
        true
    }

    /// Advance timers by `elapsed`, drain inbound events, and apply
    /// transitions.
    ///
    /// Returns the notifications that fired, in order. Never fails.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<Notification> {
        self.timers.advance(elapsed);

        let proposed = self.queue.dequeue(EventKind::Proposed);
        let ready = self.queue.dequeue(EventKind::Ready);
        let command = self.queue.dequeue(EventKind::Command);

        let mut notifications = Vec::new();

        // Event-driven transitions, in fixed kind order.
        if let Some(event) = proposed {
            self.on_proposed(&event);
        }
        if let Some(event) = ready {
            self.on_ready(&event, &mut notifications);
        }
        if let Some(event) = command {
            self.on_command(event, &mut notifications);
        }

        // Level-triggered transitions. Each sees the state left by the
        // previous one, so several may chain within a tick.
        self.check_all_received();
        self.check_conflict_retry();
        self.check_proposal_acknowledged();
        self.check_barrier_complete(&mut notifications);

        notifications
    }

    /// Structured view of local and peer state.
    pub fn snapshot(&self) -> AgreementSnapshot {
        AgreementSnapshot {
            channel: self.channel,
            property_key: self.property_key.clone(),
            state: self.state,
            payload_cache: self.payload_cache.clone(),
            propose_elapsed: self.timers.propose_elapsed(),
            conflict_elapsed: self.timers.conflict_elapsed(),
            conflict_delay: self.timers.conflict_delay(),
            pending_events: self.queue.len(),
            peers: self
                .peers()
                .states()
                .into_iter()
                .map(|(peer, state, replicated)| PeerSnapshot {
                    peer,
                    state,
                    replicated,
                })
                .collect(),
        }
    }

    /// Human-readable dump of local and peer state.
    pub fn debug_snapshot(&self) -> String {
        self.snapshot().to_string()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Event-driven transitions
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_proposed(&mut self, event: &Event) {
        match self.state {
            AgreementState::Free | AgreementState::Conflicted => {
                self.apply_state(AgreementState::Received);
            }
            AgreementState::Proposed => {
                info!(
                    channel = self.channel.get(),
                    "Proposal collided with another proposal"
                );
                self.apply_state(AgreementState::Conflicted);
            }
            state => {
                debug!(%state, payload = %event.payload, "Ignoring proposal");
            }
        }
    }

    fn on_ready(&mut self, event: &Event, notifications: &mut Vec<Notification>) {
        if self.state != AgreementState::Received {
            debug!(state = %self.state, payload = %event.payload, "Ignoring ready");
            return;
        }
        notifications.push(Notification::BarrierReached);
        self.apply_state(AgreementState::Preparing);
    }

    fn on_command(&mut self, event: Event, notifications: &mut Vec<Notification>) {
        // A second delivery of the same pulse finds us already Free.
        if self.state == AgreementState::Free {
            debug!(payload = %event.payload, "Ignoring command while free");
            return;
        }
        info!(
            channel = self.channel.get(),
            payload = %event.payload,
            "Command received"
        );
        notifications.push(Notification::CommandReceived {
            payload: event.payload,
        });
        self.apply_state(AgreementState::Free);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Level-triggered transitions
    // ═══════════════════════════════════════════════════════════════════════════

    /// Everyone acknowledged a proposal and nobody is proposing. Only a peer
    /// still holding its own payload re-enters the backoff.
    fn check_all_received(&mut self) {
        if self.state != AgreementState::Received || self.payload_cache.trim().is_empty() {
            return;
        }
        if self.peers().all_in(&[AgreementState::Received]) {
            info!(
                channel = self.channel.get(),
                "All peers received, nobody proposing; re-entering backoff"
            );
            self.apply_state(AgreementState::Conflicted);
        }
    }

    fn check_conflict_retry(&mut self) {
        if self.state != AgreementState::Conflicted || !self.timers.conflict_expired() {
            return;
        }
        if self.peers().all_in(&AgreementState::PROPOSAL_PHASE) {
            info!(
                channel = self.channel.get(),
                waited = ?self.timers.conflict_elapsed(),
                "Backoff expired, re-proposing"
            );
            self.broadcast(EventKind::Proposed);
        }
    }

    fn check_proposal_acknowledged(&mut self) {
        if self.state != AgreementState::Proposed {
            return;
        }
        let elapsed = self.timers.propose_elapsed();
        let acknowledged = match self.peers().check(&[AgreementState::Received]) {
            PeerCheck::Alone => elapsed >= self.config.dummy_wait,
            PeerCheck::Matched => true,
            PeerCheck::Blocked { .. } => false,
        };
        let timed_out = elapsed >= self.config.propose_wait_max;
        if acknowledged || timed_out {
            info!(
                channel = self.channel.get(),
                acknowledged,
                timed_out,
                "Proposal accepted, announcing barrier"
            );
            self.broadcast(EventKind::Ready);
        }
    }

    fn check_barrier_complete(&mut self, notifications: &mut Vec<Notification>) {
        if self.state != AgreementState::Ready {
            return;
        }
        let prepared = self.peers().all_in(&[AgreementState::Prepared]);
        let timed_out = self.timers.propose_elapsed() >= self.config.propose_wait_max;
        if !(prepared || timed_out) {
            return;
        }

        let payload = self.payload_cache.clone();
        self.broadcast(EventKind::Command);
        info!(
            channel = self.channel.get(),
            %payload,
            prepared,
            timed_out,
            "Command sent"
        );
        notifications.push(Notification::CommandSent { payload });
        self.apply_state(AgreementState::Free);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // State changes
    // ═══════════════════════════════════════════════════════════════════════════

    /// Broadcast `kind` with the current payload, then enter its state.
    fn broadcast(&mut self, kind: EventKind) {
        self.transport
            .send_event(EventCode::new(kind, self.channel), &self.payload_cache);
        self.apply_state(kind.state());
    }

    /// Enter `new`: set the field, replicate it, run the entry action.
    fn apply_state(&mut self, new: AgreementState) {
        let old = std::mem::replace(&mut self.state, new);
        self.store
            .set_local_property(&self.property_key, new.to_property());

        match new {
            AgreementState::Free => self.payload_cache.clear(),
            AgreementState::Proposed => self.timers.start_proposal(),
            AgreementState::Conflicted => {
                let delay = self.timers.start_conflict();
                debug!(?delay, "Drew conflict backoff");
            }
            AgreementState::Received
            | AgreementState::Ready
            | AgreementState::Preparing
            | AgreementState::Prepared
            | AgreementState::Command => {}
        }

        debug!(
            channel = self.channel.get(),
            from = %old,
            to = %new,
            "State transition"
        );
    }
}
