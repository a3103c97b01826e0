//! Deterministic lockstep simulation runner.
//!
//! Every step advances the clock by one tick interval, delivers due
//! broadcasts, then ticks every agreement instance in peer and channel order.

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::network::{NetworkStats, SimulatedNetwork};
use concord_agreement::{AgreementSnapshot, AgreementStateMachine};
use concord_core::{MessageChannel, Notification, PeerStateStore};
use concord_types::{AgreementState, ChannelId, PeerId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Which side of a commit a peer was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommitRole {
    /// The proposer that emitted the command.
    Sent,
    /// A peer that received the command.
    Received,
}

/// One commit observed on one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub time: Duration,
    pub peer: PeerId,
    pub channel: ChannelId,
    pub payload: String,
    pub role: CommitRole,
}

/// One barrier notification observed on one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BarrierRecord {
    pub time: Duration,
    pub peer: PeerId,
    pub channel: ChannelId,
}

/// Statistics collected during simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    /// Lockstep rounds run.
    pub steps: u64,
    /// Individual `tick` calls across all instances.
    pub ticks: u64,
    /// Proposals accepted by `propose`.
    pub proposals_accepted: u64,
    /// Proposals rejected by `propose`.
    pub proposals_rejected: u64,
    /// Prepared confirmations issued by the runner.
    pub prepares_confirmed: u64,
    /// Transport counters.
    pub network: NetworkStats,
}

/// Final state of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceState {
    pub peer: PeerId,
    pub channel: ChannelId,
    pub state: AgreementState,
}

/// Summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub elapsed: Duration,
    pub num_peers: u32,
    pub channels: Vec<ChannelId>,
    pub commits: Vec<CommitRecord>,
    pub barriers: usize,
    pub final_states: Vec<InstanceState>,
    pub stats: SimulationStats,
}

#[derive(Debug)]
struct ScheduledProposal {
    peer: PeerId,
    channel: ChannelId,
    payload: String,
}

struct SimPeer {
    id: PeerId,
    machines: BTreeMap<ChannelId, AgreementStateMachine>,
    /// Channel -> time at which to confirm prepared.
    pending_prepares: BTreeMap<ChannelId, Duration>,
}

/// Deterministic simulation runner.
///
/// Given the same configuration (seed included), produces identical commits,
/// barriers and final states every run.
pub struct SimulationRunner {
    config: SimulationConfig,
    network: Arc<SimulatedNetwork>,
    peers: Vec<SimPeer>,
    channels: Vec<ChannelId>,
    now: Duration,
    /// Proposals to issue once the clock reaches their time.
    scheduled: BTreeMap<(Duration, u64), ScheduledProposal>,
    sequence: u64,
    commits: Vec<CommitRecord>,
    barriers: Vec<BarrierRecord>,
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Build the network and one agreement instance per peer and channel.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        if config.num_peers == 0 {
            return Err(SimulationError::NoPeers);
        }
        if config.network.tick_interval.is_zero() {
            return Err(SimulationError::InvalidTickInterval);
        }
        let mut channels = config
            .channels
            .iter()
            .map(|c| ChannelId::new(*c))
            .collect::<Result<Vec<_>, _>>()?;
        channels.sort();
        channels.dedup();
        if channels.is_empty() {
            return Err(SimulationError::NoChannels);
        }

        let network = SimulatedNetwork::new(config.network.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut peers = Vec::with_capacity(config.num_peers as usize);
        for index in 0..config.num_peers {
            let id = PeerId(index);
            let transport = network
                .attach(id)
                .ok_or(SimulationError::DuplicatePeer(id))?;

            let mut machines = BTreeMap::new();
            for &channel in &channels {
                let agreement = config
                    .agreement
                    .clone()
                    .with_channel(channel.get())
                    .with_seed(rng.gen());
                let machine = AgreementStateMachine::new(
                    agreement,
                    Arc::clone(&transport) as Arc<dyn MessageChannel>,
                    Arc::clone(&transport) as Arc<dyn PeerStateStore>,
                )?;
                network.register_sink(id, machine.sink());
                machines.insert(channel, machine);
            }

            peers.push(SimPeer {
                id,
                machines,
                pending_prepares: BTreeMap::new(),
            });
        }

        info!(
            num_peers = config.num_peers,
            channels = channels.len(),
            seed = config.seed,
            "Created simulation"
        );

        Ok(Self {
            config,
            network,
            peers,
            channels,
            now: Duration::ZERO,
            scheduled: BTreeMap::new(),
            sequence: 0,
            commits: Vec::new(),
            barriers: Vec::new(),
            stats: SimulationStats::default(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Configuration this run was built with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The shared transport, for toggling fault knobs mid-run.
    pub fn network(&self) -> &SimulatedNetwork {
        &self.network
    }

    /// All commits observed so far, in order.
    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    /// All barrier notifications observed so far, in order.
    pub fn barriers(&self) -> &[BarrierRecord] {
        &self.barriers
    }

    /// Statistics so far.
    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            network: self.network.stats(),
            ..self.stats.clone()
        }
    }

    /// Look up one instance.
    pub fn machine(
        &self,
        peer: PeerId,
        channel: ChannelId,
    ) -> Result<&AgreementStateMachine, SimulationError> {
        self.peer(peer)?
            .machines
            .get(&channel)
            .ok_or(SimulationError::UnknownChannel { peer, channel })
    }

    /// Current state of one instance.
    pub fn state(
        &self,
        peer: PeerId,
        channel: ChannelId,
    ) -> Result<AgreementState, SimulationError> {
        Ok(self.machine(peer, channel)?.state())
    }

    /// Whether every instance is `Free` and nothing is left in flight.
    pub fn all_free(&self) -> bool {
        self.network.in_flight() == 0
            && self.peers.iter().all(|p| {
                p.machines
                    .values()
                    .all(|m| m.state() == AgreementState::Free && m.pending_events() == 0)
            })
    }

    /// Structured snapshot of one instance.
    pub fn snapshot(
        &self,
        peer: PeerId,
        channel: ChannelId,
    ) -> Result<AgreementSnapshot, SimulationError> {
        Ok(self.machine(peer, channel)?.snapshot())
    }

    /// Text dump of every instance.
    pub fn debug_snapshot(&self) -> String {
        let mut out = format!("t={:.3}s\n", self.now.as_secs_f64());
        for peer in &self.peers {
            for machine in peer.machines.values() {
                out.push_str(&format!("[{}]\n{}\n", peer.id, machine.debug_snapshot()));
            }
        }
        out
    }

    /// Summarize the run so far.
    pub fn report(&self) -> SimulationReport {
        let final_states = self
            .peers
            .iter()
            .flat_map(|p| {
                p.machines.iter().map(|(channel, m)| InstanceState {
                    peer: p.id,
                    channel: *channel,
                    state: m.state(),
                })
            })
            .collect();
        SimulationReport {
            seed: self.config.seed,
            elapsed: self.now,
            num_peers: self.config.num_peers,
            channels: self.channels.clone(),
            commits: self.commits.clone(),
            barriers: self.barriers.len(),
            final_states,
            stats: self.stats(),
        }
    }

    fn peer(&self, peer: PeerId) -> Result<&SimPeer, SimulationError> {
        self.peers
            .get(peer.0 as usize)
            .ok_or(SimulationError::UnknownPeer(peer))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════════

    /// Propose `payload` on one instance right now.
    pub fn propose(
        &mut self,
        peer: PeerId,
        channel: ChannelId,
        payload: impl Into<String>,
    ) -> Result<bool, SimulationError> {
        let payload = payload.into();
        let machine = self
            .peers
            .get_mut(peer.0 as usize)
            .ok_or(SimulationError::UnknownPeer(peer))?
            .machines
            .get_mut(&channel)
            .ok_or(SimulationError::UnknownChannel { peer, channel })?;

        let accepted = machine.propose(payload.as_str());
        if accepted {
            self.stats.proposals_accepted += 1;
        } else {
            self.stats.proposals_rejected += 1;
        }
        debug!(%peer, channel = channel.get(), %payload, accepted, "Proposal");
        Ok(accepted)
    }

    /// Propose `payload` at the first step whose time is at least `at`.
    pub fn schedule_proposal(
        &mut self,
        at: Duration,
        peer: PeerId,
        channel: ChannelId,
        payload: impl Into<String>,
    ) -> Result<(), SimulationError> {
        self.machine(peer, channel)?;
        let seq = self.sequence;
        self.sequence += 1;
        self.scheduled.insert(
            (at, seq),
            ScheduledProposal {
                peer,
                channel,
                payload: payload.into(),
            },
        );
        Ok(())
    }

    /// Run one lockstep round.
    pub fn step(&mut self) {
        let interval = self.config.network.tick_interval;
        self.now += interval;
        self.stats.steps += 1;
        self.network.advance_to(self.now);

        let later = self
            .scheduled
            .split_off(&(self.now.saturating_add(Duration::from_nanos(1)), 0));
        let due = std::mem::replace(&mut self.scheduled, later);
        for (_, proposal) in due {
            if let Err(e) = self.propose(proposal.peer, proposal.channel, proposal.payload) {
                warn!(error = %e, "Dropping scheduled proposal");
            }
        }

        let now = self.now;
        let prepare_delay = self.config.prepare_delay;
        for peer in &mut self.peers {
            for (channel, machine) in &mut peer.machines {
                let notifications = machine.tick(interval);
                self.stats.ticks += 1;

                for notification in notifications {
                    trace!(
                        peer = %peer.id,
                        channel = channel.get(),
                        kind = notification.type_name(),
                        "Notification"
                    );
                    match notification {
                        Notification::BarrierReached => {
                            self.barriers.push(BarrierRecord {
                                time: now,
                                peer: peer.id,
                                channel: *channel,
                            });
                            if let Some(delay) = prepare_delay {
                                peer.pending_prepares.insert(*channel, now + delay);
                            }
                        }
                        Notification::CommandReceived { payload } => {
                            self.commits.push(CommitRecord {
                                time: now,
                                peer: peer.id,
                                channel: *channel,
                                payload,
                                role: CommitRole::Received,
                            });
                        }
                        Notification::CommandSent { payload } => {
                            info!(
                                peer = %peer.id,
                                channel = channel.get(),
                                %payload,
                                time = ?now,
                                "Committed"
                            );
                            self.commits.push(CommitRecord {
                                time: now,
                                peer: peer.id,
                                channel: *channel,
                                payload,
                                role: CommitRole::Sent,
                            });
                        }
                    }
                }

                if peer
                    .pending_prepares
                    .get(channel)
                    .is_some_and(|due| *due <= now)
                {
                    peer.pending_prepares.remove(channel);
                    if machine.confirm_prepared() {
                        self.stats.prepares_confirmed += 1;
                    }
                }
            }
        }
    }

    /// Run for `duration` of simulated time.
    pub fn run_for(&mut self, duration: Duration) {
        let end = self.now + duration;
        while self.now < end {
            self.step();
        }
    }

    /// Step until `done` holds or the clock passes `deadline`.
    ///
    /// Returns whether `done` held.
    pub fn run_until(&mut self, deadline: Duration, mut done: impl FnMut(&Self) -> bool) -> bool {
        while self.now < deadline {
            self.step();
            if done(self) {
                return true;
            }
        }
        done(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkConfig;
    use tracing_test::traced_test;

    const CH0: ChannelId = ChannelId::MIN;

    #[test]
    fn test_rejects_empty_configs() {
        assert!(matches!(
            SimulationRunner::new(SimulationConfig::new(0)),
            Err(SimulationError::NoPeers)
        ));
        assert!(matches!(
            SimulationRunner::new(SimulationConfig::new(2).with_channels(vec![])),
            Err(SimulationError::NoChannels)
        ));
        assert!(matches!(
            SimulationRunner::new(SimulationConfig::new(2).with_channels(vec![10])),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_zero_tick_interval() {
        let network = NetworkConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        let config = SimulationConfig::new(2).with_network(network);
        assert!(matches!(
            SimulationRunner::new(config),
            Err(SimulationError::InvalidTickInterval)
        ));
    }

    #[test]
    fn test_unknown_targets() {
        let mut runner = SimulationRunner::new(SimulationConfig::new(2)).unwrap();
        assert!(matches!(
            runner.propose(PeerId(5), CH0, "x"),
            Err(SimulationError::UnknownPeer(PeerId(5)))
        ));
        let ch3 = ChannelId::new(3).unwrap();
        assert!(matches!(
            runner.propose(PeerId(0), ch3, "x"),
            Err(SimulationError::UnknownChannel { .. })
        ));
    }

    #[traced_test]
    #[test]
    fn test_two_peer_timeline() {
        let mut runner = SimulationRunner::new(SimulationConfig::new(2)).unwrap();
        assert!(runner.propose(PeerId(0), CH0, "X").unwrap());

        runner.step();
        assert_eq!(runner.state(PeerId(1), CH0).unwrap(), AgreementState::Received);
        runner.step();
        assert_eq!(runner.state(PeerId(0), CH0).unwrap(), AgreementState::Ready);
        runner.step();
        // Zero prepare delay confirms within the same round.
        assert_eq!(runner.state(PeerId(1), CH0).unwrap(), AgreementState::Prepared);
        runner.step();
        assert_eq!(runner.state(PeerId(0), CH0).unwrap(), AgreementState::Free);
        runner.step();
        assert!(runner.all_free());

        let commits = runner.commits();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].role, CommitRole::Sent);
        assert_eq!(commits[0].time, Duration::from_millis(400));
        assert_eq!(commits[1].role, CommitRole::Received);
        assert_eq!(commits[1].peer, PeerId(1));
        assert_eq!(commits[1].time, Duration::from_millis(500));
        assert_eq!(runner.barriers().len(), 1);
        assert_eq!(runner.stats().prepares_confirmed, 1);
    }

    #[test]
    fn test_scheduled_proposal() {
        let mut runner = SimulationRunner::new(SimulationConfig::new(2)).unwrap();
        runner
            .schedule_proposal(Duration::from_millis(300), PeerId(1), CH0, "later")
            .unwrap();
        runner.run_for(Duration::from_millis(200));
        assert_eq!(runner.state(PeerId(1), CH0).unwrap(), AgreementState::Free);
        runner.step();
        assert_eq!(runner.state(PeerId(1), CH0).unwrap(), AgreementState::Proposed);
        assert_eq!(runner.stats().proposals_accepted, 1);
    }

    #[test]
    fn test_report_lists_every_instance() {
        let config = SimulationConfig::new(3).with_channels(vec![0, 2]);
        let runner = SimulationRunner::new(config).unwrap();
        let report = runner.report();
        assert_eq!(report.final_states.len(), 6);
        assert!(report
            .final_states
            .iter()
            .all(|s| s.state == AgreementState::Free));
        assert!(runner.debug_snapshot().contains("PropKey=FlowControlHelper_COMM_STATE2"));
    }
}
