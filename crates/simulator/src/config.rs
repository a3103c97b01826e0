//! Configuration types for the simulator.

use concord_agreement::AgreementConfig;
use concord_simulation::{NetworkConfig, SimulationConfig};
use std::time::Duration;

/// Configuration for a simulator run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Number of peers.
    pub num_peers: u32,

    /// Channels every peer runs.
    pub channels: Vec<u8>,

    /// Agreement timing shared by every instance.
    pub agreement: AgreementConfig,

    /// Transport timing and fault knobs.
    pub network: NetworkConfig,

    /// Delay between reaching the barrier and confirming prepared.
    /// `None` leaves every commit to the proposer's timeout.
    pub prepare_delay: Option<Duration>,

    /// Workload configuration.
    pub workload: WorkloadConfig,

    /// Random seed for deterministic simulation.
    pub seed: u64,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(num_peers: u32) -> Self {
        Self {
            num_peers,
            channels: vec![0],
            agreement: AgreementConfig::default(),
            network: NetworkConfig::default(),
            prepare_delay: Some(Duration::from_millis(200)),
            workload: WorkloadConfig::default(),
            seed: 12345,
        }
    }

    /// Set the channels every peer runs.
    pub fn with_channels(mut self, channels: Vec<u8>) -> Self {
        self.channels = channels;
        self
    }

    /// Set the agreement timing.
    pub fn with_agreement(mut self, agreement: AgreementConfig) -> Self {
        self.agreement = agreement;
        self
    }

    /// Set the network configuration.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set the prepare delay.
    pub fn with_prepare_delay(mut self, delay: Option<Duration>) -> Self {
        self.prepare_delay = delay;
        self
    }

    /// Set the workload configuration.
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Convert to the underlying simulation configuration.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.num_peers)
            .with_channels(self.channels.clone())
            .with_agreement(self.agreement.clone())
            .with_network(self.network.clone())
            .with_prepare_delay(self.prepare_delay)
            .with_seed(self.seed)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Proposal workload.
#[derive(Clone, Debug)]
pub struct WorkloadConfig {
    /// Peers that propose. Each proposes on every channel.
    pub proposers: Vec<u32>,

    /// Time between proposal rounds (simulated time).
    pub proposal_interval: Duration,

    /// Offset between consecutive proposers within a round. Zero makes
    /// every proposer fire in the same tick.
    pub stagger: Duration,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            proposers: vec![0],
            proposal_interval: Duration::from_secs(5),
            stagger: Duration::ZERO,
        }
    }
}

impl WorkloadConfig {
    /// Every peer in `0..num_peers` proposes.
    pub fn all_peers(num_peers: u32) -> Self {
        Self {
            proposers: (0..num_peers).collect(),
            ..Default::default()
        }
    }

    /// Set the proposing peers.
    pub fn with_proposers(mut self, proposers: Vec<u32>) -> Self {
        self.proposers = proposers;
        self
    }

    /// Set the proposal interval.
    pub fn with_proposal_interval(mut self, interval: Duration) -> Self {
        self.proposal_interval = interval;
        self
    }

    /// Set the stagger between proposers.
    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_config_carries_everything() {
        let config = SimulatorConfig::new(5)
            .with_channels(vec![1, 4])
            .with_prepare_delay(None)
            .with_seed(9);
        let sim = config.to_simulation_config();
        assert_eq!(sim.num_peers, 5);
        assert_eq!(sim.channels, vec![1, 4]);
        assert_eq!(sim.prepare_delay, None);
        assert_eq!(sim.seed, 9);
    }

    #[test]
    fn test_all_peers_workload() {
        let workload = WorkloadConfig::all_peers(3).with_stagger(Duration::from_millis(50));
        assert_eq!(workload.proposers, vec![0, 1, 2]);
        assert_eq!(workload.stagger, Duration::from_millis(50));
    }
}
