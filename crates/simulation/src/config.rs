//! Simulation configuration.

use crate::network::NetworkConfig;
use concord_agreement::AgreementConfig;
use std::time::Duration;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of peers, numbered from zero.
    pub num_peers: u32,

    /// Channels every peer runs an agreement instance on.
    pub channels: Vec<u8>,

    /// Timing template for every instance. The channel and seed are
    /// overridden per instance.
    pub agreement: AgreementConfig,

    /// Transport timing and fault knobs.
    pub network: NetworkConfig,

    /// How long after reaching the barrier a peer confirms it is prepared.
    /// `None` means peers never confirm and the proposer's timeout decides.
    pub prepare_delay: Option<Duration>,

    /// Random seed. Per-instance backoff seeds are derived from it.
    pub seed: u64,
}

impl SimulationConfig {
    /// Create a configuration with `num_peers` peers on channel 0.
    pub fn new(num_peers: u32) -> Self {
        Self {
            num_peers,
            channels: vec![0],
            agreement: AgreementConfig::default(),
            network: NetworkConfig::default(),
            prepare_delay: Some(Duration::ZERO),
            seed: 12345,
        }
    }

    /// Set the channels every peer runs.
    pub fn with_channels(mut self, channels: Vec<u8>) -> Self {
        self.channels = channels;
        self
    }

    /// Set the agreement timing template.
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

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
