//! Simulation errors.

use concord_types::{ChannelId, ConfigError, PeerId};
use thiserror::Error;

/// Errors raised while building or driving a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation needs at least one peer")]
    NoPeers,

    #[error("Simulation needs at least one channel")]
    NoChannels,

    #[error("Tick interval must be greater than zero")]
    InvalidTickInterval,

    #[error("{0} is already attached to the network")]
    DuplicatePeer(PeerId),

    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("{peer} has no agreement instance on {channel}")]
    UnknownChannel { peer: PeerId, channel: ChannelId },
}
