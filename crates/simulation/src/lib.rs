//! Deterministic simulation of agreement peers.
//!
//! Runs any number of peers, each with one agreement instance per channel,
//! over an in-memory transport with fixed latency and replication lag. Given
//! the same configuration and seed, every run produces identical results.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  step():  now += tick_interval                          │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  SimulatedNetwork                                  │ │
//! │  │    in-flight broadcasts (BTreeMap<(time, seq)>)    │ │
//! │  │    property write log, visible after lag           │ │
//! │  │    per-peer ChannelRouter → EventQueue sinks       │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  peers[i].machines[channel].tick(interval)         │ │
//! │  │  Notifications → commits, barriers, prepares       │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod network;
mod runner;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use network::{NetworkConfig, NetworkStats, SimTransport, SimulatedNetwork};
pub use runner::{
    BarrierRecord, CommitRecord, CommitRole, InstanceState, SimulationReport, SimulationRunner,
    SimulationStats,
};
