//! Concord Simulator
//!
//! A workload simulator built on top of the simulation framework. Runs
//! proposers against a simulated peer group and reports the commit timeline.
//!
//! # Example
//!
//! ```ignore
//! use concord_simulator::{Simulator, SimulatorConfig, WorkloadConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new(4).with_workload(WorkloadConfig::all_peers(4));
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run_for(Duration::from_secs(60), None, |_| {})?;
//! println!("{}", concord_simulator::report::render(&report));
//! ```

pub mod config;
pub mod report;
pub mod runner;

pub use config::{SimulatorConfig, WorkloadConfig};
pub use runner::Simulator;
