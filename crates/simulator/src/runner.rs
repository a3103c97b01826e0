//! Workload-driven simulator.

use crate::config::SimulatorConfig;
use concord_simulation::{SimulationError, SimulationReport, SimulationRunner};
use concord_types::{ChannelId, PeerId};
use std::time::Duration;
use tracing::{debug, info};

/// Drives a [`SimulationRunner`] with a periodic proposal workload.
pub struct Simulator {
    config: SimulatorConfig,
    runner: SimulationRunner,
    /// Start of the next proposal round.
    next_round: Duration,
    round: u64,
}

impl Simulator {
    /// Create a new simulator.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulationError> {
        let runner = SimulationRunner::new(config.to_simulation_config())?;
        // Reject unknown proposers up front instead of on the first round.
        for &peer in &config.workload.proposers {
            if peer >= config.num_peers {
                return Err(SimulationError::UnknownPeer(PeerId(peer)));
            }
        }
        Ok(Self {
            config,
            runner,
            next_round: Duration::ZERO,
            round: 0,
        })
    }

    /// Get the underlying runner.
    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    /// Run the workload for `duration` of simulated time.
    ///
    /// Calls `on_snapshot` with the full debug dump every `snapshot_every`,
    /// if set.
    pub fn run_for(
        &mut self,
        duration: Duration,
        snapshot_every: Option<Duration>,
        mut on_snapshot: impl FnMut(&str),
    ) -> Result<SimulationReport, SimulationError> {
        let end = self.runner.now() + duration;
        let mut next_snapshot = snapshot_every.map(|every| self.runner.now() + every);

        info!(
            num_peers = self.config.num_peers,
            proposers = self.config.workload.proposers.len(),
            ?duration,
            "Starting simulation"
        );

        while self.runner.now() < end {
            if self.runner.now() >= self.next_round {
                self.schedule_round()?;
            }
            self.runner.step();

            if let (Some(at), Some(every)) = (next_snapshot, snapshot_every) {
                if self.runner.now() >= at {
                    on_snapshot(&self.runner.debug_snapshot());
                    next_snapshot = Some(at + every);
                }
            }
        }

        let report = self.runner.report();
        info!(
            commits = report.commits.len(),
            barriers = report.barriers,
            "Simulation finished"
        );
        Ok(report)
    }

    fn schedule_round(&mut self) -> Result<(), SimulationError> {
        let start = self.next_round;
        let workload = &self.config.workload;
        let mut offset = Duration::ZERO;

        for &peer in &workload.proposers {
            for &channel in &self.config.channels {
                let channel = ChannelId::new(channel)?;
                let payload = format!("r{}-p{}-c{}", self.round, peer, channel.get());
                self.runner
                    .schedule_proposal(start + offset, PeerId(peer), channel, payload)?;
            }
            offset += workload.stagger;
        }

        debug!(round = self.round, at = ?start, "Scheduled proposal round");
        self.round += 1;
        self.next_round =
            start + workload.proposal_interval.max(self.config.network.tick_interval);
        Ok(())
    }
}
