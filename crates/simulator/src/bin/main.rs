//! Concord Simulator CLI
//!
//! Runs a proposal workload against a simulated peer group and prints the
//! commit timeline.

use anyhow::{Context, Result};
use clap::Parser;
use concord_agreement::AgreementConfig;
use concord_simulation::NetworkConfig;
use concord_simulator::{report, Simulator, SimulatorConfig, WorkloadConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "concord-sim")]
#[command(about = "Deterministic simulator for the leaderless agreement protocol")]
#[command(version)]
struct Cli {
    /// Number of peers
    #[arg(short, long, default_value = "3")]
    peers: u32,

    /// Channels every peer runs (comma-separated, 0-9)
    #[arg(long, value_delimiter = ',', default_value = "0")]
    channels: Vec<u8>,

    /// Proposing peers (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "0")]
    proposers: Vec<u32>,

    /// Simulated duration (e.g., "30s", "5m")
    #[arg(short, long, default_value = "60s")]
    duration: humantime::Duration,

    /// Time between proposal rounds
    #[arg(long, default_value = "5s")]
    interval: humantime::Duration,

    /// Offset between consecutive proposers within a round
    #[arg(long, default_value = "0s")]
    stagger: humantime::Duration,

    /// Delay between reaching the barrier and confirming prepared
    #[arg(long, default_value = "200ms")]
    prepare_delay: humantime::Duration,

    /// Never confirm prepared; every commit waits for the proposer's timeout
    #[arg(long)]
    no_prepare: bool,

    /// Upper bound on a proposer's wait for acknowledgements
    #[arg(long, default_value = "10s")]
    propose_wait_max: humantime::Duration,

    /// Wait before a peer with no visible peers confirms its own proposal
    #[arg(long, default_value = "1500ms")]
    dummy_wait: humantime::Duration,

    /// Upper bound of the random conflict backoff
    #[arg(long, default_value = "3s")]
    conflict_range: humantime::Duration,

    /// Tick interval
    #[arg(long, default_value = "100ms")]
    tick: humantime::Duration,

    /// Broadcast latency
    #[arg(long, default_value = "50ms")]
    latency: humantime::Duration,

    /// Delay before a state write is visible to other peers
    #[arg(long, default_value = "50ms")]
    replication_lag: humantime::Duration,

    /// Drop every state write instead of replicating it
    #[arg(long)]
    no_replication: bool,

    /// Deliver every Command event twice
    #[arg(long)]
    duplicate_commands: bool,

    /// Random seed
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Log a debug snapshot of every instance at this interval
    #[arg(long)]
    snapshot_every: Option<humantime::Duration>,

    /// Print the report as JSON instead of a timeline
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn to_config(&self) -> SimulatorConfig {
        let agreement = AgreementConfig::default()
            .with_propose_wait_max(*self.propose_wait_max)
            .with_dummy_wait(*self.dummy_wait)
            .with_conflict_delay_range(*self.conflict_range);

        let network = NetworkConfig {
            tick_interval: *self.tick,
            message_latency: *self.latency,
            replication_lag: *self.replication_lag,
            replication_enabled: !self.no_replication,
            duplicate_commands: self.duplicate_commands,
        };

        let workload = WorkloadConfig::default()
            .with_proposers(self.proposers.clone())
            .with_proposal_interval(*self.interval)
            .with_stagger(*self.stagger);

        let prepare_delay = (!self.no_prepare).then_some(*self.prepare_delay);

        SimulatorConfig::new(self.peers)
            .with_channels(self.channels.clone())
            .with_agreement(agreement)
            .with_network(network)
            .with_prepare_delay(prepare_delay)
            .with_workload(workload)
            .with_seed(self.seed)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut simulator =
        Simulator::new(cli.to_config()).context("Failed to build simulation")?;
    let report = simulator
        .run_for(
            *cli.duration,
            cli.snapshot_every.map(|d| *d),
            |dump| tracing::info!("Snapshot\n{}", dump),
        )
        .context("Simulation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render(&report));
    }

    Ok(())
}
