//! Agreement under degraded transport conditions.

use concord_simulation::{CommitRole, NetworkConfig, SimulationConfig, SimulationRunner};
use concord_types::{AgreementState, ChannelId, PeerId};
use std::time::Duration;
use tracing_test::traced_test;

const CH0: ChannelId = ChannelId::MIN;

#[traced_test]
#[test]
fn test_timeout_commits_without_replication() {
    let network = NetworkConfig {
        replication_enabled: false,
        ..Default::default()
    };
    let config = SimulationConfig::new(2).with_network(network);
    let mut runner = SimulationRunner::new(config).unwrap();
    assert!(runner.propose(PeerId(0), CH0, "forced").unwrap());

    runner.run_for(Duration::from_millis(9900));
    assert_eq!(runner.state(PeerId(0), CH0).unwrap(), AgreementState::Proposed);
    assert_eq!(runner.state(PeerId(1), CH0).unwrap(), AgreementState::Received);
    assert!(runner.commits().is_empty());

    runner.step();
    let commits = runner.commits().to_vec();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].role, CommitRole::Sent);
    assert_eq!(commits[0].time, Duration::from_secs(10));

    // Ready and Command arrive together and are drained in the same tick.
    runner.step();
    assert_eq!(runner.barriers().len(), 1);
    let commits = runner.commits();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[1].role, CommitRole::Received);
    assert_eq!(commits[1].payload, "forced");
    assert!(runner.all_free());
}

#[traced_test]
#[test]
fn test_timeout_commits_when_nobody_prepares() {
    let config = SimulationConfig::new(2).with_prepare_delay(None);
    let mut runner = SimulationRunner::new(config).unwrap();
    assert!(runner.propose(PeerId(0), CH0, "slow").unwrap());

    runner.run_for(Duration::from_secs(5));
    assert_eq!(runner.state(PeerId(0), CH0).unwrap(), AgreementState::Ready);
    assert_eq!(runner.state(PeerId(1), CH0).unwrap(), AgreementState::Preparing);

    assert!(runner.run_until(Duration::from_secs(11), |r| r.all_free()));
    let commits = runner.commits();
    assert_eq!(commits[0].time, Duration::from_secs(10));
    assert_eq!(commits[1].payload, "slow");
    assert_eq!(runner.stats().prepares_confirmed, 0);
}

#[test]
fn test_slow_prepare_delays_commit() {
    let config = SimulationConfig::new(2).with_prepare_delay(Some(Duration::from_secs(1)));
    let mut runner = SimulationRunner::new(config).unwrap();
    assert!(runner.propose(PeerId(0), CH0, "p").unwrap());

    assert!(runner.run_until(Duration::from_secs(5), |r| r.all_free()));
    // Barrier at 0.3s, prepared at 1.3s, seen by the proposer one round later.
    assert_eq!(runner.barriers()[0].time, Duration::from_millis(300));
    assert_eq!(runner.commits()[0].time, Duration::from_millis(1400));
}

#[traced_test]
#[test]
fn test_duplicate_command_commits_once() {
    let network = NetworkConfig {
        duplicate_commands: true,
        ..Default::default()
    };
    let config = SimulationConfig::new(3).with_network(network);
    let mut runner = SimulationRunner::new(config).unwrap();
    assert!(runner.propose(PeerId(2), CH0, "once").unwrap());

    assert!(runner.run_until(Duration::from_secs(5), |r| r.all_free()));
    runner.run_for(Duration::from_secs(1));

    for peer in [PeerId(0), PeerId(1)] {
        let received: Vec<_> = runner
            .commits()
            .iter()
            .filter(|c| c.peer == peer)
            .collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].payload, "once");
    }
    // Two copies to each of two receivers.
    assert_eq!(runner.stats().network.events_delivered, 2 + 2 + 4);
}

#[test]
fn test_replication_lag_slows_but_does_not_break() {
    let network = NetworkConfig {
        replication_lag: Duration::from_millis(450),
        ..Default::default()
    };
    let config = SimulationConfig::new(3).with_network(network);
    let mut runner = SimulationRunner::new(config).unwrap();
    assert!(runner.propose(PeerId(0), CH0, "lagged").unwrap());

    assert!(runner.run_until(Duration::from_secs(5), |r| r.all_free()));
    let commits = runner.commits();
    assert_eq!(commits.len(), 3);
    assert!(commits.iter().all(|c| c.payload == "lagged"));
    assert!(commits[0].time > Duration::from_millis(400));
}

#[test]
fn test_large_replication_lag_can_commit_twice() {
    // Several ticks of lag let two backed-off peers read each other as
    // `Received` and both reach `Ready`. Single commit only holds while
    // replication keeps up with the tick.
    let network = NetworkConfig {
        replication_lag: Duration::from_millis(450),
        ..Default::default()
    };
    let double_commits = (0..150)
        .filter(|seed| {
            let config = SimulationConfig::new(3)
                .with_network(network.clone())
                .with_seed(*seed);
            let mut runner = SimulationRunner::new(config).unwrap();
            for (peer, payload) in [(0, "a"), (1, "b"), (2, "c")] {
                runner.propose(PeerId(peer), CH0, payload).unwrap();
            }
            runner.run_until(Duration::from_secs(120), |r| {
                r.all_free() && r.commits().iter().any(|c| c.role == CommitRole::Sent)
            });
            runner.run_for(Duration::from_secs(20));
            runner
                .commits()
                .iter()
                .filter(|c| c.role == CommitRole::Sent)
                .count()
                > 1
        })
        .count();
    assert!(double_commits > 0);
}
