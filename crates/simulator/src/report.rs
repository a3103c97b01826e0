//! Human-readable rendering of a simulation report.

use concord_simulation::{CommitRole, SimulationReport};
use std::fmt::Write;

/// Render the commit timeline and summary counters.
pub fn render(report: &SimulationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Simulated {:.1}s with {} peers on {} channel(s), seed {}",
        report.elapsed.as_secs_f64(),
        report.num_peers,
        report.channels.len(),
        report.seed
    );

    let _ = writeln!(out, "\nCommit timeline:");
    if report.commits.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for commit in &report.commits {
        let role = match commit.role {
            CommitRole::Sent => "SENT",
            CommitRole::Received => "RECV",
        };
        let _ = writeln!(
            out,
            "  t={:>8.3}s  {:<9} ch{}  {}  {}",
            commit.time.as_secs_f64(),
            commit.peer.to_string(),
            commit.channel.get(),
            role,
            commit.payload
        );
    }

    let sent = report
        .commits
        .iter()
        .filter(|c| c.role == CommitRole::Sent)
        .count();
    let stats = &report.stats;
    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "  Commits sent:        {}", sent);
    let _ = writeln!(out, "  Commits received:    {}", report.commits.len() - sent);
    let _ = writeln!(out, "  Barriers reached:    {}", report.barriers);
    let _ = writeln!(
        out,
        "  Proposals:           {} accepted, {} rejected",
        stats.proposals_accepted, stats.proposals_rejected
    );
    let _ = writeln!(out, "  Events sent:         {}", stats.network.events_sent);
    let _ = writeln!(out, "  Events delivered:    {}", stats.network.events_delivered);
    let _ = writeln!(out, "  Property writes:     {}", stats.network.property_writes);
    out
}
