//! Leaderless agreement state machine.
//!
//! This crate provides a synchronous, poll-driven agreement protocol that
//! lets symmetric peers pick one winning proposal and then commit it at
//! approximately the same moment.
//!
//! # Architecture
//!
//! The state machine advances on `tick(elapsed)`:
//!
//! - Inbound `Proposed` → acknowledge (`Received`) or detect a collision
//!   (`Conflicted`, randomized backoff)
//! - Inbound `Ready` → barrier reached (`Preparing`), embedder prepares and
//!   calls `confirm_prepared`
//! - Inbound `Command` → execute the payload, back to `Free`
//! - Level checks against replicated peer states drive the proposer through
//!   `Proposed` → `Ready` → commit pulse, bounded by `propose_wait_max`
//!
//! All I/O goes through the `MessageChannel` and `PeerStateStore` traits;
//! callbacks are returned as `Notification`s.

mod backoff;
mod config;
mod peers;
mod snapshot;
mod state;

pub use config::AgreementConfig;
pub use snapshot::{AgreementSnapshot, PeerSnapshot};
pub use state::AgreementStateMachine;
