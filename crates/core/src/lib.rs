//! Core types for the Concord agreement protocol.
//!
//! This crate provides the plumbing between the transport and the agreement
//! state machine:
//!
//! - [`Event`]: inbound broadcasts from other peers
//! - [`Notification`]: outputs the embedder must react to
//! - [`EventQueue`] / [`EventSink`]: per-channel ingestion buffer
//! - [`ChannelRouter`]: demux of raw wire codes onto channel queues
//! - [`MessageChannel`] / [`PeerStateStore`]: the transport interfaces
//!
//! # Architecture
//!
//! ```text
//! transport ──► ChannelRouter ──► EventQueue (per channel)
//!                                      │ drained by tick()
//!                                      ▼
//!                           AgreementStateMachine ──► Vec<Notification>
//!                              │            │
//!                 MessageChannel      PeerStateStore
//! ```

mod event;
mod notification;
mod queue;
mod router;
mod traits;

pub use event::Event;
pub use notification::Notification;
pub use queue::{EventQueue, EventSink, QueueError};
pub use router::{ChannelRouter, Delivery, RouteError};
pub use traits::{MessageChannel, PeerStateStore};
