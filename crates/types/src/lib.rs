//! Core types for the Concord agreement protocol.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - **States**: [`AgreementState`] and the broadcast [`EventKind`]s
//! - **Identifiers**: [`PeerId`], [`ChannelId`], [`EventCode`]
//! - **Errors**: [`ConfigError`]
//!
//! It does not depend on any other workspace crate.

mod error;
mod identifiers;
mod state;

pub use error::ConfigError;
pub use identifiers::{ChannelId, EventCode, PeerId, PROPERTY_KEY_PREFIX};
pub use state::{AgreementState, EventKind};
