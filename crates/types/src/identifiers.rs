//! Domain-specific identifier types.

use crate::{AgreementState, ConfigError, EventKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of the replicated property key. The channel digit is appended.
pub const PROPERTY_KEY_PREFIX: &str = "FlowControlHelper_COMM_STATE";

/// Peer identifier, as assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}

/// Identifier of one agreement instance multiplexed over a shared transport.
///
/// Always in `0..=9`: the channel is added to state base values (spaced ten
/// apart) to form event codes, and appended as a single digit to the
/// property key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChannelId(u8);

impl ChannelId {
    /// Channel 0, the default.
    pub const MIN: ChannelId = ChannelId(0);

    /// Highest valid channel.
    pub const MAX: u8 = 9;

    /// Create a channel identifier, rejecting values above [`ChannelId::MAX`].
    pub fn new(value: u8) -> Result<Self, ConfigError> {
        if value > Self::MAX {
            return Err(ConfigError::ChannelOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Get the raw value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Key under which this channel's state is replicated.
    pub fn property_key(self) -> String {
        format!("{}{}", PROPERTY_KEY_PREFIX, self.0)
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelId> for u8 {
    fn from(channel: ChannelId) -> u8 {
        channel.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({})", self.0)
    }
}

/// Event code as carried on the wire: `state base value + channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCode(pub u8);

impl EventCode {
    /// Code of `kind` on `channel`.
    pub fn new(kind: EventKind, channel: ChannelId) -> Self {
        EventCode(kind.state().base_value() + channel.get())
    }

    /// Split a wire code into the event kind and channel.
    ///
    /// Returns `None` when the base is not a broadcast state.
    pub fn decode(self) -> Option<(EventKind, ChannelId)> {
        let channel = ChannelId(self.0 % 10);
        let kind = AgreementState::from_base_value(self.0 - channel.0)?.event_kind()?;
        Some((kind, channel))
    }

    /// Get the raw value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({})", self.0)
    }
}
