//! Configuration errors.

use thiserror::Error;

/// Errors raised while building an agreement instance.
///
/// These are the only hard failures in the protocol; everything that happens
/// after construction is absorbed by the state machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Channel identifier outside `0..=9`.
    #[error("Channel must be 0-9, got {0}")]
    ChannelOutOfRange(u8),

    /// A timing parameter was negative, NaN or infinite.
    #[error("Invalid duration for {name}: {value} seconds")]
    InvalidDuration { name: &'static str, value: f64 },
}
