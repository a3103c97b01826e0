//! Agreement configuration.

use concord_types::{ChannelId, ConfigError};
use std::time::Duration;

/// Configuration for one agreement instance.
///
/// Immutable for the lifetime of the instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AgreementConfig {
    /// Upper bound on how long a proposer waits in `Proposed` and `Ready`
    /// before forcing the next step. Backstop for stale or missing peer state.
    pub propose_wait_max: Duration,

    /// Minimum time in `Proposed` before a peer that sees no other peers
    /// confirms its own proposal. Gives a freshly joined peer a chance to be
    /// observed.
    pub dummy_wait: Duration,

    /// Conflict backoff is drawn uniformly from `[0, conflict_delay_range]`.
    pub conflict_delay_range: Duration,

    /// Channel index, `0..=9`. Validated when the state machine is built.
    pub channel: u8,

    /// Seed for the backoff RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            propose_wait_max: Duration::from_secs(10),
            dummy_wait: Duration::from_millis(1500),
            conflict_delay_range: Duration::from_secs(3),
            channel: 0,
            seed: None,
        }
    }
}

impl AgreementConfig {
    /// Build a config from second values.
    ///
    /// Fails on negative or non-finite seconds and on channels above 9.
    pub fn from_secs(
        propose_wait_max: f64,
        dummy_wait: f64,
        conflict_delay_range: f64,
        channel: u8,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            propose_wait_max: secs("propose_wait_max", propose_wait_max)?,
            dummy_wait: secs("dummy_wait", dummy_wait)?,
            conflict_delay_range: secs("conflict_delay_range", conflict_delay_range)?,
            channel,
            seed: None,
        };
        config.channel_id()?;
        Ok(config)
    }

    /// Set the proposal timeout.
    pub fn with_propose_wait_max(mut self, wait: Duration) -> Self {
        self.propose_wait_max = wait;
        self
    }

    /// Set the lone-peer wait.
    pub fn with_dummy_wait(mut self, wait: Duration) -> Self {
        self.dummy_wait = wait;
        self
    }

    /// Set the conflict backoff range.
    pub fn with_conflict_delay_range(mut self, range: Duration) -> Self {
        self.conflict_delay_range = range;
        self
    }

    /// Set the channel index.
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set the backoff RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validated channel identifier.
    pub fn channel_id(&self) -> Result<ChannelId, ConfigError> {
        ChannelId::new(self.channel)
    }
}

fn secs(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgreementConfig::default();
        assert_eq!(config.propose_wait_max, Duration::from_secs(10));
        assert_eq!(config.dummy_wait, Duration::from_secs_f64(1.5));
        assert_eq!(config.conflict_delay_range, Duration::from_secs(3));
        assert_eq!(config.channel, 0);
    }

    #[test]
    fn test_from_secs() {
        let config = AgreementConfig::from_secs(15.0, 1.5, 5.0, 2).unwrap();
        assert_eq!(config.propose_wait_max, Duration::from_secs(15));
        assert_eq!(config.conflict_delay_range, Duration::from_secs(5));
        assert_eq!(config.channel_id().unwrap().get(), 2);
    }

    #[test]
    fn test_from_secs_rejects_bad_input() {
        assert_eq!(
            AgreementConfig::from_secs(10.0, 1.5, 3.0, 10),
            Err(ConfigError::ChannelOutOfRange(10))
        );
        assert!(matches!(
            AgreementConfig::from_secs(-1.0, 1.5, 3.0, 0),
            Err(ConfigError::InvalidDuration {
                name: "propose_wait_max",
                ..
            })
        ));
        assert!(matches!(
            AgreementConfig::from_secs(10.0, f64::NAN, 3.0, 0),
            Err(ConfigError::InvalidDuration {
                name: "dummy_wait",
                ..
            })
        ));
    }

    #[test]
    fn test_builder() {
        let config = AgreementConfig::default()
            .with_channel(4)
            .with_seed(7)
            .with_dummy_wait(Duration::ZERO);
        assert_eq!(config.channel, 4);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.dummy_wait, Duration::ZERO);
    }
}
