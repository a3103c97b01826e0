//! Local timers: proposal wait and randomized conflict backoff.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Elapsed-time accumulators driven by `tick`.
///
/// Both counters advance on every tick regardless of state; they are only
/// meaningful after being reset on entry into `Proposed` or `Conflicted`.
#[derive(Debug)]
pub(crate) struct BackoffTimers {
    propose_elapsed: Duration,
    conflict_elapsed: Duration,
    conflict_delay: Duration,
    conflict_delay_range: Duration,
    rng: ChaCha8Rng,
}

impl BackoffTimers {
    pub(crate) fn new(conflict_delay_range: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            propose_elapsed: Duration::ZERO,
            conflict_elapsed: Duration::ZERO,
            conflict_delay: Duration::ZERO,
            conflict_delay_range,
            rng,
        }
    }

    pub(crate) fn advance(&mut self, elapsed: Duration) {
        self.propose_elapsed = self.propose_elapsed.saturating_add(elapsed);
        self.conflict_elapsed = self.conflict_elapsed.saturating_add(elapsed);
    }

    /// Entry action for `Proposed`.
    pub(crate) fn start_proposal(&mut self) {
        self.propose_elapsed = Duration::ZERO;
    }

    /// Entry action for `Conflicted`: draw a fresh delay and restart the
    /// counter. Returns the drawn delay.
    pub(crate) fn start_conflict(&mut self) -> Duration {
        self.conflict_delay = if self.conflict_delay_range.is_zero() {
            Duration::ZERO
        } else {
            let range = self.conflict_delay_range.as_secs_f64();
            Duration::from_secs_f64(self.rng.gen_range(0.0..=range))
        };
        self.conflict_elapsed = Duration::ZERO;
        self.conflict_delay
    }

    pub(crate) fn propose_elapsed(&self) -> Duration {
        self.propose_elapsed
    }

    pub(crate) fn conflict_elapsed(&self) -> Duration {
        self.conflict_elapsed
    }

    pub(crate) fn conflict_delay(&self) -> Duration {
        self.conflict_delay
    }

    pub(crate) fn conflict_expired(&self) -> bool {
        self.conflict_elapsed >= self.conflict_delay
    }
}
