//! Notifications returned to the embedder.

/// Something the embedding application must react to.
///
/// The state machine performs no callbacks itself. Each `tick` returns the
/// notifications that fired, in firing order, and the embedder dispatches
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A proposer announced the barrier. The embedder should do whatever the
    /// commit needs and then call `confirm_prepared`.
    BarrierReached,

    /// Another peer pulsed the commit. Execute `payload` now.
    CommandReceived { payload: String },

    /// This peer pulsed the commit. Execute `payload` now.
    CommandSent { payload: String },
}

impl Notification {
    /// Get a human-readable name for this notification type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Notification::BarrierReached => "BarrierReached",
            Notification::CommandReceived { .. } => "CommandReceived",
            Notification::CommandSent { .. } => "CommandSent",
        }
    }

    /// The committed payload, for either side of a commit pulse.
    pub fn committed_payload(&self) -> Option<&str> {
        match self {
            Notification::CommandReceived { payload } | Notification::CommandSent { payload } => {
                Some(payload)
            }
            Notification::BarrierReached => None,
        }
    }
}
