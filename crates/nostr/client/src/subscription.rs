//! Subscription identifiers and lifecycle states.

use uuid::Uuid;

/// Generate a unique subscription ID.
pub fn generate_subscription_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Lifecycle of one relay subscription session.
///
/// `Idle → Connecting → Subscribed → Draining → Closed`, with `Failed`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, nothing sent yet
    Idle,
    /// Transport handshake in progress
    Connecting,
    /// REQ sent, collecting events
    Subscribed,
    /// EOSE received, closing the subscription
    Draining,
    /// Subscription closed and transport released
    Closed,
    /// Transport failure; no events are reported
    Failed,
}

impl SessionState {
    /// Whether the session has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}
