//! Pending actions for the current window.

use raidroom_core::id::ConnectionId;
use raidroom_oracle::SubmittedAction;

/// Actions submitted during one action-collection window, at most one per
/// identity, in submission order.
#[derive(Debug, Clone, Default)]
pub struct PendingActions {
    entries: Vec<SubmittedAction>,
}

impl PendingActions {
    /// Records an action. Returns `false` if `id` already acted.
    pub fn submit(&mut self, id: ConnectionId, text: impl Into<String>) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entries.push(SubmittedAction {
            participant_id: id,
            text: text.into(),
        });
        true
    }

    /// Removes `id`'s action, if any.
    pub fn withdraw(&mut self, id: ConnectionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|action| action.participant_id != id);
        self.entries.len() != before
    }

    /// Whether `id` has acted.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.iter().any(|action| action.participant_id == id)
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nobody has acted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actions in submission order.
    #[must_use]
    pub fn actions(&self) -> &[SubmittedAction] {
        &self.entries
    }

    /// Forgets every action.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
