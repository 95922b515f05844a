//! Session phase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The room-wide phase. Exactly one value at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Lobby: waiting for a start signal.
    #[default]
    Idle,
    /// Action-collection window is open.
    WaitingForActions,
    /// The players' turn is being resolved.
    PlayersAttacking,
    /// The boss's turn is being resolved.
    BossAttacking,
}

impl SessionPhase {
    /// Wire name of the phase.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::WaitingForActions => "WAITING_FOR_ACTIONS",
            Self::PlayersAttacking => "PLAYERS_ATTACKING",
            Self::BossAttacking => "BOSS_ATTACKING",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
