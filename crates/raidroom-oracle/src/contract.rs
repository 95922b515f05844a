//! The contract between the room and any outcome oracle.

use async_trait::async_trait;
use raidroom_core::id::ConnectionId;
use raidroom_encounter::domain::entities::{Boss, Participant};
use raidroom_encounter::domain::updates::{BossUpdate, ParticipantUpdate};
use serde::Serialize;

use crate::error::OracleError;

/// One participant's action for the current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAction {
    /// Who acted.
    pub participant_id: ConnectionId,
    /// Free-text description of the action.
    pub text: String,
}

/// Inputs for resolving the players' half of a round.
#[derive(Debug, Clone)]
pub struct PlayerTurnRequest {
    /// Boss as it stood when the window closed.
    pub boss: Boss,
    /// The whole roster.
    pub participants: Vec<Participant>,
    /// Actions in submission order.
    pub actions: Vec<SubmittedAction>,
}

impl PlayerTurnRequest {
    /// Pairs each action with the participant who submitted it. Actions
    /// whose author is no longer in `participants` are skipped.
    pub fn acting(&self) -> impl Iterator<Item = (&Participant, &str)> {
        self.actions.iter().filter_map(|action| {
            self.participants
                .iter()
                .find(|p| p.id == action.participant_id)
                .map(|p| (p, action.text.as_str()))
        })
    }
}

/// Inputs for resolving the boss's half of a round.
#[derive(Debug, Clone)]
pub struct BossTurnRequest {
    /// Boss after the player turn merged.
    pub boss: Boss,
    /// Living participants only.
    pub targets: Vec<Participant>,
}

/// Result of a player turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTurnOutcome {
    /// What happened, for the room log.
    pub narrative: String,
    /// Changes to the boss.
    pub boss_update: BossUpdate,
}

/// Result of a boss turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossTurnOutcome {
    /// What happened, for the room log.
    pub narrative: String,
    /// Changes to individual participants.
    pub participant_updates: Vec<ParticipantUpdate>,
}

/// An external turn-resolution service.
///
/// Calls may take seconds and may fail. Implementations need not time out on
/// their own; the caller imposes a deadline. The caller never issues two
/// calls for the same room at once.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Resolves the players' actions against the boss.
    async fn resolve_player_turn(
        &self,
        request: &PlayerTurnRequest,
    ) -> Result<PlayerTurnOutcome, OracleError>;

    /// Resolves the boss's attack against the living participants.
    async fn resolve_boss_turn(
        &self,
        request: &BossTurnRequest,
    ) -> Result<BossTurnOutcome, OracleError>;
}
