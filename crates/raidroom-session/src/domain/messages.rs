//! Wire messages exchanged with connected clients.
//!
//! Every message is a JSON object tagged by `type`. Outbound event names are
//! snake_case; their fields are camelCase so clients can consume them
//! without renaming.

use chrono::{DateTime, Utc};
use raidroom_core::clock::Clock;
use raidroom_core::id::ConnectionId;
use raidroom_encounter::domain::entities::{Boss, CharacterTemplate, Participant};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::SessionPhase;

/// Author shown on every room log entry.
pub const GAME_MASTER: &str = "Game Master";

/// Styling hint for a log entry. Carries no control-flow meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    /// Phase announcements.
    System,
    /// Action submissions.
    Action,
    /// Player-turn narrative.
    Attack,
    /// Boss narrative.
    Boss,
    /// Damage and defeat notices.
    Damage,
}

/// A timestamped entry in the room log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    /// Unique entry id.
    pub id: Uuid,
    /// Always [`GAME_MASTER`] for engine messages.
    pub author_label: String,
    /// Entry text.
    pub text: String,
    /// Styling hint.
    pub category: LogCategory,
    /// When the entry was produced.
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    /// Creates a Game Master entry stamped with `clock`'s time.
    pub fn new(text: impl Into<String>, category: LogCategory, clock: &dyn Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_label: GAME_MASTER.to_owned(),
            text: text.into(),
            category,
            timestamp: clock.now(),
        }
    }
}

/// Full room state as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Roster in join order.
    pub participants: Vec<Participant>,
    /// The boss.
    pub encounter_entity: Boss,
}

/// Events sent from the room to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full state, unicast to a connection that just joined.
    InitialState(RoomSnapshot),
    /// Someone else joined.
    ParticipantJoined(Participant),
    /// Someone left.
    ParticipantLeft {
        /// The departed identity.
        id: ConnectionId,
    },
    /// Current phase and countdown.
    #[serde(rename_all = "camelCase")]
    PhaseChange {
        /// The phase.
        phase: SessionPhase,
        /// Seconds left in the window; zero outside `WAITING_FOR_ACTIONS`.
        seconds_remaining: u32,
    },
    /// A room log entry.
    LogMessage(LogMessage),
    /// Full state after a mutation.
    StateSnapshot(RoomSnapshot),
    /// The room was reset to the lobby.
    FullReset,
    /// A request from this connection was rejected.
    Error {
        /// Machine-readable reason.
        code: String,
        /// Human-readable reason.
        message: String,
    },
}

impl ServerEvent {
    /// Builds an `error` event.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_owned(),
            message: message.into(),
        }
    }
}

/// Commands sent from a client to the room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Join with a character.
    Join {
        /// The character to play.
        character: CharacterTemplate,
    },
    /// Submit an action for the current window.
    SubmitAction {
        /// Free-text action.
        text: String,
    },
    /// Start the encounter.
    Start,
}

/// Who an event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connection.
    All,
    /// One connection.
    Only(ConnectionId),
    /// Every connection but one.
    AllExcept(ConnectionId),
}

impl Audience {
    /// Whether `id` is in the audience.
    #[must_use]
    pub fn includes(self, id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Only(target) => target == id,
            Self::AllExcept(excluded) => excluded != id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    struct Noon;

    impl Clock for Noon {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
        }
    }

    #[test]
    fn test_phase_change_wire_shape() {
        let event = ServerEvent::PhaseChange {
            phase: SessionPhase::WaitingForActions,
            seconds_remaining: 42,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "type": "phase_change", "phase": "WAITING_FOR_ACTIONS", "secondsRemaining": 42 })
        );
    }

    #[test]
    fn test_log_message_wire_shape() {
        let event = ServerEvent::LogMessage(LogMessage::new("The battle begins!", LogCategory::System, &Noon));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "log_message");
        assert_eq!(json["authorLabel"], "Game Master");
        assert_eq!(json["text"], "The battle begins!");
        assert_eq!(json["category"], "system");
        assert_eq!(json["timestamp"], "2026-01-15T12:00:00Z");
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_unit_and_struct_events_are_tagged() {
        assert_eq!(serde_json::to_value(ServerEvent::FullReset).unwrap(), json!({ "type": "full_reset" }));

        let id = ConnectionId::new();
        assert_eq!(
            serde_json::to_value(ServerEvent::ParticipantLeft { id }).unwrap(),
            json!({ "type": "participant_left", "id": id.to_string() })
        );
    }

    #[test]
    fn test_client_commands_parse() {
        let start: ClientCommand = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(start, ClientCommand::Start);

        let submit: ClientCommand =
            serde_json::from_str(r#"{"type":"submit_action","text":"I cast fireball"}"#).unwrap();
        assert_eq!(
            submit,
            ClientCommand::SubmitAction {
                text: "I cast fireball".to_owned()
            }
        );

        let join: ClientCommand = serde_json::from_value(json!({
            "type": "join",
            "character": {
                "name": "Aria",
                "game_stats": { "base_stats": { "general": { "max_health": 100 } } }
            }
        }))
        .unwrap();
        match join {
            ClientCommand::Join { character } => assert_eq!(character.name, "Aria"),
            other => panic!("expected Join, got {other:?}"),
        }

        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn test_audience_membership() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert!(Audience::All.includes(a));
        assert!(Audience::Only(a).includes(a));
        assert!(!Audience::Only(a).includes(b));
        assert!(!Audience::AllExcept(a).includes(a));
        assert!(Audience::AllExcept(a).includes(b));
    }
}
