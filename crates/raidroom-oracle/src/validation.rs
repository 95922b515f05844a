//! Validation of raw model output.
//!
//! Models asked for JSON still wrap it in Markdown fences now and then, and
//! occasionally forget fields. The top-level shape is mandatory; individual
//! participant entries that cannot be read are skipped.

use raidroom_encounter::domain::updates::{BossUpdate, ParticipantUpdate};
use serde_json::{Map, Value};
use tracing::warn;

use crate::contract::{BossTurnOutcome, PlayerTurnOutcome};
use crate::error::OracleError;

/// Removes a surrounding Markdown code fence (with or without a language
/// tag). Text without a fence is returned trimmed.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening line, e.g. ```json
    match body.find('\n') {
        Some(newline) if !body[..newline].trim_start().starts_with('{') => body[newline + 1..].trim(),
        _ => body.trim(),
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, OracleError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| OracleError::MalformedJson(e.to_string()))?;
    match value {
        Value::Object(object) => Ok(object),
        other => Err(OracleError::InvalidField {
            field: "response",
            reason: format!("expected a JSON object, got {}", kind_of(&other)),
        }),
    }
}

fn narrative(object: &Map<String, Value>) -> Result<String, OracleError> {
    match object.get("narrative") {
        None | Some(Value::Null) => Err(OracleError::MissingField("narrative")),
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_owned()),
        Some(Value::String(_)) => Err(OracleError::InvalidField {
            field: "narrative",
            reason: "must not be empty".to_owned(),
        }),
        Some(other) => Err(OracleError::InvalidField {
            field: "narrative",
            reason: format!("expected a string, got {}", kind_of(other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a player-turn response: `{ narrative, updatedBossState }`.
///
/// # Errors
///
/// Returns an error if the text is not a JSON object, the narrative is
/// missing or blank, or `updatedBossState` is missing or not an object.
pub fn parse_player_turn(raw: &str) -> Result<PlayerTurnOutcome, OracleError> {
    let object = parse_object(raw)?;
    let narrative = narrative(&object)?;
    let boss_state = match object.get("updatedBossState") {
        None | Some(Value::Null) => return Err(OracleError::MissingField("updatedBossState")),
        Some(value @ Value::Object(_)) => value,
        Some(other) => {
            return Err(OracleError::InvalidField {
                field: "updatedBossState",
                reason: format!("expected an object, got {}", kind_of(other)),
            });
        }
    };
    Ok(PlayerTurnOutcome {
        narrative,
        boss_update: BossUpdate::from_payload(boss_state),
    })
}

/// Parses a boss-turn response: `{ narrative, updatedPlayers: [{id, health}] }`.
///
/// # Errors
///
/// Returns an error if the text is not a JSON object, the narrative is
/// missing or blank, or `updatedPlayers` is missing or not an array.
pub fn parse_boss_turn(raw: &str) -> Result<BossTurnOutcome, OracleError> {
    let object = parse_object(raw)?;
    let narrative = narrative(&object)?;
    let entries = match object.get("updatedPlayers") {
        None | Some(Value::Null) => return Err(OracleError::MissingField("updatedPlayers")),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(OracleError::InvalidField {
                field: "updatedPlayers",
                reason: format!("expected an array, got {}", kind_of(other)),
            });
        }
    };
    let participant_updates = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let update = ParticipantUpdate::from_payload(entry);
            if update.is_none() {
                warn!(index, entry = %entry, "skipping unreadable updatedPlayers entry");
            }
            update
        })
        .collect();
    Ok(BossTurnOutcome {
        narrative,
        participant_updates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use raidroom_core::id::ConnectionId;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_parse_player_turn_accepts_fenced_output() {
        let raw = "```json\n{\"narrative\": \" The blade bites deep. \", \"updatedBossState\": {\"health\": 3300, \"phase\": 1}}\n```";

        let outcome = parse_player_turn(raw).unwrap();

        assert_eq!(outcome.narrative, "The blade bites deep.");
        assert_eq!(outcome.boss_update.health, Some(3300));
        assert_eq!(outcome.boss_update.phase, Some(1));
    }

    #[test]
    fn test_parse_player_turn_requires_boss_state() {
        match parse_player_turn(r#"{"narrative": "Nothing happens."}"#) {
            Err(OracleError::MissingField(field)) => assert_eq!(field, "updatedBossState"),
            other => panic!("expected MissingField, got {other:?}"),
        }
        match parse_player_turn(r#"{"narrative": "x", "updatedBossState": [1]}"#) {
            Err(OracleError::InvalidField { field, .. }) => assert_eq!(field, "updatedBossState"),
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_blank_narrative() {
        let result = parse_player_turn(r#"{"narrative": "   ", "updatedBossState": {}}"#);
        assert!(matches!(
            result,
            Err(OracleError::InvalidField { field: "narrative", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_json_and_non_object() {
        assert!(matches!(
            parse_boss_turn("The drake attacks!"),
            Err(OracleError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_boss_turn("[1, 2]"),
            Err(OracleError::InvalidField { field: "response", .. })
        ));
    }

    #[test]
    fn test_parse_boss_turn_skips_unreadable_entries() {
        let id = ConnectionId::new();
        let raw = serde_json::json!({
            "narrative": "Shadow Breath engulfs the party.",
            "updatedPlayers": [
                { "id": id.to_string(), "health": 55 },
                { "id": "player_id_1", "health": 150 },
                { "health": 10 },
                "garbage"
            ]
        })
        .to_string();

        let outcome = parse_boss_turn(&raw).unwrap();

        assert_eq!(outcome.participant_updates.len(), 1);
        assert_eq!(outcome.participant_updates[0].id, id);
        assert_eq!(outcome.participant_updates[0].health, Some(55));
    }

    #[test]
    fn test_parse_boss_turn_requires_players_array() {
        match parse_boss_turn(r#"{"narrative": "Roar."}"#) {
            Err(OracleError::MissingField(field)) => assert_eq!(field, "updatedPlayers"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }
}
