//! Partial-update types produced by the outcome oracle.
//!
//! Oracle output is untrusted. Each update names the fields the core knows how
//! to merge; everything else in the payload is dropped. A field whose value
//! cannot be read as the expected type is treated as absent rather than as an
//! error.

use raidroom_core::id::ConnectionId;
use serde::Serialize;
use serde_json::{Map, Value};

/// Field-by-field update for the encounter entity. `None` keeps the current
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BossUpdate {
    /// New health, before clamping.
    pub health: Option<i64>,
    /// New enraged flag.
    pub is_enraged: Option<bool>,
    /// New phase counter, before flooring at 1.
    pub phase: Option<i64>,
    /// Replacement status effect tags.
    pub status_effects: Option<Vec<String>>,
}

impl BossUpdate {
    /// Reads an update from an `updatedBossState` object. Non-object input
    /// yields an empty update.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let Some(object) = payload.as_object() else {
            return Self::default();
        };
        Self {
            health: object.get("health").and_then(lenient_integer),
            is_enraged: object.get("isEnraged").and_then(lenient_bool),
            phase: object.get("phase").and_then(lenient_integer),
            status_effects: status_effects(object),
        }
    }

    /// True if the update carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Update for one participant, addressed by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantUpdate {
    /// Target participant.
    pub id: ConnectionId,
    /// New health, before clamping.
    pub health: Option<i64>,
    /// Replacement status effect tags.
    pub status_effects: Option<Vec<String>>,
}

impl ParticipantUpdate {
    /// Reads one `updatedPlayers` entry. Returns `None` when the entry is not
    /// an object or has no usable `id`.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;
        let id = object.get("id")?.as_str()?.parse::<ConnectionId>().ok()?;
        Some(Self {
            id,
            health: object.get("health").and_then(lenient_integer),
            status_effects: status_effects(object),
        })
    }
}

/// Accepts integers, finite floats (rounded) and numeric strings.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn lenient_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Status effects may sit at the top level or nested under `game_stats`.
fn status_effects(object: &Map<String, Value>) -> Option<Vec<String>> {
    let raw = object.get("statusEffects").or_else(|| {
        object
            .get("game_stats")
            .and_then(Value::as_object)
            .and_then(|stats| stats.get("statusEffects"))
    })?;
    let items = raw.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boss_update_reads_known_fields() {
        let update = BossUpdate::from_payload(&json!({
            "health": 3200,
            "isEnraged": true,
            "phase": 2,
            "statusEffects": ["Shadow Aura"],
            "name": "Renamed Drake"
        }));

        assert_eq!(update.health, Some(3200));
        assert_eq!(update.is_enraged, Some(true));
        assert_eq!(update.phase, Some(2));
        assert_eq!(update.status_effects, Some(vec!["Shadow Aura".to_owned()]));
    }

    #[test]
    fn test_boss_update_treats_non_numeric_health_as_absent() {
        let update = BossUpdate::from_payload(&json!({ "health": "lots", "phase": null }));
        assert_eq!(update.health, None);
        assert_eq!(update.phase, None);
        assert!(update.is_empty());
    }

    #[test]
    fn test_boss_update_rounds_fractional_and_string_health() {
        assert_eq!(BossUpdate::from_payload(&json!({ "health": 1499.6 })).health, Some(1500));
        assert_eq!(BossUpdate::from_payload(&json!({ "health": " 42 " })).health, Some(42));
    }

    #[test]
    fn test_boss_update_reads_nested_status_effects() {
        let update = BossUpdate::from_payload(&json!({
            "game_stats": { "statusEffects": ["Burning", 7] }
        }));
        assert_eq!(update.status_effects, Some(vec!["Burning".to_owned()]));
    }

    #[test]
    fn test_boss_update_from_non_object_is_empty() {
        assert!(BossUpdate::from_payload(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_participant_update_requires_parseable_id() {
        let id = ConnectionId::new();
        let update = ParticipantUpdate::from_payload(&json!({ "id": id.to_string(), "health": -5 })).unwrap();
        assert_eq!(update.id, id);
        assert_eq!(update.health, Some(-5));

        assert!(ParticipantUpdate::from_payload(&json!({ "id": "p1", "health": 10 })).is_none());
        assert!(ParticipantUpdate::from_payload(&json!({ "health": 10 })).is_none());
        assert!(ParticipantUpdate::from_payload(&json!("nope")).is_none());
    }
}
