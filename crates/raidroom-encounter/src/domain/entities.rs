//! Participants and the encounter entity.
//!
//! Both carry a [`CharacterTemplate`] as an opaque descriptor that is handed
//! to the outcome oracle untouched. The only fields the core interprets are
//! identity and health, and health is private so that the
//! `health in [0, max_health]` / `is_alive == (health > 0)` invariants can
//! only be changed through the methods below.

use raidroom_core::error::DomainError;
use raidroom_core::id::ConnectionId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::updates::{BossUpdate, ParticipantUpdate, lenient_integer};

/// Descriptor keys that would collide with a combatant's own fields once the
/// descriptor is flattened into it.
const RESERVED_KEYS: &[&str] = &["id", "class", "health", "maxHealth", "isAlive", "isEnraged", "phase"];

/// Primary combat attributes. Only `max_health` is read; every other
/// attribute is carried through as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralStats {
    /// Health ceiling. Seeds a combatant's health.
    #[serde(default, deserialize_with = "health_number")]
    pub max_health: i64,
    /// `speed`, `attack`, `defense` and anything else the client sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeneralStats {
    /// Stats declaring only a health ceiling.
    #[must_use]
    pub fn with_max_health(max_health: i64) -> Self {
        Self {
            max_health,
            extra: Map::new(),
        }
    }
}

/// Attribute block of a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Primary attributes.
    #[serde(default)]
    pub general: GeneralStats,
    /// `advanced`, `total_stat_points` and other pass-through attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Combat descriptor. Status tags are typed because the oracle replaces
/// them; abilities and the rest pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    /// Attribute block.
    #[serde(default)]
    pub base_stats: BaseStats,
    /// Active status effect tags.
    #[serde(default, rename = "statusEffects")]
    pub status_effects: Vec<String>,
    /// `abilities` and other pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameStats {
    /// Abilities as the client described them. Empty when absent or not a
    /// list.
    #[must_use]
    pub fn abilities(&self) -> &[Value] {
        self.extra
            .get("abilities")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}

/// Flavor text. Only `personality` is read, as the class label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundInfo {
    /// Personality; doubles as a participant's class label.
    #[serde(default)]
    pub personality: String,
    /// Backstory, voice, alignment and the like.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The character a client brings into the room.
///
/// The core reads the name, the declared max health, the personality and
/// the status tags. Everything else (`description`, `imageUrl`, store ids,
/// custom tags) is kept verbatim and reappears in snapshots and oracle
/// requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterTemplate {
    /// Display name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub background_info: BackgroundInfo,
    /// Combat descriptor.
    #[serde(default)]
    pub game_stats: GameStats,
    /// Pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterTemplate {
    /// Declared maximum health.
    #[must_use]
    pub fn declared_max_health(&self) -> i64 {
        self.game_stats.base_stats.general.max_health
    }

    /// Checks the fields the core relies on.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or the declared
    /// max health is not positive.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "character name must not be blank".to_owned(),
            ));
        }
        if self.declared_max_health() <= 0 {
            return Err(DomainError::Validation(format!(
                "character {} must declare a positive max_health, got {}",
                self.name,
                self.declared_max_health()
            )));
        }
        Ok(())
    }

    /// Drops pass-through keys that a combatant's own fields would shadow.
    fn without_reserved_keys(mut self) -> Self {
        self.extra.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
        self
    }
}

/// Reads a health value from any JSON/YAML number or numeric string.
fn health_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    lenient_integer(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("max_health must be a number, got {raw}")))
}

/// What a health change did to a combatant's alive flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthChange {
    /// Alive flag unchanged.
    Steady,
    /// Went from alive to defeated.
    Fell,
    /// Went from defeated to alive.
    Revived,
}

/// Clamps `value` into `[0, max]`.
fn clamp_health(value: i64, max: i64) -> i64 {
    value.clamp(0, max.max(0))
}

/// One connected player's in-session combat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Connection-scoped identity.
    pub id: ConnectionId,
    /// The character this participant plays.
    #[serde(flatten)]
    pub character: CharacterTemplate,
    /// Class label shown in the roster.
    pub class: String,
    health: i64,
    max_health: i64,
    is_alive: bool,
}

impl Participant {
    /// Builds a participant at full health from a character template.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the template is invalid.
    pub fn from_template(id: ConnectionId, character: CharacterTemplate) -> Result<Self, DomainError> {
        character.validate()?;
        let character = character.without_reserved_keys();
        let max_health = character.declared_max_health();
        Ok(Self {
            id,
            class: character.background_info.personality.clone(),
            character,
            health: max_health,
            max_health,
            is_alive: true,
        })
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.character.name
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> i64 {
        self.health
    }

    /// Health ceiling.
    #[must_use]
    pub fn max_health(&self) -> i64 {
        self.max_health
    }

    /// Whether the participant can still act.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    /// Sets health, clamping into range and updating the alive flag in the
    /// same step.
    pub fn set_health(&mut self, value: i64) -> HealthChange {
        let was_alive = self.is_alive;
        self.health = clamp_health(value, self.max_health);
        self.is_alive = self.health > 0;
        match (was_alive, self.is_alive) {
            (true, false) => HealthChange::Fell,
            (false, true) => HealthChange::Revived,
            _ => HealthChange::Steady,
        }
    }

    /// Subtracts `amount` from health.
    pub fn apply_damage(&mut self, amount: u32) -> HealthChange {
        self.set_health(self.health.saturating_sub(i64::from(amount)))
    }

    /// Merges an oracle update. Absent fields keep their current value.
    pub fn apply_update(&mut self, update: &ParticipantUpdate) -> HealthChange {
        if let Some(effects) = &update.status_effects {
            self.character.game_stats.status_effects.clone_from(effects);
        }
        match update.health {
            Some(health) => self.set_health(health),
            None => HealthChange::Steady,
        }
    }
}

/// The single shared opponent of the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boss {
    /// Identity, flavor and abilities.
    #[serde(flatten)]
    pub profile: CharacterTemplate,
    health: i64,
    max_health: i64,
    is_enraged: bool,
    phase: u32,
}

impl Boss {
    /// Builds a boss at full health, phase 1, not enraged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the profile is invalid.
    pub fn from_template(profile: CharacterTemplate) -> Result<Self, DomainError> {
        profile.validate()?;
        let profile = profile.without_reserved_keys();
        let max_health = profile.declared_max_health();
        Ok(Self {
            profile,
            health: max_health,
            max_health,
            is_enraged: false,
            phase: 1,
        })
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> i64 {
        self.health
    }

    /// Health ceiling.
    #[must_use]
    pub fn max_health(&self) -> i64 {
        self.max_health
    }

    /// Enraged flag, as last reported by the oracle.
    #[must_use]
    pub fn is_enraged(&self) -> bool {
        self.is_enraged
    }

    /// Phase counter, as last reported by the oracle. Always at least 1.
    #[must_use]
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// True once health has reached zero.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    /// Merges an oracle update field by field. Health is clamped; phase and
    /// enraged are taken verbatim apart from flooring phase at 1.
    pub fn apply_update(&mut self, update: &BossUpdate) {
        if let Some(health) = update.health {
            self.health = clamp_health(health, self.max_health);
        }
        if let Some(is_enraged) = update.is_enraged {
            self.is_enraged = is_enraged;
        }
        if let Some(phase) = update.phase {
            self.phase = u32::try_from(phase.max(1)).unwrap_or(u32::MAX);
        }
        if let Some(effects) = &update.status_effects {
            self.profile.game_stats.status_effects.clone_from(effects);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, max_health: i64) -> CharacterTemplate {
        CharacterTemplate {
            name: name.to_owned(),
            background_info: BackgroundInfo {
                personality: "Stoic".to_owned(),
                ..BackgroundInfo::default()
            },
            game_stats: GameStats {
                base_stats: BaseStats {
                    general: GeneralStats::with_max_health(max_health),
                    ..BaseStats::default()
                },
                ..GameStats::default()
            },
            ..CharacterTemplate::default()
        }
    }

    #[test]
    fn test_participant_starts_at_declared_max_health() {
        let participant = Participant::from_template(ConnectionId::new(), template("Aria", 120)).unwrap();
        assert_eq!(participant.health(), 120);
        assert_eq!(participant.max_health(), 120);
        assert!(participant.is_alive());
        assert_eq!(participant.class, "Stoic");
    }

    #[test]
    fn test_participant_rejects_non_positive_max_health() {
        let result = Participant::from_template(ConnectionId::new(), template("Aria", 0));
        match result {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("max_health")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_participant_rejects_blank_name() {
        let result = Participant::from_template(ConnectionId::new(), template("   ", 50));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_set_health_clamps_and_reports_fall() {
        let mut participant = Participant::from_template(ConnectionId::new(), template("Aria", 100)).unwrap();

        assert_eq!(participant.set_health(250), HealthChange::Steady);
        assert_eq!(participant.health(), 100);

        assert_eq!(participant.set_health(-5), HealthChange::Fell);
        assert_eq!(participant.health(), 0);
        assert!(!participant.is_alive());

        assert_eq!(participant.set_health(-20), HealthChange::Steady);
        assert_eq!(participant.set_health(10), HealthChange::Revived);
        assert!(participant.is_alive());
    }

    #[test]
    fn test_apply_damage_saturates_at_zero() {
        let mut participant = Participant::from_template(ConnectionId::new(), template("Aria", 30)).unwrap();
        assert_eq!(participant.apply_damage(44), HealthChange::Fell);
        assert_eq!(participant.health(), 0);
    }

    #[test]
    fn test_participant_update_without_health_keeps_health() {
        let mut participant = Participant::from_template(ConnectionId::new(), template("Aria", 80)).unwrap();
        let update = ParticipantUpdate {
            id: participant.id,
            health: None,
            status_effects: Some(vec!["Burning".to_owned()]),
        };

        assert_eq!(participant.apply_update(&update), HealthChange::Steady);
        assert_eq!(participant.health(), 80);
        assert_eq!(participant.character.game_stats.status_effects, vec!["Burning"]);
    }

    #[test]
    fn test_boss_update_merges_present_fields_only() {
        let mut boss = Boss::from_template(template("Drake", 3500)).unwrap();
        boss.apply_update(&BossUpdate {
            health: Some(3100),
            is_enraged: None,
            phase: Some(2),
            status_effects: None,
        });

        assert_eq!(boss.health(), 3100);
        assert_eq!(boss.phase(), 2);
        assert!(!boss.is_enraged());

        boss.apply_update(&BossUpdate {
            is_enraged: Some(true),
            ..BossUpdate::default()
        });
        assert_eq!(boss.health(), 3100);
        assert!(boss.is_enraged());
    }

    #[test]
    fn test_boss_update_clamps_health_and_floors_phase() {
        let mut boss = Boss::from_template(template("Drake", 3500)).unwrap();
        boss.apply_update(&BossUpdate {
            health: Some(-400),
            phase: Some(0),
            ..BossUpdate::default()
        });
        assert_eq!(boss.health(), 0);
        assert!(boss.is_defeated());
        assert_eq!(boss.phase(), 1);

        boss.apply_update(&BossUpdate {
            health: Some(99_999),
            ..BossUpdate::default()
        });
        assert_eq!(boss.health(), 3500);
    }

    #[test]
    fn test_participant_serializes_with_client_field_names() {
        let participant = Participant::from_template(ConnectionId::new(), template("Aria", 100)).unwrap();
        let json = serde_json::to_value(&participant).unwrap();

        assert_eq!(json["name"], "Aria");
        assert_eq!(json["maxHealth"], 100);
        assert_eq!(json["isAlive"], true);
        assert_eq!(json["game_stats"]["base_stats"]["general"]["max_health"], 100);
        assert_eq!(json["id"], participant.id.to_string());
    }

    #[test]
    fn test_character_template_accepts_client_payload() {
        let payload = serde_json::json!({
            "name": "Thor",
            "description": "Storm caller",
            "imageUrl": "https://example.com/thor.png",
            "background_info": {
                "backstory": "Born in thunder",
                "personality": "Brash",
                "voice": "Booming",
                "alignment": "Chaotic Good"
            },
            "game_stats": {
                "base_stats": {
                    "general": { "max_health": 150, "speed": 90, "attack": 70, "defense": 40 },
                    "advanced": { "luck": 20, "intelligence": 30, "agility": 25, "endurance": 60 },
                    "total_stat_points": 300
                },
                "abilities": [
                    { "name": "Hammer Throw", "type": "Attack", "description": "Hurls a hammer.", "cooldown": 2 }
                ],
                "statusEffects": []
            },
            "owner": "user-17"
        });

        let template: CharacterTemplate = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(template.declared_max_health(), 150);
        assert_eq!(template.background_info.personality, "Brash");
        assert_eq!(template.game_stats.abilities()[0]["type"], "Attack");
        assert_eq!(serde_json::to_value(&template).unwrap(), payload);
    }

    #[test]
    fn test_fractional_stats_are_accepted() {
        let payload = serde_json::json!({
            "name": "Wren",
            "game_stats": {
                "base_stats": {
                    "general": { "max_health": 99.6, "speed": 7.5, "attack": 12.25 }
                }
            }
        });

        let template: CharacterTemplate = serde_json::from_value(payload).unwrap();
        let participant = Participant::from_template(ConnectionId::new(), template).unwrap();

        assert_eq!(participant.max_health(), 100);
        let json = serde_json::to_value(&participant).unwrap();
        assert_eq!(json["game_stats"]["base_stats"]["general"]["speed"], 7.5);
        assert_eq!(json["game_stats"]["base_stats"]["general"]["attack"], 12.25);
    }

    #[test]
    fn test_non_numeric_max_health_is_rejected() {
        let payload = serde_json::json!({
            "name": "Wren",
            "game_stats": { "base_stats": { "general": { "max_health": "lots" } } }
        });
        assert!(serde_json::from_value::<CharacterTemplate>(payload).is_err());
    }

    #[test]
    fn test_unknown_descriptor_fields_reach_the_snapshot() {
        let payload = serde_json::json!({
            "_id": "665f1c2e9b1d",
            "name": "Aria",
            "tags": ["veteran"],
            "background_info": { "personality": "Stoic", "homeland": "Ves" },
            "game_stats": {
                "base_stats": { "general": { "max_health": 100, "stamina": 40 } },
                "abilities": [{ "name": "Parry" }],
                "rank": 3
            }
        });
        let template: CharacterTemplate = serde_json::from_value(payload).unwrap();

        let participant = Participant::from_template(ConnectionId::new(), template).unwrap();
        let json = serde_json::to_value(&participant).unwrap();

        assert_eq!(json["_id"], "665f1c2e9b1d");
        assert_eq!(json["tags"], serde_json::json!(["veteran"]));
        assert_eq!(json["background_info"]["homeland"], "Ves");
        assert_eq!(json["game_stats"]["base_stats"]["general"]["stamina"], 40);
        assert_eq!(json["game_stats"]["abilities"][0]["name"], "Parry");
        assert_eq!(json["game_stats"]["rank"], 3);
    }

    #[test]
    fn test_descriptor_keys_cannot_shadow_combat_state() {
        let payload = serde_json::json!({
            "name": "Cheat",
            "health": 9999,
            "isAlive": false,
            "game_stats": { "base_stats": { "general": { "max_health": 50 } } }
        });
        let template: CharacterTemplate = serde_json::from_value(payload).unwrap();

        let participant = Participant::from_template(ConnectionId::new(), template).unwrap();
        let json = serde_json::to_value(&participant).unwrap();

        assert!(participant.character.extra.is_empty());
        assert_eq!(json["health"], 50);
        assert_eq!(json["isAlive"], true);
    }
}
