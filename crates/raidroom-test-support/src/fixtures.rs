//! Character and outcome fixtures.

use raidroom_core::id::ConnectionId;
use raidroom_encounter::domain::entities::{
    BackgroundInfo, BaseStats, CharacterTemplate, GameStats, GeneralStats,
};
use raidroom_encounter::domain::updates::{BossUpdate, ParticipantUpdate};
use raidroom_oracle::{BossTurnOutcome, PlayerTurnOutcome};
use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A minimal valid character with the given name and max health.
#[must_use]
pub fn character(name: &str, max_health: i64) -> CharacterTemplate {
    CharacterTemplate {
        name: name.to_owned(),
        background_info: BackgroundInfo {
            personality: "Brave".to_owned(),
            extra: object(json!({ "alignment": "Neutral Good" })),
        },
        game_stats: GameStats {
            base_stats: BaseStats {
                general: GeneralStats {
                    max_health,
                    extra: object(json!({ "speed": 50, "attack": 40, "defense": 30 })),
                },
                ..BaseStats::default()
            },
            status_effects: Vec::new(),
            extra: object(json!({
                "abilities": [
                    { "name": "Strike", "type": "Attack", "description": "A plain strike." }
                ]
            })),
        },
        extra: object(json!({ "description": format!("{name} the test adventurer.") })),
    }
}

/// A player-turn outcome that sets the boss's health.
#[must_use]
pub fn player_outcome(narrative: &str, boss_health: i64) -> PlayerTurnOutcome {
    PlayerTurnOutcome {
        narrative: narrative.to_owned(),
        boss_update: BossUpdate {
            health: Some(boss_health),
            ..BossUpdate::default()
        },
    }
}

/// A boss-turn outcome that sets each listed participant's health.
#[must_use]
pub fn boss_outcome(narrative: &str, healths: &[(ConnectionId, i64)]) -> BossTurnOutcome {
    BossTurnOutcome {
        narrative: narrative.to_owned(),
        participant_updates: healths
            .iter()
            .map(|&(id, health)| ParticipantUpdate {
                id,
                health: Some(health),
                status_effects: None,
            })
            .collect(),
    }
}
