//! Session registry: the roster and the shared encounter entity of one room.

use raidroom_core::error::DomainError;
use raidroom_core::id::ConnectionId;
use tracing::debug;

use crate::domain::entities::{Boss, CharacterTemplate, HealthChange, Participant};
use crate::domain::updates::{BossUpdate, ParticipantUpdate};

/// Outcome of merging a batch of participant updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Updates that matched a participant in the roster.
    pub applied: usize,
    /// Updates addressed to identities not in the roster.
    pub ignored: usize,
    /// Names of participants that went from alive to defeated, in roster order.
    pub fallen: Vec<String>,
}

/// Result of a fallback strike on one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strike {
    /// Name of the participant struck.
    pub target: String,
    /// Damage dealt.
    pub damage: u32,
    /// Whether the strike defeated the participant.
    pub fell: bool,
}

/// Owns the roster and the encounter entity.
///
/// All operations are total over the in-memory state. Roster order is join
/// order and identities are unique.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    template: Boss,
    boss: Boss,
    roster: Vec<Participant>,
}

impl SessionRegistry {
    /// Creates an empty registry whose boss is a copy of `template`.
    #[must_use]
    pub fn new(template: Boss) -> Self {
        Self {
            boss: template.clone(),
            template,
            roster: Vec::new(),
        }
    }

    /// Builds a participant at full health and appends it to the roster.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the template is invalid or the
    /// connection already has a participant.
    pub fn add_participant(
        &mut self,
        id: ConnectionId,
        character: CharacterTemplate,
    ) -> Result<Participant, DomainError> {
        if self.participant(id).is_some() {
            return Err(DomainError::Validation(format!(
                "connection {id} has already joined"
            )));
        }
        let participant = Participant::from_template(id, character)?;
        self.roster.push(participant.clone());
        Ok(participant)
    }

    /// Removes and returns the participant for `id`, if any.
    pub fn remove_participant(&mut self, id: ConnectionId) -> Option<Participant> {
        let index = self.roster.iter().position(|p| p.id == id)?;
        Some(self.roster.remove(index))
    }

    /// Participants still alive, in join order.
    pub fn living_participants(&self) -> impl Iterator<Item = &Participant> {
        self.roster.iter().filter(|p| p.is_alive())
    }

    /// Number of living participants.
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.living_participants().count()
    }

    /// The full roster in join order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.roster
    }

    /// Looks up a participant by identity.
    #[must_use]
    pub fn participant(&self, id: ConnectionId) -> Option<&Participant> {
        self.roster.iter().find(|p| p.id == id)
    }

    /// The current encounter entity.
    #[must_use]
    pub fn boss(&self) -> &Boss {
        &self.boss
    }

    /// The template the boss is reset to.
    #[must_use]
    pub fn template(&self) -> &Boss {
        &self.template
    }

    /// True if nobody has joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Roster size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Replaces the boss with a fresh copy of the template and empties the
    /// roster.
    pub fn reset_encounter(&mut self) {
        self.boss = self.template.clone();
        self.roster.clear();
    }

    /// Merges a player-turn outcome onto the boss.
    pub fn merge_boss_update(&mut self, update: &BossUpdate) {
        self.boss.apply_update(update);
    }

    /// Merges boss-turn outcomes onto the roster. Unknown identities are
    /// skipped.
    pub fn merge_participant_updates(&mut self, updates: &[ParticipantUpdate]) -> MergeReport {
        let mut report = MergeReport::default();
        for update in updates {
            let Some(participant) = self.roster.iter_mut().find(|p| p.id == update.id) else {
                debug!(participant_id = %update.id, "ignoring update for unknown participant");
                report.ignored += 1;
                continue;
            };
            report.applied += 1;
            if participant.apply_update(update) == HealthChange::Fell {
                report.fallen.push(participant.name().to_owned());
            }
        }
        report
    }

    /// Deals `damage` to the living participant at `index` among the living.
    /// Returns `None` if there is no such participant.
    pub fn strike_living(&mut self, index: usize, damage: u32) -> Option<Strike> {
        let participant = self.roster.iter_mut().filter(|p| p.is_alive()).nth(index)?;
        let fell = participant.apply_damage(damage) == HealthChange::Fell;
        Some(Strike {
            target: participant.name().to_owned(),
            damage,
            fell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{BaseStats, GameStats, GeneralStats};
    use crate::domain::template::shadow_drake;

    fn character(name: &str, max_health: i64) -> CharacterTemplate {
        CharacterTemplate {
            name: name.to_owned(),
            game_stats: GameStats {
                base_stats: BaseStats {
                    general: GeneralStats {
                        max_health,
                        ..GeneralStats::default()
                    },
                    ..BaseStats::default()
                },
                ..GameStats::default()
            },
            ..CharacterTemplate::default()
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(shadow_drake().unwrap())
    }

    fn health_update(id: ConnectionId, health: i64) -> ParticipantUpdate {
        ParticipantUpdate {
            id,
            health: Some(health),
            status_effects: None,
        }
    }

    #[test]
    fn test_add_participant_appends_in_join_order() {
        // Arrange
        let mut registry = registry();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        // Act
        registry.add_participant(first, character("Aria", 100)).unwrap();
        registry.add_participant(second, character("Bram", 80)).unwrap();

        // Assert
        let names: Vec<&str> = registry.participants().iter().map(Participant::name).collect();
        assert_eq!(names, vec!["Aria", "Bram"]);
        assert_eq!(registry.participant(second).unwrap().health(), 80);
    }

    #[test]
    fn test_add_participant_rejects_duplicate_identity() {
        let mut registry = registry();
        let id = ConnectionId::new();
        registry.add_participant(id, character("Aria", 100)).unwrap();

        let result = registry.add_participant(id, character("Aria again", 100));

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_participant_rejects_invalid_template_without_mutating() {
        let mut registry = registry();
        assert!(registry.add_participant(ConnectionId::new(), character("Ghost", 0)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_participant_is_noop_for_unknown_id() {
        let mut registry = registry();
        let id = ConnectionId::new();
        registry.add_participant(id, character("Aria", 100)).unwrap();

        assert!(registry.remove_participant(ConnectionId::new()).is_none());
        assert_eq!(registry.remove_participant(id).unwrap().name(), "Aria");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_living_participants_filters_defeated() {
        let mut registry = registry();
        let aria = ConnectionId::new();
        let bram = ConnectionId::new();
        let cato = ConnectionId::new();
        registry.add_participant(aria, character("Aria", 100)).unwrap();
        registry.add_participant(bram, character("Bram", 100)).unwrap();
        registry.add_participant(cato, character("Cato", 100)).unwrap();

        registry.merge_participant_updates(&[health_update(bram, 0)]);

        let living: Vec<&str> = registry.living_participants().map(Participant::name).collect();
        assert_eq!(living, vec!["Aria", "Cato"]);
        assert_eq!(registry.living_count(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_merge_participant_updates_clamps_and_reports_fallen() {
        // Arrange
        let mut registry = registry();
        let p1 = ConnectionId::new();
        registry.add_participant(p1, character("Aria", 100)).unwrap();

        // Act
        let report = registry.merge_participant_updates(&[health_update(p1, -5)]);

        // Assert
        let participant = registry.participant(p1).unwrap();
        assert_eq!(participant.health(), 0);
        assert!(!participant.is_alive());
        assert_eq!(report.fallen, vec!["Aria".to_owned()]);
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn test_merge_participant_updates_ignores_unknown_ids() {
        let mut registry = registry();
        let p1 = ConnectionId::new();
        registry.add_participant(p1, character("Aria", 100)).unwrap();

        let report = registry.merge_participant_updates(&[
            health_update(ConnectionId::new(), 0),
            health_update(p1, 60),
        ]);

        assert_eq!(report.ignored, 1);
        assert_eq!(report.applied, 1);
        assert!(report.fallen.is_empty());
        assert_eq!(registry.participant(p1).unwrap().health(), 60);
    }

    #[test]
    fn test_fallen_reported_once_per_transition() {
        let mut registry = registry();
        let p1 = ConnectionId::new();
        registry.add_participant(p1, character("Aria", 100)).unwrap();

        let first = registry.merge_participant_updates(&[health_update(p1, 0)]);
        let second = registry.merge_participant_updates(&[health_update(p1, -10)]);

        assert_eq!(first.fallen.len(), 1);
        assert!(second.fallen.is_empty());
    }

    #[test]
    fn test_reset_encounter_restores_template_and_empties_roster() {
        let mut registry = registry();
        registry.add_participant(ConnectionId::new(), character("Aria", 100)).unwrap();
        registry.merge_boss_update(&BossUpdate {
            health: Some(0),
            is_enraged: Some(true),
            phase: Some(3),
            status_effects: Some(Vec::new()),
        });
        assert!(registry.boss().is_defeated());

        registry.reset_encounter();

        assert!(registry.is_empty());
        assert_eq!(registry.boss(), registry.template());
    }

    #[test]
    fn test_strike_living_skips_defeated_participants() {
        let mut registry = registry();
        let aria = ConnectionId::new();
        let bram = ConnectionId::new();
        registry.add_participant(aria, character("Aria", 100)).unwrap();
        registry.add_participant(bram, character("Bram", 30)).unwrap();
        registry.merge_participant_updates(&[health_update(aria, 0)]);

        let strike = registry.strike_living(0, 44).unwrap();

        assert_eq!(strike.target, "Bram");
        assert!(strike.fell);
        assert_eq!(registry.participant(bram).unwrap().health(), 0);
        assert!(registry.strike_living(0, 20).is_none());
    }
}
